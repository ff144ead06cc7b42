use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::{Food, FoodOwner, NutritionFacts, ServiceResult, ServingType, User};
use crate::repositories::{FoodRepository, UserRepository};

/// Fixed id of the demo account created by seeding
pub const DEMO_USER_ID: Uuid = Uuid::from_u128(0x5eed_0000_0000_4000_8000_0000_0000_0001);
pub const DEMO_USER_EMAIL: &str = "demo@foodlog.example";

/// Counts reported after seeding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub user_id: Uuid,
    pub foods_seeded: usize,
    pub failures: Vec<String>,
}

#[allow(clippy::too_many_arguments)]
fn global_food(
    seq: u128,
    name: &str,
    serving_type: ServingType,
    serving_qty: Decimal,
    calories: Decimal,
    fat: Decimal,
    carbs: Decimal,
    protein: Decimal,
) -> Food {
    let now = Utc::now();
    Food {
        id: Uuid::from_u128(0x5eed_0000_0000_4000_8000_0000_0001_0000 + seq),
        owner: FoodOwner::Global,
        name: name.to_string(),
        default_serving_type: serving_type,
        serving_type_qty: serving_qty,
        nutrition: NutritionFacts {
            calories,
            fat,
            carbs,
            protein,
            ..Default::default()
        },
        created_at: now,
        updated_at: now,
    }
}

/// Shared catalogue entries every user can see. Ids are stable so reseeding overwrites.
pub fn sample_foods() -> Vec<Food> {
    vec![
        global_food(1, "Apple", ServingType::Ounce, dec!(6.4), dec!(95), dec!(0.3), dec!(25), dec!(0.5)),
        global_food(2, "Banana", ServingType::Ounce, dec!(4.2), dec!(105), dec!(0.4), dec!(27), dec!(1.3)),
        global_food(3, "Brown Rice", ServingType::Cup, dec!(1), dec!(216), dec!(1.8), dec!(45), dec!(5)),
        global_food(4, "Cheddar Cheese", ServingType::Ounce, dec!(1), dec!(113), dec!(9.3), dec!(0.4), dec!(7)),
        global_food(5, "Chicken Breast", ServingType::Ounce, dec!(4), dec!(187), dec!(4), dec!(0), dec!(35)),
        global_food(6, "Egg", ServingType::Custom, dec!(1), dec!(78), dec!(5.3), dec!(0.6), dec!(6.3)),
        global_food(7, "Oatmeal", ServingType::Cup, dec!(1), dec!(158), dec!(3.2), dec!(27), dec!(6)),
        global_food(8, "Olive Oil", ServingType::Tablespoon, dec!(1), dec!(119), dec!(13.5), dec!(0), dec!(0)),
        global_food(9, "Peanut Butter", ServingType::Tablespoon, dec!(2), dec!(188), dec!(16), dec!(6), dec!(8)),
        global_food(10, "Whole Milk", ServingType::Cup, dec!(1), dec!(149), dec!(7.9), dec!(12), dec!(7.7)),
    ]
}

/// Write the demo user and the sample global foods
#[instrument(skip(users, foods))]
pub async fn seed_sample_data(
    users: &dyn UserRepository,
    foods: &dyn FoodRepository,
) -> ServiceResult<SeedSummary> {
    let demo_user = User {
        id: DEMO_USER_ID,
        ..User::new(DEMO_USER_EMAIL)
    };
    users.save(demo_user).await?;

    let mut foods_seeded = 0;
    let mut failures = Vec::new();
    for food in sample_foods() {
        let name = food.name.clone();
        match foods.save(food).await {
            Ok(_) => foods_seeded += 1,
            Err(e) => {
                warn!("Failed to seed food {}: {}", name, e);
                failures.push(format!("{}: {}", name, e));
            }
        }
    }

    info!("Seeded {} global foods", foods_seeded);
    Ok(SeedSummary {
        user_id: DEMO_USER_ID,
        foods_seeded,
        failures,
    })
}
