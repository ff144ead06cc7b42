use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Food, FoodDto, NutritionFacts, ServingType};

/// One logged consumption of a food by a user on a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEaten {
    pub id: Uuid,
    pub user_id: Uuid,
    pub food_id: Uuid,
    pub date: NaiveDate,
    pub serving_type: ServingType,
    pub serving_qty: Decimal,
}

impl FoodEaten {
    /// Log `food` for `user_id` on `date` using the food's default serving
    pub fn with_default_serving(user_id: Uuid, food: &Food, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            food_id: food.id,
            date,
            serving_type: food.default_serving_type,
            serving_qty: food.serving_type_qty,
        }
    }

    /// How many of the food's default servings this entry amounts to
    pub fn serving_ratio(&self, food: &Food) -> Decimal {
        if self.serving_type == food.default_serving_type {
            return self
                .serving_qty
                .checked_div(food.serving_type_qty)
                .unwrap_or(Decimal::ZERO);
        }
        if food.default_serving_type == ServingType::Custom {
            return Decimal::ZERO;
        }

        let eaten_ounces = self.serving_qty.saturating_mul(self.serving_type.ounces());
        let default_ounces = food
            .serving_type_qty
            .saturating_mul(food.default_serving_type.ounces());
        eaten_ounces
            .checked_div(default_ounces)
            .unwrap_or(Decimal::ZERO)
    }

    /// Nutrients actually consumed by this entry
    pub fn consumed(&self, food: &Food) -> NutritionFacts {
        food.nutrition.scaled(self.serving_ratio(food))
    }
}

/// Transfer object for a consumption record, with the food resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEatenDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub food: FoodDto,
    pub date: NaiveDate,
    pub serving_type: ServingType,
    pub serving_qty: Decimal,
    pub consumed: NutritionFacts,
}

impl FoodEatenDto {
    pub fn from_parts(food_eaten: &FoodEaten, food: &Food) -> Self {
        Self {
            id: food_eaten.id,
            user_id: food_eaten.user_id,
            food: FoodDto::from(food),
            date: food_eaten.date,
            serving_type: food_eaten.serving_type,
            serving_qty: food_eaten.serving_qty,
            consumed: food_eaten.consumed(food),
        }
    }
}

/// Request body for logging a food
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddFoodEatenRequest {
    pub food_id: Uuid,
    pub date: NaiveDate,
}

/// Request body for changing the serving of a logged food
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateFoodEatenRequest {
    pub serving_qty: Decimal,
    pub serving_type: ServingType,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FoodOwner, MAX_NUTRIENT_VALUE, MAX_SERVING_QUANTITY};
    use rust_decimal_macros::dec;

    fn create_test_food(serving_type: ServingType, qty: Decimal) -> Food {
        let dto = FoodDto {
            id: None,
            owner: FoodOwner::Global,
            name: "Milk".to_string(),
            default_serving_type: serving_type,
            serving_type_qty: qty,
            nutrition: NutritionFacts {
                calories: dec!(100),
                protein: dec!(8),
                ..Default::default()
            },
        };
        Food::from_dto(Uuid::new_v4(), FoodOwner::Global, &dto)
    }

    fn eaten(food: &Food, serving_type: ServingType, qty: Decimal) -> FoodEaten {
        let mut entry = FoodEaten::with_default_serving(
            Uuid::new_v4(),
            food,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        );
        entry.serving_type = serving_type;
        entry.serving_qty = qty;
        entry
    }

    #[test]
    fn test_default_serving_copied_from_food() {
        let food = create_test_food(ServingType::Cup, dec!(1));
        let entry = FoodEaten::with_default_serving(
            Uuid::new_v4(),
            &food,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        );

        assert_eq!(entry.food_id, food.id);
        assert_eq!(entry.serving_type, ServingType::Cup);
        assert_eq!(entry.serving_qty, dec!(1));
        assert_eq!(entry.serving_ratio(&food), dec!(1));
    }

    #[test]
    fn test_ratio_same_serving_type() {
        let food = create_test_food(ServingType::Cup, dec!(2));
        let entry = eaten(&food, ServingType::Cup, dec!(3));

        assert_eq!(entry.serving_ratio(&food), dec!(1.5));
        assert_eq!(entry.consumed(&food).calories, dec!(150));
    }

    #[test]
    fn test_ratio_converts_through_ounces() {
        // 1 cup default serving, 1 pint eaten = 16oz / 8oz
        let food = create_test_food(ServingType::Cup, dec!(1));
        let entry = eaten(&food, ServingType::Pint, dec!(1));

        assert_eq!(entry.serving_ratio(&food), dec!(2));
        assert_eq!(entry.consumed(&food).protein, dec!(16));
    }

    #[test]
    fn test_ratio_custom_default_serving_is_zero() {
        let food = create_test_food(ServingType::Custom, dec!(1));
        let entry = eaten(&food, ServingType::Cup, dec!(4));

        assert_eq!(entry.serving_ratio(&food), Decimal::ZERO);
        assert_eq!(entry.consumed(&food).calories, Decimal::ZERO);
    }

    #[test]
    fn test_ratio_zero_default_quantity() {
        let food = create_test_food(ServingType::Cup, Decimal::ZERO);
        let entry = eaten(&food, ServingType::Cup, dec!(1));

        assert_eq!(entry.serving_ratio(&food), Decimal::ZERO);
    }

    #[test]
    fn test_consumed_saturates_on_huge_ratio() {
        let mut food = create_test_food(ServingType::Ounce, dec!(0.00000000000000000001));
        food.nutrition.calories = MAX_NUTRIENT_VALUE;
        let entry = eaten(&food, ServingType::Ounce, MAX_SERVING_QUANTITY);

        let consumed = entry.consumed(&food);
        assert_eq!(consumed.calories, Decimal::MAX);
        assert_eq!(consumed.fat, Decimal::ZERO);

        let dto = FoodEatenDto::from_parts(&entry, &food);
        assert_eq!(dto.consumed.calories, Decimal::MAX);
    }

    #[test]
    fn test_dto_resolves_food() {
        let food = create_test_food(ServingType::Cup, dec!(1));
        let entry = eaten(&food, ServingType::Cup, dec!(2));
        let dto = FoodEatenDto::from_parts(&entry, &food);

        assert_eq!(dto.id, entry.id);
        assert_eq!(dto.food.id, Some(food.id));
        assert_eq!(dto.food.name, "Milk");
        assert_eq!(dto.consumed.calories, dec!(200));
    }
}
