use chrono::{Duration, NaiveDate};
use foodlog_rs::models::{
    validate_food_name, validate_serving_quantity, Food, FoodDto, FoodEaten, FoodOwner,
    FoodUpdateOutcome, NamePattern, NutritionFacts, ServingType, User,
};
use foodlog_rs::repositories::{FoodRepository, InMemoryStore, UserRepository};
use foodlog_rs::FoodService;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

// Property-based test strategies
prop_compose! {
    fn arb_serving_type()(index in 0..ServingType::ALL.len()) -> ServingType {
        ServingType::ALL[index]
    }
}

prop_compose! {
    fn arb_valid_food_name()(name in "[a-zA-Z][a-zA-Z0-9 ]{0,40}") -> String {
        name
    }
}

prop_compose! {
    fn arb_quantity()(hundredths in 1u32..100_000) -> Decimal {
        Decimal::from_parts(hundredths, 0, 0, false, 2)
    }
}

prop_compose! {
    fn arb_date()(offset in 0i64..3650) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(offset)
    }
}

fn food_dto(name: &str, serving_type: ServingType, qty: Decimal) -> FoodDto {
    FoodDto {
        id: None,
        owner: FoodOwner::Global,
        name: name.to_string(),
        default_serving_type: serving_type,
        serving_type_qty: qty,
        nutrition: NutritionFacts {
            calories: Decimal::from(100),
            protein: Decimal::from(10),
            ..Default::default()
        },
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn service_with_user() -> (FoodService, Arc<InMemoryStore>, Uuid) {
    let store = Arc::new(InMemoryStore::new());
    let user = UserRepository::save(store.as_ref(), User::new("prop@example.com"))
        .await
        .unwrap();
    let service = FoodService::new(store.clone(), store.clone(), store.clone());
    (service, store, user.id)
}

proptest! {
    #[test]
    fn test_valid_food_names_pass_validation(name in arb_valid_food_name()) {
        prop_assert!(validate_food_name(&name).is_ok());
    }

    #[test]
    fn test_positive_quantities_pass_validation(qty in arb_quantity()) {
        prop_assert!(validate_serving_quantity(&qty).is_ok());
        prop_assert!(validate_serving_quantity(&(-qty)).is_err());
    }

    #[test]
    fn test_plain_query_matches_names_containing_it(
        prefix in "[a-z]{0,5}",
        query in "[a-z]{1,5}",
        suffix in "[a-z]{0,5}",
    ) {
        let name = format!("{}{}{}", prefix, query.to_uppercase(), suffix);
        prop_assert!(NamePattern::parse(&query).matches(&name));
    }

    #[test]
    fn test_default_serving_consumes_full_facts(
        serving_type in arb_serving_type(),
        qty in arb_quantity(),
        date in arb_date(),
    ) {
        let food = Food::from_dto(Uuid::new_v4(), FoodOwner::Global, &food_dto("Food", serving_type, qty));
        let eaten = FoodEaten::with_default_serving(Uuid::new_v4(), &food, date);

        prop_assert_eq!(eaten.serving_ratio(&food), Decimal::ONE);
        prop_assert_eq!(eaten.consumed(&food), food.nutrition.clone());
    }

    #[test]
    fn test_consumed_scales_with_quantity(
        qty in arb_quantity(),
        multiplier in 1u32..20,
    ) {
        let food = Food::from_dto(Uuid::new_v4(), FoodOwner::Global, &food_dto("Food", ServingType::Cup, qty));
        let mut eaten = FoodEaten::with_default_serving(Uuid::new_v4(), &food, NaiveDate::MIN);
        eaten.serving_qty = qty * Decimal::from(multiplier);

        prop_assert_eq!(
            eaten.consumed(&food).calories,
            Decimal::from(100 * multiplier)
        );
    }

    #[test]
    fn test_adding_same_food_twice_logs_once(date in arb_date(), repeats in 1usize..5) {
        runtime().block_on(async {
            let (service, store, user_id) = service_with_user().await;
            let food = FoodRepository::save(
                store.as_ref(),
                Food::from_dto(Uuid::new_v4(), FoodOwner::Global, &food_dto("Apple", ServingType::Ounce, Decimal::ONE)),
            )
            .await
            .unwrap();

            let mut created = 0;
            for _ in 0..repeats {
                if service.add_food_eaten(user_id, food.id, date).await.unwrap() {
                    created += 1;
                }
            }

            assert_eq!(created, 1);
            assert_eq!(store.food_eaten_count().await, 1);
        });
    }

    #[test]
    fn test_recent_window_is_inclusive(today in arb_date(), days_ago in 0i64..30) {
        runtime().block_on(async {
            let (service, store, user_id) = service_with_user().await;
            let food = FoodRepository::save(
                store.as_ref(),
                Food::from_dto(Uuid::new_v4(), FoodOwner::Global, &food_dto("Apple", ServingType::Ounce, Decimal::ONE)),
            )
            .await
            .unwrap();

            service
                .add_food_eaten(user_id, food.id, today - Duration::days(days_ago))
                .await
                .unwrap();

            let recent = service.find_eaten_recently(user_id, today).await.unwrap();
            assert_eq!(recent.len(), usize::from(days_ago <= 14));
        });
    }

    #[test]
    fn test_create_with_owned_name_never_adds_food(name in arb_valid_food_name()) {
        runtime().block_on(async {
            let (service, store, user_id) = service_with_user().await;
            let dto = food_dto(&name, ServingType::Gram, Decimal::from(50));

            assert_eq!(service.create_food(&dto, user_id).await.unwrap(), FoodUpdateOutcome::Success);
            assert_eq!(service.create_food(&dto, user_id).await.unwrap(), FoodUpdateOutcome::DuplicateName);
            assert_eq!(store.food_count().await, 1);
        });
    }

    #[test]
    fn test_update_of_foreign_food_changes_nothing(
        name in arb_valid_food_name(),
        new_name in arb_valid_food_name(),
    ) {
        runtime().block_on(async {
            let (service, store, user_id) = service_with_user().await;
            let owner = Uuid::new_v4();
            let theirs = FoodRepository::save(
                store.as_ref(),
                Food::from_dto(Uuid::new_v4(), FoodOwner::OwnedBy(owner), &food_dto(&name, ServingType::Cup, Decimal::ONE)),
            )
            .await
            .unwrap();

            let dto = FoodDto {
                id: Some(theirs.id),
                ..food_dto(&new_name, ServingType::Pint, Decimal::TWO)
            };
            assert_eq!(service.update_food(&dto, user_id).await.unwrap(), FoodUpdateOutcome::NotOwner);

            let stored = FoodRepository::find_by_id(store.as_ref(), theirs.id).await.unwrap();
            assert_eq!(stored, Some(theirs));
            assert_eq!(store.food_count().await, 1);
        });
    }
}
