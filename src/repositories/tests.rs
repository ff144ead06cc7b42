#[cfg(test)]
mod repository_tests {
    use crate::models::{
        Food, FoodDto, FoodEaten, FoodOwner, NamePattern, NutritionFacts, RepositoryError,
        ServingType, User,
    };
    use aws_sdk_dynamodb::types::AttributeValue;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use uuid::Uuid;

    use crate::repositories::*;

    fn create_test_client() -> Arc<aws_sdk_dynamodb::Client> {
        let config = aws_sdk_dynamodb::Config::builder()
            .region(aws_sdk_dynamodb::config::Region::new("us-east-1"))
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .build();
        Arc::new(aws_sdk_dynamodb::Client::from_conf(config))
    }

    fn create_test_food(owner: FoodOwner) -> Food {
        let dto = FoodDto {
            id: None,
            owner,
            name: "Greek Yogurt".to_string(),
            default_serving_type: ServingType::Cup,
            serving_type_qty: dec!(0.75),
            nutrition: NutritionFacts {
                calories: dec!(100),
                fat: dec!(0.7),
                carbs: dec!(6),
                sugar: dec!(6),
                protein: dec!(18),
                sodium: dec!(65),
                ..Default::default()
            },
        };
        Food::from_dto(Uuid::new_v4(), owner, &dto)
    }

    mod user_repository_tests {
        use super::*;

        #[test]
        fn test_user_item_roundtrip() {
            let user = User::new("eater@example.com");
            let item = DynamoDbUserRepository::user_to_item(&user);

            assert_eq!(
                item.get("email"),
                Some(&AttributeValue::S("eater@example.com".to_string()))
            );

            let converted = DynamoDbUserRepository::item_to_user(&item).unwrap();
            assert_eq!(converted.id, user.id);
            assert_eq!(converted.email, user.email);
        }

        #[test]
        fn test_user_item_missing_created_at() {
            let user = User::new("eater@example.com");
            let mut item = DynamoDbUserRepository::user_to_item(&user);
            item.remove("created_at");

            assert!(matches!(
                DynamoDbUserRepository::item_to_user(&item),
                Err(RepositoryError::InvalidItem { .. })
            ));
        }

        #[test]
        fn test_repository_table_names() {
            let client = create_test_client();
            let users =
                DynamoDbUserRepository::new(client.clone(), "users".to_string(), "us-east-1".to_string());
            let eaten = DynamoDbFoodEatenRepository::new(
                client,
                "eaten".to_string(),
                "us-east-1".to_string(),
            );

            assert_eq!(users.table_name(), "users");
            assert_eq!(eaten.table_name(), "eaten");
            assert_eq!(eaten.user_date_index(), "UserDateIndex");
        }
    }

    mod food_item_tests {
        use super::*;

        #[test]
        fn test_nutrition_survives_item_mapping() {
            let food = create_test_food(FoodOwner::Global);
            let item = DynamoDbFoodRepository::food_to_item(&food);

            let converted = DynamoDbFoodRepository::item_to_food(&item).unwrap();
            assert_eq!(converted.nutrition.fat, dec!(0.7));
            assert_eq!(converted.serving_type_qty, dec!(0.75));
        }

        #[test]
        fn test_item_missing_nutrition_is_invalid() {
            let food = create_test_food(FoodOwner::Global);
            let mut item = DynamoDbFoodRepository::food_to_item(&food);
            item.remove("nutrition");

            assert!(matches!(
                DynamoDbFoodRepository::item_to_food(&item),
                Err(RepositoryError::InvalidItem { .. })
            ));
        }
    }

    mod store_port_tests {
        use super::*;

        #[tokio::test]
        async fn test_memory_store_behind_trait_objects() {
            let store = Arc::new(InMemoryStore::new());
            let users: Arc<dyn UserRepository> = store.clone();
            let foods: Arc<dyn FoodRepository> = store.clone();
            let eaten: Arc<dyn FoodEatenRepository> = store.clone();

            let user = users.save(User::new("port@example.com")).await.unwrap();
            let food = foods
                .save(create_test_food(FoodOwner::OwnedBy(user.id)))
                .await
                .unwrap();
            let date = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
            eaten
                .save(FoodEaten::with_default_serving(user.id, &food, date))
                .await
                .unwrap();

            assert!(users.find_by_id(user.id).await.unwrap().is_some());
            assert_eq!(
                foods
                    .search_visible_to(user.id, &NamePattern::parse("yog"))
                    .await
                    .unwrap()
                    .len(),
                1
            );
            assert!(foods
                .search_visible_to(Uuid::new_v4(), &NamePattern::parse("yog"))
                .await
                .unwrap()
                .is_empty());
            assert_eq!(eaten.find_by_user_and_date(user.id, date).await.unwrap().len(), 1);
        }
    }
}
