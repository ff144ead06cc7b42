use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{FoodDto, NutritionFacts, UpdateFoodEatenRequest, ValidationError, ValidationResult};

/// Trait for validating input models
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

/// Validation constants
pub const MAX_FOOD_NAME_LENGTH: usize = 200;
pub const MAX_SEARCH_QUERY_LENGTH: usize = 200;
pub const MIN_SERVING_QUANTITY: Decimal = dec!(0.001);
pub const MAX_SERVING_QUANTITY: Decimal = dec!(10000);
pub const MAX_SERVING_QUANTITY_DECIMALS: u32 = 3;
pub const MAX_NUTRIENT_VALUE: Decimal = dec!(100000);

impl Validate for FoodDto {
    fn validate(&self) -> ValidationResult<()> {
        validate_food_name(&self.name)?;
        validate_serving_quantity(&self.serving_type_qty)?;
        validate_nutrition(&self.nutrition)?;
        Ok(())
    }
}

impl Validate for UpdateFoodEatenRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_serving_quantity(&self.serving_qty)
    }
}

/// Validate food name
pub fn validate_food_name(name: &str) -> ValidationResult<()> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "name".to_string(),
        });
    }

    if trimmed.chars().count() > MAX_FOOD_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max_length: MAX_FOOD_NAME_LENGTH,
            actual_length: trimmed.chars().count(),
        });
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidValue {
            field: "name".to_string(),
            value: name.to_string(),
            reason: "Contains invalid control characters".to_string(),
        });
    }

    Ok(())
}

/// Validate a serving quantity: within bounds and at most three decimal places
pub fn validate_serving_quantity(quantity: &Decimal) -> ValidationResult<()> {
    if *quantity < MIN_SERVING_QUANTITY || *quantity > MAX_SERVING_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "serving_qty".to_string(),
            min: MIN_SERVING_QUANTITY.to_string(),
            max: MAX_SERVING_QUANTITY.to_string(),
            value: quantity.to_string(),
        });
    }

    if quantity.normalize().scale() > MAX_SERVING_QUANTITY_DECIMALS {
        return Err(ValidationError::InvalidValue {
            field: "serving_qty".to_string(),
            value: quantity.to_string(),
            reason: format!(
                "At most {} decimal places are allowed",
                MAX_SERVING_QUANTITY_DECIMALS
            ),
        });
    }

    Ok(())
}

/// Validate a single nutrient amount
pub fn validate_nutrient(field: &str, value: &Decimal) -> ValidationResult<()> {
    if *value < Decimal::ZERO || *value > MAX_NUTRIENT_VALUE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: "0".to_string(),
            max: MAX_NUTRIENT_VALUE.to_string(),
            value: value.to_string(),
        });
    }

    Ok(())
}

/// Validate every nutrient in a set of facts
pub fn validate_nutrition(nutrition: &NutritionFacts) -> ValidationResult<()> {
    for (field, value) in nutrition.entries() {
        validate_nutrient(field, &value)?;
    }
    Ok(())
}

/// Validate a food search query
pub fn validate_search_query(query: &str) -> ValidationResult<()> {
    let trimmed = query.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "search".to_string(),
        });
    }

    if trimmed.chars().count() > MAX_SEARCH_QUERY_LENGTH {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max_length: MAX_SEARCH_QUERY_LENGTH,
            actual_length: trimmed.chars().count(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FoodOwner, ServingType};

    fn create_valid_dto() -> FoodDto {
        FoodDto {
            id: None,
            owner: FoodOwner::Global,
            name: "Oatmeal".to_string(),
            default_serving_type: ServingType::Cup,
            serving_type_qty: dec!(1),
            nutrition: NutritionFacts {
                calories: dec!(150),
                carbs: dec!(27),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_valid_food_dto() {
        assert!(create_valid_dto().validate().is_ok());
    }

    #[test]
    fn test_food_name_validation() {
        assert!(validate_food_name("Apple").is_ok());
        assert!(matches!(
            validate_food_name("   "),
            Err(ValidationError::RequiredField { .. })
        ));
        assert!(matches!(
            validate_food_name(&"a".repeat(201)),
            Err(ValidationError::TooLong { .. })
        ));
        assert!(matches!(
            validate_food_name("bad\u{0007}name"),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_serving_quantity_validation() {
        assert!(validate_serving_quantity(&dec!(0.25)).is_ok());
        assert!(validate_serving_quantity(&MAX_SERVING_QUANTITY).is_ok());
        assert!(validate_serving_quantity(&Decimal::ZERO).is_err());
        assert!(validate_serving_quantity(&dec!(-1)).is_err());
        assert!(validate_serving_quantity(&dec!(10000.01)).is_err());
    }

    #[test]
    fn test_serving_quantity_precision() {
        assert!(validate_serving_quantity(&MIN_SERVING_QUANTITY).is_ok());
        assert!(validate_serving_quantity(&dec!(2.500)).is_ok());
        assert!(validate_serving_quantity(&dec!(1.0000)).is_ok());
        assert!(matches!(
            validate_serving_quantity(&dec!(0.0009)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate_serving_quantity(&dec!(1.0005)),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert!(validate_serving_quantity(&dec!(0.00000000000000000001)).is_err());
    }

    #[test]
    fn test_nutrient_validation() {
        assert!(validate_nutrient("fat", &Decimal::ZERO).is_ok());
        assert!(validate_nutrient("fat", &dec!(-0.1)).is_err());
        assert!(validate_nutrient("sodium", &dec!(100001)).is_err());

        let mut dto = create_valid_dto();
        dto.nutrition.sugar = dec!(-3);
        match dto.validate() {
            Err(ValidationError::OutOfRange { field, .. }) => assert_eq!(field, "sugar"),
            other => panic!("Expected OutOfRange for sugar, got {:?}", other),
        }
    }

    #[test]
    fn test_search_query_validation() {
        assert!(validate_search_query("app").is_ok());
        assert!(validate_search_query("").is_err());
        assert!(validate_search_query(&"q".repeat(201)).is_err());
    }

    #[test]
    fn test_update_food_eaten_validation() {
        let request = UpdateFoodEatenRequest {
            serving_qty: dec!(2),
            serving_type: ServingType::Ounce,
        };
        assert!(request.validate().is_ok());

        let request = UpdateFoodEatenRequest {
            serving_qty: Decimal::ZERO,
            serving_type: ServingType::Ounce,
        };
        assert!(request.validate().is_err());
    }
}
