use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Units a serving of food can be measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServingType {
    Ounce,
    Cup,
    Pound,
    Pint,
    Tablespoon,
    Teaspoon,
    Gram,
    Custom,
}

impl ServingType {
    pub const ALL: [ServingType; 8] = [
        ServingType::Ounce,
        ServingType::Cup,
        ServingType::Pound,
        ServingType::Pint,
        ServingType::Tablespoon,
        ServingType::Teaspoon,
        ServingType::Gram,
        ServingType::Custom,
    ];

    /// Weight of one unit expressed in ounces. `Custom` has no conversion.
    pub fn ounces(&self) -> Decimal {
        match self {
            ServingType::Ounce => dec!(1),
            ServingType::Cup => dec!(8),
            ServingType::Pound => dec!(16),
            ServingType::Pint => dec!(16),
            ServingType::Tablespoon => dec!(0.5),
            ServingType::Teaspoon => dec!(0.1666667),
            ServingType::Gram => dec!(0.035274),
            ServingType::Custom => Decimal::ZERO,
        }
    }
}

impl fmt::Display for ServingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServingType::Ounce => write!(f, "ounce"),
            ServingType::Cup => write!(f, "cup"),
            ServingType::Pound => write!(f, "pound"),
            ServingType::Pint => write!(f, "pint"),
            ServingType::Tablespoon => write!(f, "tablespoon"),
            ServingType::Teaspoon => write!(f, "teaspoon"),
            ServingType::Gram => write!(f, "gram"),
            ServingType::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for ServingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ounce" => Ok(ServingType::Ounce),
            "cup" => Ok(ServingType::Cup),
            "pound" => Ok(ServingType::Pound),
            "pint" => Ok(ServingType::Pint),
            "tablespoon" => Ok(ServingType::Tablespoon),
            "teaspoon" => Ok(ServingType::Teaspoon),
            "gram" => Ok(ServingType::Gram),
            "custom" => Ok(ServingType::Custom),
            _ => Err(format!("Invalid serving type: {}", s)),
        }
    }
}
