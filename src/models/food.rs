use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::ServingType;

pub const SUCCESS_MESSAGE: &str = "Success!";
pub const DUPLICATE_NAME_MESSAGE: &str =
    "Error:  You already have another customized food with this name.";
pub const NOT_OWNER_MESSAGE: &str =
    "Error:  You are attempting to modify another user's customized food.";

/// Who a food belongs to. Global foods are shared by every user and can
/// only be changed through a per-user copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "user_id", rename_all = "snake_case")]
pub enum FoodOwner {
    #[default]
    Global,
    OwnedBy(Uuid),
}

impl FoodOwner {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            FoodOwner::Global => None,
            FoodOwner::OwnedBy(user_id) => Some(*user_id),
        }
    }
}

impl From<Option<Uuid>> for FoodOwner {
    fn from(user_id: Option<Uuid>) -> Self {
        match user_id {
            Some(user_id) => FoodOwner::OwnedBy(user_id),
            None => FoodOwner::Global,
        }
    }
}

/// Nutrient facts for one serving. Missing nutrients deserialize as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionFacts {
    pub calories: Decimal,
    pub fat: Decimal,
    pub saturated_fat: Decimal,
    pub carbs: Decimal,
    pub fiber: Decimal,
    pub sugar: Decimal,
    pub protein: Decimal,
    pub sodium: Decimal,
}

impl NutritionFacts {
    /// Multiply every nutrient by `ratio`, rounded to two decimal places.
    /// Products beyond the `Decimal` range saturate.
    pub fn scaled(&self, ratio: Decimal) -> Self {
        let scale = |value: Decimal| value.saturating_mul(ratio).round_dp(2);
        Self {
            calories: scale(self.calories),
            fat: scale(self.fat),
            saturated_fat: scale(self.saturated_fat),
            carbs: scale(self.carbs),
            fiber: scale(self.fiber),
            sugar: scale(self.sugar),
            protein: scale(self.protein),
            sodium: scale(self.sodium),
        }
    }

    /// Named values, in display order
    pub fn entries(&self) -> [(&'static str, Decimal); 8] {
        [
            ("calories", self.calories),
            ("fat", self.fat),
            ("saturated_fat", self.saturated_fat),
            ("carbs", self.carbs),
            ("fiber", self.fiber),
            ("sugar", self.sugar),
            ("protein", self.protein),
            ("sodium", self.sodium),
        ]
    }
}

/// Core food catalogue record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub id: Uuid,
    pub owner: FoodOwner,
    pub name: String,
    pub default_serving_type: ServingType,
    pub serving_type_qty: Decimal,
    pub nutrition: NutritionFacts,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Transfer object for foods, used both as API input and output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodDto {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub owner: FoodOwner,
    pub name: String,
    pub default_serving_type: ServingType,
    pub serving_type_qty: Decimal,
    #[serde(default)]
    pub nutrition: NutritionFacts,
}

impl Food {
    /// Build a food with the given id and owner, taking every editable field from the DTO.
    /// The name is stored trimmed.
    pub fn from_dto(id: Uuid, owner: FoodOwner, dto: &FoodDto) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner,
            name: dto.name.trim().to_string(),
            default_serving_type: dto.default_serving_type,
            serving_type_qty: dto.serving_type_qty,
            nutrition: dto.nutrition.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite name, serving and nutrient fields from the DTO
    pub fn apply(&mut self, dto: &FoodDto) {
        self.name = dto.name.trim().to_string();
        self.default_serving_type = dto.default_serving_type;
        self.serving_type_qty = dto.serving_type_qty;
        self.nutrition = dto.nutrition.clone();
        self.updated_at = Utc::now();
    }

    pub fn is_global(&self) -> bool {
        self.owner == FoodOwner::Global
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner == FoodOwner::OwnedBy(user_id)
    }

    /// Global foods are visible to everyone, owned foods only to their owner
    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        self.is_global() || self.is_owned_by(user_id)
    }
}

impl From<&Food> for FoodDto {
    fn from(food: &Food) -> Self {
        Self {
            id: Some(food.id),
            owner: food.owner,
            name: food.name.clone(),
            default_serving_type: food.default_serving_type,
            serving_type_qty: food.serving_type_qty,
            nutrition: food.nutrition.clone(),
        }
    }
}

impl From<Food> for FoodDto {
    fn from(food: Food) -> Self {
        FoodDto::from(&food)
    }
}

/// Result of a create or update request on a food.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoodUpdateOutcome {
    Success,
    DuplicateName,
    NotOwner,
}

impl FoodUpdateOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            FoodUpdateOutcome::Success => SUCCESS_MESSAGE,
            FoodUpdateOutcome::DuplicateName => DUPLICATE_NAME_MESSAGE,
            FoodUpdateOutcome::NotOwner => NOT_OWNER_MESSAGE,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FoodUpdateOutcome::Success)
    }

    /// Short label used for metrics and logs
    pub fn as_label(&self) -> &'static str {
        match self {
            FoodUpdateOutcome::Success => "success",
            FoodUpdateOutcome::DuplicateName => "duplicate_name",
            FoodUpdateOutcome::NotOwner => "not_owner",
        }
    }
}

impl fmt::Display for FoodUpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Response body for food create/update requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodOutcomeResponse {
    pub success: bool,
    pub message: String,
}

impl From<FoodUpdateOutcome> for FoodOutcomeResponse {
    fn from(outcome: FoodUpdateOutcome) -> Self {
        Self {
            success: outcome.is_success(),
            message: outcome.message().to_string(),
        }
    }
}
