use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::models::{
    validate_search_query, validate_serving_quantity, Food, FoodDto, FoodEaten, FoodEatenDto,
    FoodOwner, FoodUpdateOutcome, NamePattern, ServiceError, ServiceResult, ServingType,
    Validate,
};
use crate::observability::Metrics;
use crate::repositories::{FoodEatenRepository, FoodRepository, UserRepository};

/// Length of the "recently eaten" window, ending at (and including) the current date
pub const RECENT_WINDOW_DAYS: i64 = 14;

/// Food logging and catalogue rules over the three store ports
pub struct FoodService {
    users: Arc<dyn UserRepository>,
    foods: Arc<dyn FoodRepository>,
    foods_eaten: Arc<dyn FoodEatenRepository>,
    metrics: Option<Arc<Metrics>>,
}

impl FoodService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        foods: Arc<dyn FoodRepository>,
        foods_eaten: Arc<dyn FoodEatenRepository>,
    ) -> Self {
        Self {
            users,
            foods,
            foods_eaten,
            metrics: None,
        }
    }

    /// Create a FoodService that records `food_operations_total`
    pub fn new_with_metrics(
        users: Arc<dyn UserRepository>,
        foods: Arc<dyn FoodRepository>,
        foods_eaten: Arc<dyn FoodEatenRepository>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            users,
            foods,
            foods_eaten,
            metrics: Some(metrics),
        }
    }

    /// Everything the user logged on `date`, ordered by food name
    #[instrument(skip(self), fields(user_id = %user_id, date = %date))]
    pub async fn find_eaten_on_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> ServiceResult<Vec<FoodEatenDto>> {
        let result: ServiceResult<Vec<FoodEatenDto>> = async {
            let records = self.foods_eaten.find_by_user_and_date(user_id, date).await?;

            let mut dtos = Vec::with_capacity(records.len());
            for record in &records {
                match self.foods.find_by_id(record.food_id).await? {
                    Some(food) => dtos.push(FoodEatenDto::from_parts(record, &food)),
                    None => crate::warn_with_trace!(
                        food_eaten_id = %record.id,
                        food_id = %record.food_id,
                        "Skipping food eaten entry whose food no longer exists"
                    ),
                }
            }
            dtos.sort_by(|a, b| a.food.name.cmp(&b.food.name).then(a.id.cmp(&b.id)));

            crate::info_with_trace!("Found {} foods eaten", dtos.len());
            Ok(dtos)
        }
        .await;

        self.record("find_eaten_on_date", &result);
        result
    }

    /// Distinct foods the user ate in the window ending at `current_date`, ordered by name
    #[instrument(skip(self), fields(user_id = %user_id, current_date = %current_date))]
    pub async fn find_eaten_recently(
        &self,
        user_id: Uuid,
        current_date: NaiveDate,
    ) -> ServiceResult<Vec<FoodDto>> {
        let result: ServiceResult<Vec<FoodDto>> = async {
            let window_start = current_date
                .checked_sub_signed(Duration::days(RECENT_WINDOW_DAYS))
                .unwrap_or(NaiveDate::MIN);

            let records = self
                .foods_eaten
                .find_by_user_within_range(user_id, window_start, current_date)
                .await?;
            let food_ids: BTreeSet<Uuid> = records.iter().map(|record| record.food_id).collect();

            let mut foods = Vec::with_capacity(food_ids.len());
            for food_id in food_ids {
                if let Some(food) = self.foods.find_by_id(food_id).await? {
                    foods.push(food);
                }
            }
            sort_by_name(&mut foods);

            crate::info_with_trace!("Found {} recently eaten foods", foods.len());
            Ok(foods.iter().map(FoodDto::from).collect())
        }
        .await;

        self.record("find_eaten_recently", &result);
        result
    }

    #[instrument(skip(self), fields(id = %id))]
    pub async fn find_food_eaten_by_id(&self, id: Uuid) -> ServiceResult<Option<FoodEatenDto>> {
        let result: ServiceResult<Option<FoodEatenDto>> = async {
            let Some(record) = self.foods_eaten.find_by_id(id).await? else {
                return Ok(None);
            };
            let food = self.foods.find_by_id(record.food_id).await?;
            Ok(food.map(|food| FoodEatenDto::from_parts(&record, &food)))
        }
        .await;

        self.record("find_food_eaten_by_id", &result);
        result
    }

    /// Log `food_id` for the user on `date` with the food's default serving.
    ///
    /// Returns `false` without writing when the food is already logged on that date.
    #[instrument(skip(self), fields(user_id = %user_id, food_id = %food_id, date = %date))]
    pub async fn add_food_eaten(
        &self,
        user_id: Uuid,
        food_id: Uuid,
        date: NaiveDate,
    ) -> ServiceResult<bool> {
        let result: ServiceResult<bool> = async {
            if self.users.find_by_id(user_id).await?.is_none() {
                return Err(ServiceError::UserNotFound { id: user_id });
            }
            let food = self
                .foods
                .find_by_id(food_id)
                .await?
                .ok_or(ServiceError::FoodNotFound { id: food_id })?;

            let logged = self.foods_eaten.find_by_user_and_date(user_id, date).await?;
            if logged.iter().any(|record| record.food_id == food_id) {
                crate::info_with_trace!("Food already logged for this date");
                return Ok(false);
            }

            let record = FoodEaten::with_default_serving(user_id, &food, date);
            self.foods_eaten.save(record).await?;

            crate::info_with_trace!("Food eaten logged");
            Ok(true)
        }
        .await;

        self.record("add_food_eaten", &result);
        result
    }

    /// Overwrite the serving of a logged food
    #[instrument(skip(self), fields(id = %id, serving_qty = %serving_qty, serving_type = %serving_type))]
    pub async fn update_food_eaten(
        &self,
        id: Uuid,
        serving_qty: Decimal,
        serving_type: ServingType,
    ) -> ServiceResult<FoodEatenDto> {
        let result: ServiceResult<FoodEatenDto> = async {
            validate_serving_quantity(&serving_qty)?;

            let mut record = self
                .foods_eaten
                .find_by_id(id)
                .await?
                .ok_or(ServiceError::FoodEatenNotFound { id })?;
            let food = self
                .foods
                .find_by_id(record.food_id)
                .await?
                .ok_or(ServiceError::FoodNotFound { id: record.food_id })?;

            record.serving_qty = serving_qty;
            record.serving_type = serving_type;
            let record = self.foods_eaten.save(record).await?;

            crate::info_with_trace!("Food eaten serving updated");
            Ok(FoodEatenDto::from_parts(&record, &food))
        }
        .await;

        self.record("update_food_eaten", &result);
        result
    }

    #[instrument(skip(self), fields(id = %id))]
    pub async fn delete_food_eaten(&self, id: Uuid) -> ServiceResult<()> {
        let result: ServiceResult<()> = async {
            if self.foods_eaten.find_by_id(id).await?.is_none() {
                return Err(ServiceError::FoodEatenNotFound { id });
            }
            self.foods_eaten.delete(id).await?;

            crate::info_with_trace!("Food eaten deleted");
            Ok(())
        }
        .await;

        self.record("delete_food_eaten", &result);
        result
    }

    /// Global and user-owned foods whose names match `query`, ordered by name
    #[instrument(skip(self), fields(user_id = %user_id, query = %query))]
    pub async fn search_foods(&self, user_id: Uuid, query: &str) -> ServiceResult<Vec<FoodDto>> {
        let result: ServiceResult<Vec<FoodDto>> = async {
            validate_search_query(query)?;
            let pattern = NamePattern::parse(query);

            let mut foods = self.foods.search_visible_to(user_id, &pattern).await?;
            // Stores may return foods the user cannot see; never leak them
            foods.retain(|food| food.is_visible_to(user_id));
            sort_by_name(&mut foods);

            crate::info_with_trace!(pattern = %pattern, "Found {} foods", foods.len());
            Ok(foods.iter().map(FoodDto::from).collect())
        }
        .await;

        self.record("search_foods", &result);
        result
    }

    #[instrument(skip(self), fields(food_id = %food_id))]
    pub async fn get_food_by_id(&self, food_id: Uuid) -> ServiceResult<Option<FoodDto>> {
        let result = self
            .foods
            .find_by_id(food_id)
            .await
            .map(|food| food.map(FoodDto::from))
            .map_err(ServiceError::from);

        self.record("get_food_by_id", &result);
        result
    }

    /// Apply `dto` to the food it names on behalf of `acting_user`.
    ///
    /// Global foods are never modified: the user gets an owned copy under a new id.
    #[instrument(skip(self, dto), fields(food_id = ?dto.id, name = %dto.name, acting_user = %acting_user))]
    pub async fn update_food(
        &self,
        dto: &FoodDto,
        acting_user: Uuid,
    ) -> ServiceResult<FoodUpdateOutcome> {
        let result: ServiceResult<FoodUpdateOutcome> = async {
            dto.validate()?;
            let food_id = dto.id.ok_or_else(|| ServiceError::ValidationError {
                message: "Food id is required for an update".to_string(),
            })?;
            self.require_user(acting_user).await?;

            let mut food = self
                .foods
                .find_by_id(food_id)
                .await?
                .ok_or(ServiceError::FoodNotFound { id: food_id })?;

            if let FoodOwner::OwnedBy(owner) = food.owner {
                if owner != acting_user {
                    crate::warn_with_trace!(owner = %owner, "Attempt to modify another user's food");
                    return Ok(FoodUpdateOutcome::NotOwner);
                }
            }

            let name = dto.name.trim();
            if let Some(existing) = self.foods.find_by_owner_and_name(acting_user, name).await? {
                if existing.id != food.id {
                    return Ok(FoodUpdateOutcome::DuplicateName);
                }
            }

            match food.owner {
                FoodOwner::Global => {
                    let copy = Food::from_dto(Uuid::new_v4(), FoodOwner::OwnedBy(acting_user), dto);
                    crate::info_with_trace!(copy_id = %copy.id, "Creating customized copy of global food");
                    self.foods.save(copy).await?;
                }
                FoodOwner::OwnedBy(_) => {
                    food.apply(dto);
                    self.foods.save(food).await?;
                }
            }

            Ok(FoodUpdateOutcome::Success)
        }
        .await;

        self.record_outcome("update_food", &result);
        result
    }

    /// Create a food owned by `acting_user`
    #[instrument(skip(self, dto), fields(name = %dto.name, acting_user = %acting_user))]
    pub async fn create_food(
        &self,
        dto: &FoodDto,
        acting_user: Uuid,
    ) -> ServiceResult<FoodUpdateOutcome> {
        let result: ServiceResult<FoodUpdateOutcome> = async {
            dto.validate()?;
            self.require_user(acting_user).await?;

            if self
                .foods
                .find_by_owner_and_name(acting_user, dto.name.trim())
                .await?
                .is_some()
            {
                return Ok(FoodUpdateOutcome::DuplicateName);
            }

            let id = match dto.id {
                Some(id) if self.foods.find_by_id(id).await?.is_some() => {
                    return Err(ServiceError::ValidationError {
                        message: format!("Food id {} is already in use", id),
                    });
                }
                Some(id) => id,
                None => Uuid::new_v4(),
            };

            let food = Food::from_dto(id, FoodOwner::OwnedBy(acting_user), dto);
            self.foods.save(food).await?;

            crate::info_with_trace!(food_id = %id, "Customized food created");
            Ok(FoodUpdateOutcome::Success)
        }
        .await;

        self.record_outcome("create_food", &result);
        result
    }

    async fn require_user(&self, user_id: Uuid) -> ServiceResult<()> {
        match self.users.find_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::UserNotFound { id: user_id }),
        }
    }

    fn record<T>(&self, operation: &str, result: &ServiceResult<T>) {
        if let Some(metrics) = &self.metrics {
            let status = if result.is_ok() { "success" } else { "error" };
            metrics.record_food_operation(operation, status);
        }
        if let Err(e) = result {
            crate::error_with_trace!(operation = operation, error = %e, "Food operation failed");
        }
    }

    fn record_outcome(&self, operation: &str, result: &ServiceResult<FoodUpdateOutcome>) {
        match result {
            Ok(outcome) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_food_operation(operation, outcome.as_label());
                }
                crate::info_with_trace!(operation = operation, outcome = %outcome, "Food operation finished");
            }
            Err(_) => self.record(operation, result),
        }
    }
}

fn sort_by_name(foods: &mut [Food]) {
    foods.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
}
