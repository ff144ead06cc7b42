use async_trait::async_trait;
use aws_sdk_dynamodb::operation::RequestId;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn, Instrument};
use uuid::Uuid;

use super::dynamodb::{
    decimal_attr, dynamodb_span, map_dynamodb_error, record_operation, optional_uuid_attr, parsed_attr,
    string_attr, timestamp_attr, uuid_attr, Item,
};
use crate::models::{
    Food, FoodOwner, NamePattern, NutritionFacts, RepositoryError, RepositoryResult,
};
use crate::observability::Metrics;

/// Store port for the food catalogue
#[async_trait]
pub trait FoodRepository: Send + Sync {
    /// Find a food by its id
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Food>>;

    /// Find the food a user owns under an exact name, if any
    async fn find_by_owner_and_name(
        &self,
        owner_id: Uuid,
        name: &str,
    ) -> RepositoryResult<Option<Food>>;

    /// Global foods plus the user's own foods whose names match `pattern`
    async fn search_visible_to(
        &self,
        user_id: Uuid,
        pattern: &NamePattern,
    ) -> RepositoryResult<Vec<Food>>;

    /// Insert or replace a food
    async fn save(&self, food: Food) -> RepositoryResult<Food>;
}

/// DynamoDB implementation of the FoodRepository trait.
///
/// Owned foods carry an `owner_id` attribute and are indexed by
/// `OwnerNameIndex` (owner_id, name). Global foods leave the attribute
/// out, so the index stays sparse.
pub struct DynamoDbFoodRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    owner_name_index: String,
    region: String,
    metrics: Option<Arc<Metrics>>,
}

impl DynamoDbFoodRepository {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            table_name,
            owner_name_index: "OwnerNameIndex".to_string(),
            region,
            metrics: None,
        }
    }

    /// Record per-call latency and outcome in `database_operations_total`
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Get the owner/name index name (for testing)
    pub fn owner_name_index(&self) -> &str {
        &self.owner_name_index
    }

    /// Convert a Food struct to DynamoDB attribute values
    pub fn food_to_item(food: &Food) -> Item {
        let mut item = Item::new();

        item.insert("id".to_string(), AttributeValue::S(food.id.to_string()));
        if let Some(owner_id) = food.owner.user_id() {
            item.insert(
                "owner_id".to_string(),
                AttributeValue::S(owner_id.to_string()),
            );
        }
        item.insert("name".to_string(), AttributeValue::S(food.name.clone()));
        item.insert(
            "default_serving_type".to_string(),
            AttributeValue::S(food.default_serving_type.to_string()),
        );
        item.insert(
            "serving_type_qty".to_string(),
            AttributeValue::N(food.serving_type_qty.to_string()),
        );

        let nutrition: HashMap<String, AttributeValue> = food
            .nutrition
            .entries()
            .iter()
            .map(|(field, value)| (field.to_string(), AttributeValue::N(value.to_string())))
            .collect();
        item.insert("nutrition".to_string(), AttributeValue::M(nutrition));

        item.insert(
            "created_at".to_string(),
            AttributeValue::S(food.created_at.to_rfc3339()),
        );
        item.insert(
            "updated_at".to_string(),
            AttributeValue::S(food.updated_at.to_rfc3339()),
        );

        item
    }

    /// Convert DynamoDB item to Food struct
    pub fn item_to_food(item: &Item) -> RepositoryResult<Food> {
        let nutrition_map = item
            .get("nutrition")
            .and_then(|v| v.as_m().ok())
            .ok_or_else(|| RepositoryError::InvalidItem {
                message: "Missing nutrition".to_string(),
            })?;
        let nutrient = |field: &str| decimal_attr(nutrition_map, field);

        let nutrition = NutritionFacts {
            calories: nutrient("calories")?,
            fat: nutrient("fat")?,
            saturated_fat: nutrient("saturated_fat")?,
            carbs: nutrient("carbs")?,
            fiber: nutrient("fiber")?,
            sugar: nutrient("sugar")?,
            protein: nutrient("protein")?,
            sodium: nutrient("sodium")?,
        };

        let created_at =
            timestamp_attr(item, "created_at").ok_or_else(|| RepositoryError::InvalidItem {
                message: "Invalid created_at".to_string(),
            })?;
        // Older items may lack updated_at
        let updated_at = timestamp_attr(item, "updated_at").unwrap_or(created_at);

        Ok(Food {
            id: uuid_attr(item, "id")?,
            owner: FoodOwner::from(optional_uuid_attr(item, "owner_id")?),
            name: string_attr(item, "name")?,
            default_serving_type: parsed_attr(item, "default_serving_type")?,
            serving_type_qty: decimal_attr(item, "serving_type_qty")?,
            nutrition,
            created_at,
            updated_at,
        })
    }

    fn parse_items(items: Vec<Item>) -> Vec<Food> {
        items
            .iter()
            .filter_map(|item| match Self::item_to_food(item) {
                Ok(food) => Some(food),
                Err(e) => {
                    warn!("Failed to parse food item: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl FoodRepository for DynamoDbFoodRepository {
    #[instrument(skip(self), fields(table = %self.table_name, id = %id))]
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Food>> {
        let get_span = dynamodb_span("GetItem", &self.table_name, &self.region);

        let response = async {
            let started = Instant::now();
            let result = self
                .client
                .get_item()
                .table_name(&self.table_name)
                .key("id", AttributeValue::S(id.to_string()))
                .send()
                .await;
            record_operation(&self.metrics, "GetItem", &self.table_name, started, result.is_ok());

            match &result {
                Ok(output) => {
                    tracing::Span::current().record("http.status_code", 200);
                    if let Some(request_id) = output.request_id() {
                        tracing::Span::current().record("aws.request_id", request_id);
                    }
                }
                Err(e) => {
                    tracing::Span::current().record("http.status_code", 400);
                    error!("DynamoDB GetItem failed: {}", e);
                }
            }

            result.map_err(|e| map_dynamodb_error(&self.table_name, e.into()))
        }
        .instrument(get_span)
        .await?;

        match response.item {
            Some(item) => Ok(Some(Self::item_to_food(&item)?)),
            None => {
                info!("Food not found");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self), fields(table = %self.table_name, owner_id = %owner_id))]
    async fn find_by_owner_and_name(
        &self,
        owner_id: Uuid,
        name: &str,
    ) -> RepositoryResult<Option<Food>> {
        let query_span = dynamodb_span("Query", &self.table_name, &self.region);

        let response = async {
            let started = Instant::now();
            let result = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(&self.owner_name_index)
                .key_condition_expression("owner_id = :owner_id AND #name = :name")
                .expression_attribute_names("#name", "name")
                .expression_attribute_values(":owner_id", AttributeValue::S(owner_id.to_string()))
                .expression_attribute_values(":name", AttributeValue::S(name.to_string()))
                .send()
                .await;
            record_operation(&self.metrics, "Query", &self.table_name, started, result.is_ok());
            result.map_err(|e| map_dynamodb_error(&self.table_name, e.into()))
        }
        .instrument(query_span)
        .await?;

        Ok(Self::parse_items(response.items.unwrap_or_default())
            .into_iter()
            .next())
    }

    #[instrument(skip(self), fields(table = %self.table_name, user_id = %user_id, pattern = %pattern))]
    async fn search_visible_to(
        &self,
        user_id: Uuid,
        pattern: &NamePattern,
    ) -> RepositoryResult<Vec<Food>> {
        let mut foods = Vec::new();
        let mut start_key: Option<Item> = None;

        // DynamoDB has no LIKE operator, so visibility is filtered server side
        // and the name pattern is applied to each page.
        loop {
            let scan_span = dynamodb_span("Scan", &self.table_name, &self.region);

            let response = async {
                let started = Instant::now();
                let result = self
                    .client
                    .scan()
                    .table_name(&self.table_name)
                    .filter_expression("attribute_not_exists(owner_id) OR owner_id = :owner_id")
                    .expression_attribute_values(
                        ":owner_id",
                        AttributeValue::S(user_id.to_string()),
                    )
                    .set_exclusive_start_key(start_key.take())
                    .send()
                    .await;
                record_operation(&self.metrics, "Scan", &self.table_name, started, result.is_ok());
                result.map_err(|e| map_dynamodb_error(&self.table_name, e.into()))
            }
            .instrument(scan_span)
            .await?;

            foods.extend(
                Self::parse_items(response.items.unwrap_or_default())
                    .into_iter()
                    .filter(|food| pattern.matches(&food.name)),
            );

            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        info!("Found {} matching foods", foods.len());
        Ok(foods)
    }

    #[instrument(skip(self, food), fields(table = %self.table_name, id = %food.id))]
    async fn save(&self, food: Food) -> RepositoryResult<Food> {
        let item = Self::food_to_item(&food);
        let put_span = dynamodb_span("PutItem", &self.table_name, &self.region);

        async {
            let started = Instant::now();
            let result = self
                .client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .send()
                .await;
            record_operation(&self.metrics, "PutItem", &self.table_name, started, result.is_ok());
            result.map_err(|e| map_dynamodb_error(&self.table_name, e.into()))
        }
        .instrument(put_span)
        .await?;

        info!("Food saved");
        Ok(food)
    }
}
