use async_trait::async_trait;
use aws_sdk_dynamodb::operation::RequestId;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn, Instrument};
use uuid::Uuid;

use super::dynamodb::{
    date_attr, date_value, decimal_attr, dynamodb_span, map_dynamodb_error, record_operation, parsed_attr,
    uuid_attr, Item,
};
use crate::models::{FoodEaten, RepositoryResult};
use crate::observability::Metrics;

/// Store port for consumption records
#[async_trait]
pub trait FoodEatenRepository: Send + Sync {
    /// Find a consumption record by id
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<FoodEaten>>;

    /// All records a user logged on one date
    async fn find_by_user_and_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<FoodEaten>>;

    /// All records a user logged between `from` and `to`, both inclusive
    async fn find_by_user_within_range(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<FoodEaten>>;

    /// Insert or replace a record
    async fn save(&self, food_eaten: FoodEaten) -> RepositoryResult<FoodEaten>;

    /// Remove a record. Deleting a missing id is not an error.
    async fn delete(&self, id: Uuid) -> RepositoryResult<()>;
}

/// DynamoDB implementation of the FoodEatenRepository trait, keyed by id
/// with a `UserDateIndex` (user_id, date) for per-user lookups
pub struct DynamoDbFoodEatenRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    user_date_index: String,
    region: String,
    metrics: Option<Arc<Metrics>>,
}

impl DynamoDbFoodEatenRepository {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            table_name,
            user_date_index: "UserDateIndex".to_string(),
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

    pub fn user_date_index(&self) -> &str {
        &self.user_date_index
    }

    pub fn food_eaten_to_item(food_eaten: &FoodEaten) -> Item {
        let mut item = Item::new();
        item.insert(
            "id".to_string(),
            AttributeValue::S(food_eaten.id.to_string()),
        );
        item.insert(
            "user_id".to_string(),
            AttributeValue::S(food_eaten.user_id.to_string()),
        );
        item.insert(
            "food_id".to_string(),
            AttributeValue::S(food_eaten.food_id.to_string()),
        );
        item.insert("date".to_string(), date_value(food_eaten.date));
        item.insert(
            "serving_type".to_string(),
            AttributeValue::S(food_eaten.serving_type.to_string()),
        );
        item.insert(
            "serving_qty".to_string(),
            AttributeValue::N(food_eaten.serving_qty.to_string()),
        );
        item
    }

    pub fn item_to_food_eaten(item: &Item) -> RepositoryResult<FoodEaten> {
        Ok(FoodEaten {
            id: uuid_attr(item, "id")?,
            user_id: uuid_attr(item, "user_id")?,
            food_id: uuid_attr(item, "food_id")?,
            date: date_attr(item, "date")?,
            serving_type: parsed_attr(item, "serving_type")?,
            serving_qty: decimal_attr(item, "serving_qty")?,
        })
    }

    /// Run a paginated query against the user/date index
    async fn query_user_index(
        &self,
        key_condition: &str,
        values: Vec<(&str, AttributeValue)>,
    ) -> RepositoryResult<Vec<FoodEaten>> {
        let mut records = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let query_span = dynamodb_span("Query", &self.table_name, &self.region);

            let mut request = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(&self.user_date_index)
                .key_condition_expression(key_condition)
                .expression_attribute_names("#date", "date")
                .set_exclusive_start_key(start_key.take());
            for (placeholder, value) in &values {
                request = request.expression_attribute_values(*placeholder, value.clone());
            }

            let response = async {
                let started = Instant::now();
                let result = request.send().await;
                record_operation(&self.metrics, "Query", &self.table_name, started, result.is_ok());
                result.map_err(|e| map_dynamodb_error(&self.table_name, e.into()))
            }
            .instrument(query_span)
            .await?;

            for item in response.items.unwrap_or_default() {
                match Self::item_to_food_eaten(&item) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!("Failed to parse food eaten item: {}", e),
                }
            }

            match response.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl FoodEatenRepository for DynamoDbFoodEatenRepository {
    #[instrument(skip(self), fields(table = %self.table_name, id = %id))]
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<FoodEaten>> {
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

        response
            .item
            .map(|item| Self::item_to_food_eaten(&item))
            .transpose()
    }

    #[instrument(skip(self), fields(table = %self.table_name, user_id = %user_id, date = %date))]
    async fn find_by_user_and_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<FoodEaten>> {
        let records = self
            .query_user_index(
                "user_id = :user_id AND #date = :date",
                vec![
                    (":user_id", AttributeValue::S(user_id.to_string())),
                    (":date", date_value(date)),
                ],
            )
            .await?;

        info!("Found {} foods eaten", records.len());
        Ok(records)
    }

    #[instrument(skip(self), fields(table = %self.table_name, user_id = %user_id, from = %from, to = %to))]
    async fn find_by_user_within_range(
        &self,
        user_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<FoodEaten>> {
        let records = self
            .query_user_index(
                "user_id = :user_id AND #date BETWEEN :from AND :to",
                vec![
                    (":user_id", AttributeValue::S(user_id.to_string())),
                    (":from", date_value(from)),
                    (":to", date_value(to)),
                ],
            )
            .await?;

        info!("Found {} foods eaten in range", records.len());
        Ok(records)
    }

    #[instrument(skip(self, food_eaten), fields(table = %self.table_name, id = %food_eaten.id))]
    async fn save(&self, food_eaten: FoodEaten) -> RepositoryResult<FoodEaten> {
        let item = Self::food_eaten_to_item(&food_eaten);
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

        info!("Food eaten saved");
        Ok(food_eaten)
    }

    #[instrument(skip(self), fields(table = %self.table_name, id = %id))]
    async fn delete(&self, id: Uuid) -> RepositoryResult<()> {
        let delete_span = dynamodb_span("DeleteItem", &self.table_name, &self.region);

        async {
            let started = Instant::now();
            let result = self
                .client
                .delete_item()
                .table_name(&self.table_name)
                .key("id", AttributeValue::S(id.to_string()))
                .send()
                .await;
            record_operation(&self.metrics, "DeleteItem", &self.table_name, started, result.is_ok());
            result.map_err(|e| map_dynamodb_error(&self.table_name, e.into()))?;

            info!("Food eaten deleted");
            Ok(())
        }
        .instrument(delete_span)
        .await
    }
}
