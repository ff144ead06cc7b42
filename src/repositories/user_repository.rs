use async_trait::async_trait;
use aws_sdk_dynamodb::operation::RequestId;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, Instrument};
use uuid::Uuid;

use super::dynamodb::{
    dynamodb_span, map_dynamodb_error, record_operation, string_attr, timestamp_attr, uuid_attr, Item,
};
use crate::models::{RepositoryError, RepositoryResult, User};
use crate::observability::Metrics;

/// Store port for user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by id
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>>;

    /// Insert or replace a user
    async fn save(&self, user: User) -> RepositoryResult<User>;
}

/// DynamoDB implementation of the UserRepository trait
pub struct DynamoDbUserRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
    metrics: Option<Arc<Metrics>>,
}

impl DynamoDbUserRepository {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            table_name,
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

    pub fn user_to_item(user: &User) -> Item {
        let mut item = Item::new();
        item.insert("id".to_string(), AttributeValue::S(user.id.to_string()));
        item.insert("email".to_string(), AttributeValue::S(user.email.clone()));
        item.insert(
            "created_at".to_string(),
            AttributeValue::S(user.created_at.to_rfc3339()),
        );
        item
    }

    pub fn item_to_user(item: &Item) -> RepositoryResult<User> {
        Ok(User {
            id: uuid_attr(item, "id")?,
            email: string_attr(item, "email")?,
            created_at: timestamp_attr(item, "created_at").ok_or_else(|| {
                RepositoryError::InvalidItem {
                    message: "Invalid created_at".to_string(),
                }
            })?,
        })
    }
}

#[async_trait]
impl UserRepository for DynamoDbUserRepository {
    #[instrument(skip(self), fields(table = %self.table_name, id = %id))]
    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<User>> {
        let span = dynamodb_span("GetItem", &self.table_name, &self.region);

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
        .instrument(span)
        .await?;

        match response.item {
            Some(item) => Ok(Some(Self::item_to_user(&item)?)),
            None => {
                info!("User not found");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, user), fields(table = %self.table_name, id = %user.id))]
    async fn save(&self, user: User) -> RepositoryResult<User> {
        let span = dynamodb_span("PutItem", &self.table_name, &self.region);

        async {
            let started = Instant::now();
            let result = self
                .client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(Self::user_to_item(&user)))
                .send()
                .await;
            record_operation(&self.metrics, "PutItem", &self.table_name, started, result.is_ok());
            result.map_err(|e| map_dynamodb_error(&self.table_name, e.into()))
        }
        .instrument(span)
        .await?;

        info!("User saved");
        Ok(user)
    }
}
