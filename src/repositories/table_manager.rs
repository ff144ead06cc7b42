use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, KeyType, Projection,
    ProjectionType, ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use super::dynamodb::map_dynamodb_error;
use crate::models::{RepositoryError, RepositoryResult};

/// Manages DynamoDB table creation for users, foods and foods eaten
pub struct TableManager {
    client: Arc<DynamoDbClient>,
    wait_interval: Duration,
    max_wait_attempts: u32,
}

fn attribute(name: &str) -> RepositoryResult<AttributeDefinition> {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(ScalarAttributeType::S)
        .build()
        .map_err(|e| RepositoryError::AwsSdk {
            message: format!("Failed to build attribute definition: {}", e),
        })
}

fn key(name: &str, key_type: KeyType) -> RepositoryResult<KeySchemaElement> {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .map_err(|e| RepositoryError::AwsSdk {
            message: format!("Failed to build key schema: {}", e),
        })
}

fn index(name: &str, hash_key: &str, range_key: &str) -> RepositoryResult<GlobalSecondaryIndex> {
    GlobalSecondaryIndex::builder()
        .index_name(name)
        .key_schema(key(hash_key, KeyType::Hash)?)
        .key_schema(key(range_key, KeyType::Range)?)
        .projection(
            Projection::builder()
                .projection_type(ProjectionType::All)
                .build(),
        )
        .build()
        .map_err(|e| RepositoryError::AwsSdk {
            message: format!("Failed to build GSI: {}", e),
        })
}

impl TableManager {
    pub fn new(client: Arc<DynamoDbClient>) -> Self {
        Self {
            client,
            wait_interval: Duration::from_secs(10),
            max_wait_attempts: 30,
        }
    }

    /// Create the users table, keyed by `id`
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn create_users_table(&self, table_name: &str) -> RepositoryResult<()> {
        self.create_table(table_name, vec![attribute("id")?], Vec::new())
            .await
    }

    /// Create the foods table with the sparse `OwnerNameIndex`
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn create_foods_table(&self, table_name: &str) -> RepositoryResult<()> {
        self.create_table(
            table_name,
            vec![attribute("id")?, attribute("owner_id")?, attribute("name")?],
            vec![index("OwnerNameIndex", "owner_id", "name")?],
        )
        .await
    }

    /// Create the foods eaten table with the `UserDateIndex`
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn create_foods_eaten_table(&self, table_name: &str) -> RepositoryResult<()> {
        self.create_table(
            table_name,
            vec![attribute("id")?, attribute("user_id")?, attribute("date")?],
            vec![index("UserDateIndex", "user_id", "date")?],
        )
        .await
    }

    async fn create_table(
        &self,
        table_name: &str,
        attribute_definitions: Vec<AttributeDefinition>,
        indexes: Vec<GlobalSecondaryIndex>,
    ) -> RepositoryResult<()> {
        if self.table_exists(table_name).await? {
            info!("Table {} already exists", table_name);
            return Ok(());
        }

        let indexes = if indexes.is_empty() {
            None
        } else {
            Some(indexes)
        };

        self.client
            .create_table()
            .table_name(table_name)
            .set_attribute_definitions(Some(attribute_definitions))
            .key_schema(key("id", KeyType::Hash)?)
            .set_global_secondary_indexes(indexes)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| map_dynamodb_error(table_name, e.into()))?;

        info!("Table creation initiated, waiting for table to become active");
        self.wait_for_table_active(table_name).await?;
        info!("Table {} created successfully", table_name);

        Ok(())
    }

    /// Check if a table exists
    #[instrument(skip(self), fields(table_name = %table_name))]
    pub async fn table_exists(&self, table_name: &str) -> RepositoryResult<bool> {
        match self.client.describe_table().table_name(table_name).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let not_found = e
                    .as_service_error()
                    .map(|se| se.is_resource_not_found_exception())
                    .unwrap_or(false);
                if not_found {
                    info!("Table {} does not exist", table_name);
                    Ok(false)
                } else {
                    error!("Error checking table existence: {}", e);
                    Err(RepositoryError::ConnectionFailed)
                }
            }
        }
    }

    #[instrument(skip(self), fields(table_name = %table_name))]
    async fn wait_for_table_active(&self, table_name: &str) -> RepositoryResult<()> {
        let mut attempts = 0;

        loop {
            let response = self
                .client
                .describe_table()
                .table_name(table_name)
                .send()
                .await
                .map_err(|e| map_dynamodb_error(table_name, e.into()))?;

            match response.table.and_then(|table| table.table_status) {
                Some(TableStatus::Active) => {
                    info!("Table {} is now active", table_name);
                    return Ok(());
                }
                Some(status) => info!("Table {} status: {:?}, waiting...", table_name, status),
                None => warn!("Table {} status unknown, waiting...", table_name),
            }

            attempts += 1;
            if attempts >= self.max_wait_attempts {
                error!("Timeout waiting for table {} to become active", table_name);
                return Err(RepositoryError::Timeout);
            }

            tokio::time::sleep(self.wait_interval).await;
        }
    }

    /// Create all three tables concurrently
    #[instrument(skip(self))]
    pub async fn create_all_tables(
        &self,
        users_table: &str,
        foods_table: &str,
        foods_eaten_table: &str,
    ) -> RepositoryResult<()> {
        let (users, foods, foods_eaten) = tokio::join!(
            self.create_users_table(users_table),
            self.create_foods_table(foods_table),
            self.create_foods_eaten_table(foods_eaten_table),
        );

        users?;
        foods?;
        foods_eaten?;

        info!("All tables created successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_definitions() {
        let owner_name = index("OwnerNameIndex", "owner_id", "name").unwrap();
        assert_eq!(owner_name.index_name(), "OwnerNameIndex");
        let keys = owner_name.key_schema();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].attribute_name(), "owner_id");
        assert_eq!(keys[0].key_type(), &KeyType::Hash);
        assert_eq!(keys[1].attribute_name(), "name");
        assert_eq!(keys[1].key_type(), &KeyType::Range);
    }

    #[test]
    fn test_table_manager_creation() {
        let config = aws_sdk_dynamodb::Config::builder()
            .region(aws_sdk_dynamodb::config::Region::new("us-east-1"))
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .build();
        let client = Arc::new(aws_sdk_dynamodb::Client::from_conf(config));
        let manager = TableManager::new(client);

        assert_eq!(manager.max_wait_attempts, 30);
        assert_eq!(manager.wait_interval, Duration::from_secs(10));
    }
}
