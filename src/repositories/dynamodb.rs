use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Error as DynamoDbError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::error;
use uuid::Uuid;

use crate::models::{RepositoryError, RepositoryResult};
use crate::observability::Metrics;

pub(crate) type Item = HashMap<String, AttributeValue>;

/// Create a DynamoDB client span carrying X-Ray and OpenTelemetry attributes
pub(crate) fn dynamodb_span(operation: &str, table_name: &str, region: &str) -> tracing::Span {
    tracing::info_span!(
        "DynamoDB",
        "aws.service" = "DynamoDB",
        "aws.operation" = operation,
        "aws.region" = %region,
        "aws.dynamodb.table_name" = %table_name,
        "aws.request_id" = tracing::field::Empty,
        "aws.remote.service" = "AWS::DynamoDB",
        "aws.remote.operation" = operation,
        "aws.remote.resource.type" = "AWS::DynamoDB::Table",
        "aws.remote.resource.identifier" = %table_name,
        "otel.kind" = "client",
        "otel.name" = format!("DynamoDB.{}", operation),
        "rpc.system" = "aws-api",
        "rpc.service" = "AmazonDynamoDBv2",
        "rpc.method" = operation,
        "db.system" = "dynamodb",
        "db.name" = %table_name,
        "db.operation" = operation,
        "http.status_code" = tracing::field::Empty,
        "component" = "aws-sdk-dynamodb",
    )
}

/// Record a finished DynamoDB call when metrics are attached
pub(crate) fn record_operation(
    metrics: &Option<Arc<Metrics>>,
    operation: &str,
    table_name: &str,
    started: Instant,
    success: bool,
) {
    if let Some(metrics) = metrics {
        metrics.record_database_operation(
            operation,
            table_name,
            success,
            started.elapsed().as_secs_f64(),
        );
    }
}

/// Convert a DynamoDB error to RepositoryError
pub(crate) fn map_dynamodb_error(table_name: &str, error: DynamoDbError) -> RepositoryError {
    error!(table = %table_name, "DynamoDB error: {:?}", error);

    match error {
        DynamoDbError::ResourceNotFoundException(_) => RepositoryError::TableNotFound {
            table_name: table_name.to_string(),
        },
        DynamoDbError::ConditionalCheckFailedException(e) => {
            RepositoryError::ConstraintViolation {
                message: e.to_string(),
            }
        }
        DynamoDbError::ProvisionedThroughputExceededException(_)
        | DynamoDbError::RequestLimitExceeded(_) => RepositoryError::RateLimitExceeded,
        other => RepositoryError::AwsSdk {
            message: other.to_string(),
        },
    }
}

pub(crate) fn string_attr(item: &Item, key: &str) -> RepositoryResult<String> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| RepositoryError::InvalidItem {
            message: format!("Missing {}", key),
        })
}

pub(crate) fn parsed_attr<T: FromStr>(item: &Item, key: &str) -> RepositoryResult<T> {
    item.get(key)
        .and_then(|v| v.as_s().ok().or_else(|| v.as_n().ok()))
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| RepositoryError::InvalidItem {
            message: format!("Invalid {}", key),
        })
}

pub(crate) fn uuid_attr(item: &Item, key: &str) -> RepositoryResult<Uuid> {
    parsed_attr(item, key)
}

pub(crate) fn optional_uuid_attr(item: &Item, key: &str) -> RepositoryResult<Option<Uuid>> {
    match item.get(key) {
        None | Some(AttributeValue::Null(_)) => Ok(None),
        Some(_) => uuid_attr(item, key).map(Some),
    }
}

pub(crate) fn decimal_attr(item: &Item, key: &str) -> RepositoryResult<Decimal> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|s| Decimal::from_str(s).ok())
        .ok_or_else(|| RepositoryError::InvalidItem {
            message: format!("Invalid {}", key),
        })
}

pub(crate) fn date_attr(item: &Item, key: &str) -> RepositoryResult<NaiveDate> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
        .ok_or_else(|| RepositoryError::InvalidItem {
            message: format!("Invalid {}", key),
        })
}

pub(crate) fn timestamp_attr(item: &Item, key: &str) -> Option<DateTime<Utc>> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Dates are stored as ISO strings so they sort lexicographically in range keys
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn date_value(date: NaiveDate) -> AttributeValue {
    AttributeValue::S(date.format(DATE_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_value_is_sortable() {
        let early = date_value(NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
        let late = date_value(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());

        assert!(early.as_s().unwrap() < late.as_s().unwrap());
        assert_eq!(early.as_s().unwrap(), "2024-01-09");
    }

    #[test]
    fn test_attribute_helpers() {
        let id = Uuid::new_v4();
        let mut item = Item::new();
        item.insert("id".to_string(), AttributeValue::S(id.to_string()));
        item.insert("qty".to_string(), AttributeValue::N("1.5".to_string()));
        item.insert("date".to_string(), AttributeValue::S("2024-02-29".to_string()));

        assert_eq!(uuid_attr(&item, "id").unwrap(), id);
        assert_eq!(decimal_attr(&item, "qty").unwrap(), Decimal::new(15, 1));
        assert_eq!(
            date_attr(&item, "date").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(optional_uuid_attr(&item, "owner_id").unwrap(), None);
        assert!(matches!(
            string_attr(&item, "missing"),
            Err(RepositoryError::InvalidItem { .. })
        ));
    }
}
