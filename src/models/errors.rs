use thiserror::Error;
use uuid::Uuid;

/// Service-level errors that can occur in business logic
///
/// Ownership and duplicate-name rejections are not errors; they are reported
/// through [`super::FoodUpdateOutcome`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Food not found: {id}")]
    FoodNotFound { id: Uuid },

    #[error("Food eaten entry not found: {id}")]
    FoodEatenNotFound { id: Uuid },

    #[error("User not found: {id}")]
    UserNotFound { id: Uuid },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Repository error: {source}")]
    Repository {
        #[from]
        source: RepositoryError,
    },
}

/// Repository-level errors for data access operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database connection failed")]
    ConnectionFailed,

    #[error("Constraint violation: {message}")]
    ConstraintViolation { message: String },

    #[error("AWS SDK error: {message}")]
    AwsSdk { message: String },

    #[error("DynamoDB table not found: {table_name}. Ensure the table exists and IAM permissions are correct.")]
    TableNotFound { table_name: String },

    #[error("Invalid item: {message}")]
    InvalidItem { message: String },

    #[error("Timeout occurred during operation")]
    Timeout,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

/// Validation errors for input data
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredField { field: String },

    #[error("Invalid field value: {field}={value}, reason={reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Field too long: {field}, max_length={max_length}, actual_length={actual_length}")]
    TooLong {
        field: String,
        max_length: usize,
        actual_length: usize,
    },

    #[error("Value out of range: {field}, min={min}, max={max}, value={value}")]
    OutOfRange {
        field: String,
        min: String,
        max: String,
        value: String,
    },
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::ValidationError {
            message: err.to_string(),
        }
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Result type alias for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let id = Uuid::nil();
        let error = ServiceError::FoodEatenNotFound { id };
        assert_eq!(
            error.to_string(),
            "Food eaten entry not found: 00000000-0000-0000-0000-000000000000"
        );

        let validation_error = ValidationError::RequiredField {
            field: "name".to_string(),
        };
        assert_eq!(validation_error.to_string(), "Required field missing: name");
    }

    #[test]
    fn test_error_conversion() {
        let validation_error = ValidationError::OutOfRange {
            field: "serving_qty".to_string(),
            min: "0".to_string(),
            max: "10000".to_string(),
            value: "-1".to_string(),
        };

        let service_error: ServiceError = validation_error.into();
        match service_error {
            ServiceError::ValidationError { message } => {
                assert!(message.contains("Value out of range"));
            }
            _ => panic!("Expected ValidationError conversion"),
        }
    }

    #[test]
    fn test_repository_error_into_service_error() {
        let service_error: ServiceError = RepositoryError::Timeout.into();
        match service_error {
            ServiceError::Repository {
                source: RepositoryError::Timeout,
            } => {}
            _ => panic!("Expected Repository error"),
        }
    }
}
