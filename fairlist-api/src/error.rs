//! Error Types for the Fairlist API
//!
//! This module defines error handling for the API layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! All errors are serialized as JSON with `success: false` and an
//! appropriate HTTP status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fairlist_core::{IngestError, StorageError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Authentication Errors (401, 403)
    // ========================================================================
    /// Request lacks valid authentication credentials
    Unauthorized,

    /// Request is authenticated but lacks permission for the resource
    Forbidden,

    /// Authentication token is invalid or malformed
    InvalidToken,

    /// Authentication token has expired
    TokenExpired,

    // ========================================================================
    // Request Errors (400, 413)
    // ========================================================================
    /// Request validation failed (including a blank required cell)
    ValidationFailed,

    /// Request contains invalid input data
    InvalidInput,

    /// Required field is missing from request
    MissingField,

    /// Field format is incorrect
    InvalidFormat,

    /// Uploaded file extension is not accepted
    UnsupportedFormat,

    /// Uploaded file could not be parsed
    ParseFailed,

    /// Uploaded file produced no records
    EmptyFile,

    /// Pool has no active recipient to distribute to
    NoActiveRecipients,

    /// Uploaded file exceeds the size ceiling
    PayloadTooLarge,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// Requested entity does not exist
    EntityNotFound,

    /// Requested agent does not exist
    AgentNotFound,

    /// Requested sub-agent does not exist
    SubAgentNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    /// Entity with the same identifier already exists
    EntityAlreadyExists,

    /// Every record in the upload already exists
    AllDuplicates,

    // ========================================================================
    // Server Errors (500, 503, 504)
    // ========================================================================
    /// Internal server error
    InternalError,

    /// Database operation failed
    DatabaseError,

    /// Service is temporarily unavailable
    ServiceUnavailable,

    /// Database connection pool exhausted
    ConnectionPoolExhausted,

    /// Operation timed out
    Timeout,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Authentication errors
            ErrorCode::Unauthorized | ErrorCode::InvalidToken | ErrorCode::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }

            ErrorCode::Forbidden => StatusCode::FORBIDDEN,

            // Request errors
            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingField
            | ErrorCode::InvalidFormat
            | ErrorCode::UnsupportedFormat
            | ErrorCode::ParseFailed
            | ErrorCode::EmptyFile
            | ErrorCode::NoActiveRecipients => StatusCode::BAD_REQUEST,

            ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,

            // Not found errors
            ErrorCode::EntityNotFound | ErrorCode::AgentNotFound | ErrorCode::SubAgentNotFound => {
                StatusCode::NOT_FOUND
            }

            // Conflict errors
            ErrorCode::EntityAlreadyExists | ErrorCode::AllDuplicates => StatusCode::CONFLICT,

            // Server errors
            ErrorCode::ServiceUnavailable | ErrorCode::ConnectionPoolExhausted => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,

            ErrorCode::InternalError | ErrorCode::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Not authorized, no token",
            ErrorCode::Forbidden => "Access forbidden",
            ErrorCode::InvalidToken => "Not authorized, token failed",
            ErrorCode::TokenExpired => "Authentication token has expired",

            ErrorCode::ValidationFailed => "Request validation failed",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::MissingField => "Please provide all required fields",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::UnsupportedFormat => "Only CSV, XLSX, and XLS files are allowed",
            ErrorCode::ParseFailed => "Could not parse file",
            ErrorCode::EmptyFile => "File is empty or contains no valid records",
            ErrorCode::NoActiveRecipients => "No active recipients found",
            ErrorCode::PayloadTooLarge => "File is too large",

            ErrorCode::EntityNotFound => "Entity not found",
            ErrorCode::AgentNotFound => "Agent not found",
            ErrorCode::SubAgentNotFound => "Sub-agent not found",

            ErrorCode::EntityAlreadyExists => "Entity already exists",
            ErrorCode::AllDuplicates => {
                "All records in the file already exist. No new records to add."
            }

            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database operation failed",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
            ErrorCode::ConnectionPoolExhausted => "Connection pool exhausted",
            ErrorCode::Timeout => "Operation timed out",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (offending row, field, counts)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

/// Wire shape of an error: the error plus `success: false`.
#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    #[serde(flatten)]
    error: &'a ApiError,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
            details: None,
        }
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    /// Create an Unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Create a Forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Create an InvalidToken error.
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    /// Create a TokenExpired error.
    pub fn token_expired() -> Self {
        Self::from_code(ErrorCode::TokenExpired)
    }

    /// Create a ValidationFailed error.
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    /// Create an InvalidInput error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Create a MissingField error.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
        )
    }

    /// Create an InvalidFormat error.
    pub fn invalid_format(field: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFormat,
            format!("Field '{}' has invalid format, expected {}", field, expected),
        )
    }

    /// Create an EntityNotFound error.
    pub fn entity_not_found(entity_type: &str, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::EntityNotFound,
            format!("{} with id {} not found", entity_type, id),
        )
    }

    /// Create an AgentNotFound error.
    pub fn agent_not_found() -> Self {
        Self::from_code(ErrorCode::AgentNotFound)
    }

    /// Create a SubAgentNotFound error.
    pub fn sub_agent_not_found() -> Self {
        Self::from_code(ErrorCode::SubAgentNotFound)
    }

    /// Create an EntityAlreadyExists error.
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::EntityAlreadyExists, message)
    }

    /// Create an InternalError.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Create a DatabaseError.
    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Create a ServiceUnavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Create a ConnectionPoolExhausted error.
    pub fn connection_pool_exhausted() -> Self {
        Self::from_code(ErrorCode::ConnectionPoolExhausted)
    }

    /// Create a Timeout error.
    pub fn timeout(operation: &str) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("Operation '{}' timed out", operation),
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorBody {
            success: false,
            error: &self,
        });
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        let message = err.to_string();
        match err {
            IngestError::UnsupportedFormat { extension } => {
                ApiError::new(ErrorCode::UnsupportedFormat, message)
                    .with_details(serde_json::json!({ "extension": extension }))
            }
            IngestError::InputTooLarge { size, limit } => {
                ApiError::new(ErrorCode::PayloadTooLarge, message)
                    .with_details(serde_json::json!({ "size": size, "limit": limit }))
            }
            IngestError::Parse { .. } => ApiError::new(ErrorCode::ParseFailed, message),
            IngestError::EmptyInput => ApiError::new(ErrorCode::EmptyFile, message),
            IngestError::Validation { row_index, field } => {
                ApiError::new(ErrorCode::ValidationFailed, message).with_details(
                    serde_json::json!({ "row": row_index, "field": field.as_str() }),
                )
            }
            IngestError::NoActiveRecipients { .. } => {
                ApiError::new(ErrorCode::NoActiveRecipients, message)
            }
            IngestError::AllDuplicates { duplicates_removed } => {
                ApiError::new(ErrorCode::AllDuplicates, message).with_details(
                    serde_json::json!({ "duplicatesRemoved": duplicates_removed }),
                )
            }
            IngestError::Storage(storage) => ApiError::from(storage),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        tracing::error!("Storage error: {:?}", err);

        match err {
            StorageError::NotFound { entity, id } => ApiError::entity_not_found(entity, id),
            StorageError::AlreadyExists { reason, .. } => ApiError::already_exists(reason),
            StorageError::Timeout { operation } => ApiError::timeout(operation),
            StorageError::Unavailable { .. } => {
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            StorageError::QueryFailed { .. } | StorageError::LockPoisoned => {
                ApiError::database_error("Database operation failed")
            }
        }
    }
}

// ============================================================================
// CONVERSIONS FROM STANDARD ERRORS
// ============================================================================

/// Convert from tokio_postgres::Error to ApiError.
impl From<tokio_postgres::Error> for ApiError {
    fn from(err: tokio_postgres::Error) -> Self {
        // Log the full error for debugging
        tracing::error!("Database error: {:?}", err);

        // Return a generic database error to avoid leaking internal details
        ApiError::database_error("Database operation failed")
    }
}

/// Convert from deadpool_postgres::PoolError to ApiError.
impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        tracing::error!("Connection pool error: {:?}", err);

        match err {
            deadpool_postgres::PoolError::Timeout(_) => ApiError::connection_pool_exhausted(),
            deadpool_postgres::PoolError::Closed => {
                ApiError::service_unavailable("Database connection pool is closed")
            }
            _ => ApiError::database_error("Failed to acquire database connection"),
        }
    }
}

/// Convert from serde_json::Error to ApiError.
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON serialization error: {:?}", err);
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

/// Convert from uuid::Error to ApiError.
impl From<uuid::Error> for ApiError {
    fn from(err: uuid::Error) -> Self {
        ApiError::invalid_format("id", &format!("valid UUID: {}", err))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use fairlist_core::{RecipientPool, RequiredField};

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::ValidationFailed.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::PayloadTooLarge.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ErrorCode::AgentNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::AllDuplicates.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::InternalError.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::ServiceUnavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(ErrorCode::Timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_ingest_error_mapping() {
        let cases = [
            (
                IngestError::UnsupportedFormat { extension: "pdf".into() },
                ErrorCode::UnsupportedFormat,
            ),
            (IngestError::InputTooLarge { size: 11, limit: 10 }, ErrorCode::PayloadTooLarge),
            (IngestError::Parse { reason: "bad".into() }, ErrorCode::ParseFailed),
            (IngestError::EmptyInput, ErrorCode::EmptyFile),
            (
                IngestError::NoActiveRecipients { pool: RecipientPool::Agents },
                ErrorCode::NoActiveRecipients,
            ),
            (IngestError::AllDuplicates { duplicates_removed: 2 }, ErrorCode::AllDuplicates),
            (
                IngestError::Storage(StorageError::Timeout { operation: "insert" }),
                ErrorCode::Timeout,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(ApiError::from(err).code, code);
        }
    }

    #[test]
    fn test_validation_details_carry_row_and_field() {
        let err = ApiError::from(IngestError::Validation {
            row_index: 4,
            field: RequiredField::Name,
        });
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.message, "Row 4: FirstName is required");
        assert_eq!(err.details, Some(serde_json::json!({ "row": 4, "field": "name" })));
    }

    #[test]
    fn test_error_serialization() -> Result<(), serde_json::Error> {
        let err = ApiError::from_code(ErrorCode::AllDuplicates);
        let json = serde_json::to_string(&err)?;
        assert!(json.contains("ALL_DUPLICATES"));

        let deserialized: ApiError = serde_json::from_str(&json)?;
        assert_eq!(deserialized, err);
        Ok(())
    }

    #[test]
    fn test_error_body_has_success_false() -> Result<(), serde_json::Error> {
        let err = ApiError::forbidden("Access denied. Admin only.");
        let body = serde_json::to_value(ErrorBody {
            success: false,
            error: &err,
        })?;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "FORBIDDEN");
        assert_eq!(body["message"], "Access denied. Admin only.");
        Ok(())
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::database_error("Connection failed");
        let display = format!("{}", err);
        assert!(display.contains("DatabaseError"));
        assert!(display.contains("Connection failed"));
    }
}
