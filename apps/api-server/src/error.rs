//! Error types for the Shopkeep API.
//!
//! Every failure leaves the server as the same JSON shape:
//!
//! ```text
//! { "success": false, "message": "Not enough stock for Mì: available 3, requested 5",
//!   "error": "INSUFFICIENT_STOCK" }
//! ```
//!
//! Database and internal failures are logged in full and reach the client
//! only as a generic message.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use shopkeep_core::{CoreError, ValidationError};
use shopkeep_db::DbError;

/// Machine-readable error code sent as the `error` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationFailed,
    EmptyCart,
    InsufficientStock,
    InvalidStatusTransition,
    PaymentExceedsBalance,
    BatchMismatch,
    AlreadyExists,
    Conflict,
    NotFound,
    NotAuthenticated,
    TokenInvalid,
    TokenExpired,
    AdminRequired,
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::NotAuthenticated | Self::TokenInvalid | Self::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            Self::AdminRequired => StatusCode::FORBIDDEN,
            Self::DatabaseError | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::EmptyCart => "EMPTY_CART",
            Self::InsufficientStock => "INSUFFICIENT_STOCK",
            Self::InvalidStatusTransition => "INVALID_STATUS_TRANSITION",
            Self::PaymentExceedsBalance => "PAYMENT_EXCEEDS_BALANCE",
            Self::BatchMismatch => "BATCH_MISMATCH",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::Conflict => "CONFLICT",
            Self::NotFound => "NOT_FOUND",
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
            Self::TokenInvalid => "TOKEN_INVALID",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::AdminRequired => "ADMIN_REQUIRED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// API error returned from handlers.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

/// Convenience alias for handler results.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotAuthenticated, message)
    }

    pub fn forbidden() -> Self {
        Self::new(ErrorCode::AdminRequired, "Admin access required")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(code = self.code.as_str(), error = %self.message, "Request failed");
            "Internal server error".to_string()
        } else {
            self.message
        };

        let body = json!({
            "success": false,
            "message": message,
            "error": self.code.as_str(),
        });
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::ProductNotFound(_) => ErrorCode::NotFound,
            CoreError::EmptyCart => ErrorCode::EmptyCart,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::InvalidStatusTransition { .. } => ErrorCode::InvalidStatusTransition,
            CoreError::PaymentExceedsBalance { .. } => ErrorCode::PaymentExceedsBalance,
            CoreError::BatchMismatch { .. } => ErrorCode::BatchMismatch,
            CoreError::CartTooLarge { .. } | CoreError::Validation(_) => {
                ErrorCode::ValidationFailed
            }
        };
        ApiError::new(code, err.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Rule(core) => core.into(),
            DbError::NotFound { .. } => ApiError::not_found(err.to_string()),
            DbError::UniqueViolation { .. } => ApiError::new(ErrorCode::AlreadyExists, err.to_string()),
            DbError::Conflict { .. } => ApiError::new(ErrorCode::Conflict, err.to_string()),
            DbError::ForeignKeyViolation { .. } => ApiError::validation(err.to_string()),
            other => ApiError::new(ErrorCode::DatabaseError, other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::InsufficientStock.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::AlreadyExists.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::TokenExpired.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::AdminRequired.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_db_errors_map_through_rules() {
        let err: ApiError = DbError::Rule(CoreError::InsufficientStock {
            product: "Mì".to_string(),
            available: 3,
            requested: 5,
        })
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("available 3"));

        let err: ApiError = DbError::Rule(CoreError::ProductNotFound("p-9".to_string())).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(err.message.contains("p-9"));

        let err: ApiError = DbError::duplicate("barcode", "123").into();
        assert_eq!(err.code, ErrorCode::AlreadyExists);
    }

    #[tokio::test]
    async fn test_concurrent_change_is_a_conflict() {
        let response = ApiError::from(DbError::conflict("Debt", "d-1")).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["error"], "CONFLICT");
        assert_eq!(body["message"], "Debt d-1 was changed by another request, please retry");
    }

    #[tokio::test]
    async fn test_response_body_shape() {
        let response = ApiError::validation("quantity must be greater than 0").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "VALIDATION_FAILED");
        assert_eq!(body["message"], "quantity must be greater than 0");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let response = ApiError::from(DbError::QueryFailed("disk I/O error".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["error"], "DATABASE_ERROR");
    }
}
