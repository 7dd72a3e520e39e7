//! Error types for the storefront API.
//!
//! ```text
//! CoreError / DbError / DownloadError
//!          │
//!          ▼
//!    ServiceError    (what the engine decided)
//!          │
//!          ▼
//!      ApiError      (status + JSON body the client sees)
//! ```
//!
//! Response body:
//! ```json
//! { "error": { "code": "retryable", "message": "...", "retryable": true } }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use storefront_core::{CoreError, DownloadError, ValidationError};
use storefront_db::DbError;

/// Outcome classes of the engine services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed input, rejected before any storage access.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A business rule refused the mutation.
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    NotFound(String),

    /// Download refusal from the entitlement counter.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Lost a compare-and-swap while the operation could still succeed.
    #[error("{0}")]
    Retryable(String),

    /// Uniqueness conflict (duplicate code, already fulfilled order).
    #[error("{0}")]
    Conflict(String),

    /// Storage unreachable or misbehaving.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl ServiceError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Retryable(_) => true,
            ServiceError::Download(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        if err.is_unavailable() {
            error!(error = %err, "Storage failure");
            return ServiceError::Unavailable("storage error".to_string());
        }
        match err {
            DbError::NotFound { entity, .. } => ServiceError::NotFound(format!("{entity} not found")),
            DbError::UniqueViolation { field, .. } => {
                ServiceError::Conflict(format!("{field} already exists"))
            }
            DbError::ForeignKeyViolation { message } => ServiceError::Rejected(message),
            other => ServiceError::Unavailable(other.to_string()),
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidCode => ServiceError::NotFound(err.to_string()),
            CoreError::GiftCardExhausted | CoreError::GiftCardNotRedeemable { .. } => {
                ServiceError::Rejected(err.to_string())
            }
            CoreError::InvalidDenomination { .. } => ServiceError::Validation(
                ValidationError::InvalidFormat {
                    field: "amount_cents".to_string(),
                    reason: err.to_string(),
                },
            ),
            CoreError::Download(e) => ServiceError::Download(e),
            CoreError::Validation(e) => ServiceError::Validation(e),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// HTTP Error
// =============================================================================

/// Errors returned to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Missing or unknown `X-Store` header.
    #[error("Store not available")]
    StoreUnavailable,

    #[error("authentication required")]
    Unauthorized,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: String,
    retryable: bool,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Service(err) => match err {
                ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                ServiceError::Rejected(_) => (StatusCode::UNPROCESSABLE_ENTITY, "rejected"),
                ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                ServiceError::Download(DownloadError::NotFound) => {
                    (StatusCode::NOT_FOUND, "not_found")
                }
                ServiceError::Download(DownloadError::AssetUnavailable) => {
                    (StatusCode::NOT_FOUND, "asset_unavailable")
                }
                ServiceError::Download(DownloadError::LimitReached { .. }) => {
                    (StatusCode::FORBIDDEN, "limit_reached")
                }
                ServiceError::Download(DownloadError::Retryable) | ServiceError::Retryable(_) => {
                    (StatusCode::CONFLICT, "retryable")
                }
                ServiceError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
                ServiceError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            },
            ApiError::StoreUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, ApiError::Service(err) if err.is_retryable())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Service(err.into())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        ApiError::Service(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            // Infrastructure details stay in the logs
            ApiError::Service(ServiceError::Unavailable(_)) => "Service unavailable".to_string(),
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                retryable: self.retryable(),
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
