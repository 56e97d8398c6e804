//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Each variant maps to one HTTP
//! status and a user-facing message from [`messages`]; server errors are
//! captured to Sentry and never leak details to the client.

use axum::{
    Json,
    extract::rejection::{PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::orders::OrderError;
use crate::services::uploads::UploadError;
use crate::validation::ValidationErrors;

/// User-facing message constants.
pub mod messages {
    pub const INVALID_BODY: &str = "Request body is invalid";
    pub const INVALID_PATH: &str = "URL parameter is invalid";
    pub const INVALID_QUERY: &str = "Query string is invalid";
    pub const VALIDATION_FAILED: &str = "Validation failed";
    pub const NOT_FOUND: &str = "Record not found";
    pub const EXISTED_CODE: &str = "Code already exists";
    pub const EXISTED_EMAIL: &str = "Email already exists";
    pub const EXISTED_SKU: &str = "SKU already exists";
    pub const UNAUTHORIZED: &str = "Authentication required";
    pub const INVALID_TOKEN: &str = "Token is invalid or expired";
    pub const INVALID_CREDENTIALS: &str = "Email or password is incorrect";
    pub const INACTIVE_ACCOUNT: &str = "Account is disabled";
    pub const FORBIDDEN: &str = "You do not have access to this resource";
    pub const INTERNAL: &str = "Internal server error";
    pub const INSUFFICIENT_STOCK: &str = "Not enough stock for one or more items";
    pub const ITEM_UNAVAILABLE: &str = "One or more items are unavailable";
    pub const INVALID_DISCOUNT: &str = "Discount code is not valid for this order";
    pub const INVALID_STATUS_CHANGE: &str = "Order status cannot change that way";
    pub const ORDER_NOT_CANCELLABLE: &str = "Order can no longer be cancelled";
    pub const INVALID_REORDER: &str = "Reorder must list every picture exactly once";
    pub const UNSUPPORTED_FILE: &str = "Only JPEG, PNG, WebP and GIF images are accepted";
    pub const FILE_TOO_LARGE: &str = "File is too large";
    pub const MISSING_FILE: &str = "Multipart field 'file' is required";
    pub const WRONG_PASSWORD: &str = "Current password is incorrect";
    pub const IN_USE: &str = "Record is still referenced and cannot be deleted";
}

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or semantically impossible request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// One or more fields failed validation.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Missing or invalid credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// File upload failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Checkout or order status change rejected.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,
}

impl AppError {
    /// A 404 with the generic not-found message.
    #[must_use]
    pub fn not_found() -> Self {
        Self::NotFound(messages::NOT_FOUND.to_string())
    }

    /// A 422 for a single field.
    #[must_use]
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(ValidationErrors::single(field, message))
    }

    /// HTTP status and client-safe message for this error.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Validation(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                messages::VALIDATION_FAILED.to_string(),
            ),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Database(err)
            | Self::Order(OrderError::Repository(err))
            | Self::Upload(UploadError::Repository(err))
            | Self::Auth(AuthError::Repository(err)) => repository_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    messages::INVALID_CREDENTIALS.to_string(),
                ),
                AuthError::InvalidToken(_) => (
                    StatusCode::UNAUTHORIZED,
                    messages::INVALID_TOKEN.to_string(),
                ),
                AuthError::Inactive => (
                    StatusCode::FORBIDDEN,
                    messages::INACTIVE_ACCOUNT.to_string(),
                ),
                AuthError::UserAlreadyExists => (
                    StatusCode::BAD_REQUEST,
                    messages::EXISTED_EMAIL.to_string(),
                ),
                AuthError::WrongPassword => (
                    StatusCode::BAD_REQUEST,
                    messages::WRONG_PASSWORD.to_string(),
                ),
                AuthError::InvalidEmail(_) | AuthError::WeakPassword(_) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    messages::VALIDATION_FAILED.to_string(),
                ),
                AuthError::Repository(_) | AuthError::PasswordHash | AuthError::TokenEncoding(_) => {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        messages::INTERNAL.to_string(),
                    )
                }
            },
            Self::Upload(err) => match err {
                UploadError::UnsupportedType(_) => (
                    StatusCode::BAD_REQUEST,
                    messages::UNSUPPORTED_FILE.to_string(),
                ),
                UploadError::TooLarge { .. } => (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    messages::FILE_TOO_LARGE.to_string(),
                ),
                UploadError::MissingFile | UploadError::Multipart(_) => {
                    (StatusCode::BAD_REQUEST, messages::MISSING_FILE.to_string())
                }
                UploadError::Io(_) | UploadError::Repository(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    messages::INTERNAL.to_string(),
                ),
            },
            Self::Order(err) => match err {
                OrderError::Unavailable(_) => (
                    StatusCode::BAD_REQUEST,
                    messages::ITEM_UNAVAILABLE.to_string(),
                ),
                OrderError::InsufficientStock { .. } => (
                    StatusCode::BAD_REQUEST,
                    messages::INSUFFICIENT_STOCK.to_string(),
                ),
                OrderError::InvalidDiscount => (
                    StatusCode::BAD_REQUEST,
                    messages::INVALID_DISCOUNT.to_string(),
                ),
                OrderError::UnknownAddress(_) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    messages::VALIDATION_FAILED.to_string(),
                ),
                OrderError::InvalidTransition { .. } => (
                    StatusCode::BAD_REQUEST,
                    messages::INVALID_STATUS_CHANGE.to_string(),
                ),
                OrderError::NotCancellable => (
                    StatusCode::BAD_REQUEST,
                    messages::ORDER_NOT_CANCELLABLE.to_string(),
                ),
                OrderError::Repository(err) => repository_status(err),
            },
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                messages::INTERNAL.to_string(),
            ),
        }
    }

    /// Field errors to attach to the body, if any.
    fn field_errors(self) -> Option<ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            Self::Auth(AuthError::InvalidEmail(e)) => {
                Some(ValidationErrors::single("email", e.to_string()))
            }
            Self::Auth(AuthError::WeakPassword(msg)) => {
                Some(ValidationErrors::single("password", msg))
            }
            Self::Order(OrderError::UnknownAddress(_)) => Some(ValidationErrors::single(
                "address_id",
                "must be one of your addresses",
            )),
            _ => None,
        }
    }
}

fn repository_status(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, messages::NOT_FOUND.to_string()),
        RepositoryError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            messages::INTERNAL.to_string(),
        ),
        RepositoryError::Shared(inner) => repository_status(inner),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = ErrorBody {
            message,
            errors: self.field_errors(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected path parameter");
        Self::BadRequest(messages::INVALID_PATH.to_string())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected query string");
        Self::BadRequest(messages::INVALID_QUERY.to_string())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the authenticated caller.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("brand 12".to_string());
        assert_eq!(err.to_string(), "Not found: brand 12");
    }

    #[test]
    fn test_category_status_codes() {
        assert_eq!(
            status_of(AppError::BadRequest(messages::EXISTED_CODE.to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::invalid_field("name", "is required")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(AppError::Unauthorized(messages::UNAUTHORIZED.to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Forbidden(messages::FORBIDDEN.to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(status_of(AppError::not_found()), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(AppError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_errors_map_to_categories() {
        assert_eq!(
            status_of(RepositoryError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(RepositoryError::Conflict(messages::EXISTED_CODE.to_string()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(RepositoryError::DataCorruption("bad row".to_string()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let (_, message) = AppError::Internal("connection refused".to_string()).status_and_message();
        assert_eq!(message, messages::INTERNAL);
    }

    #[test]
    fn test_conflict_keeps_message_constant() {
        let (status, message) =
            AppError::from(RepositoryError::Conflict(messages::EXISTED_CODE.to_string()))
                .status_and_message();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, messages::EXISTED_CODE);
    }

    #[test]
    fn test_order_errors() {
        assert_eq!(
            status_of(OrderError::NotCancellable.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(OrderError::Repository(RepositoryError::NotFound).into()),
            StatusCode::NOT_FOUND
        );
        let err = AppError::from(OrderError::UnknownAddress(emporium_core::AddressId::new(3)));
        let errors = err.field_errors().unwrap_or_default();
        assert_eq!(errors.field("address_id").len(), 1);
    }

    #[test]
    fn test_validation_errors_are_in_body() {
        let err = AppError::invalid_field("rating", "must be between 1 and 5");
        let errors = err.field_errors().unwrap_or_default();
        assert_eq!(errors.field("rating"), ["must be between 1 and 5"]);
    }
}
