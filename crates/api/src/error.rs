//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Failures leave the server as
//! a JSON envelope `{"success": false, "message": "..."}` with a matching
//! status code. Server-side failures are captured to Sentry before
//! responding and never expose their details.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use storehouse_core::EmailError;
use storehouse_core::account::AccountError;
use storehouse_core::analytics::DashboardError;
use storehouse_core::content::ContentError;
use storehouse_core::lifecycle::{ErrorKind, OrderError};
use storehouse_core::product::ProductError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::{MediaError, OrderServiceError, PincodeError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order lifecycle operation failed.
    #[error("Order error: {0}")]
    Orders(#[from] OrderServiceError),

    /// Postal-code lookup failed.
    #[error("Pincode error: {0}")]
    Pincode(#[from] PincodeError),

    /// Media host upload failed.
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// State conflict.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

macro_rules! bad_request_from {
    ($($err:ty),+ $(,)?) => {
        $(
            impl From<$err> for AppError {
                fn from(e: $err) -> Self {
                    Self::BadRequest(e.to_string())
                }
            }
        )+
    };
}

bad_request_from!(ProductError, AccountError, ContentError, DashboardError, EmailError);

impl From<OrderError> for AppError {
    fn from(e: OrderError) -> Self {
        Self::Orders(OrderServiceError::Order(e))
    }
}

const INTERNAL_MESSAGE: &str = "Internal server error";
const UPSTREAM_MESSAGE: &str = "External service error";

fn repository_status(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_owned()),
        RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_owned())
        }
    }
}

const fn order_status(err: &OrderError) -> StatusCode {
    match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Conflict => StatusCode::CONFLICT,
    }
}

impl AppError {
    /// Status code and client-safe message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Database(err) | Self::Orders(OrderServiceError::Repository(err)) => {
                repository_status(err)
            }
            Self::Orders(OrderServiceError::Order(err)) => (order_status(err), err.to_string()),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => {
                    (StatusCode::UNAUTHORIZED, "Invalid credentials".to_owned())
                }
                AuthError::Token(_) => (
                    StatusCode::UNAUTHORIZED,
                    "Not authorized, please sign in again".to_owned(),
                ),
                AuthError::NotAdmin => (StatusCode::FORBIDDEN, "Admin access required".to_owned()),
                AuthError::UserAlreadyExists => (
                    StatusCode::CONFLICT,
                    "An account with this email already exists".to_owned(),
                ),
                AuthError::InvalidEmail(_) => {
                    (StatusCode::BAD_REQUEST, "Invalid email address".to_owned())
                }
                AuthError::InvalidInput(e) => (StatusCode::BAD_REQUEST, e.to_string()),
                AuthError::Repository(e) => repository_status(e),
                AuthError::PasswordHash => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_owned())
                }
            },
            Self::Pincode(PincodeError::InvalidFormat) => {
                (StatusCode::BAD_REQUEST, PincodeError::InvalidFormat.to_string())
            }
            Self::Pincode(_) => (StatusCode::BAD_GATEWAY, "Failed to fetch location".to_owned()),
            Self::Media(_) => (StatusCode::BAD_GATEWAY, UPSTREAM_MESSAGE.to_owned()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, slow down".to_owned(),
            ),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_owned()),
        }
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

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
