//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{CheckoutError, ConfirmationError, OrderAdminError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Checkout could not be committed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Order could not be read back.
    #[error("Order error: {0}")]
    Confirmation(#[from] ConfirmationError),

    /// Order status could not be changed.
    #[error("Order admin error: {0}")]
    OrderAdmin(#[from] OrderAdminError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Form fields failed validation.
    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body of an error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<String>,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Checkout(err) => match err {
                CheckoutError::Unauthenticated => StatusCode::UNAUTHORIZED,
                CheckoutError::MissingAddress
                | CheckoutError::EmptyCart
                | CheckoutError::InvalidAddress => StatusCode::BAD_REQUEST,
                CheckoutError::OrderCreateFailed(_)
                | CheckoutError::OrderItemsFailed(_)
                | CheckoutError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Confirmation(err) => match err {
                ConfirmationError::Unauthenticated => StatusCode::UNAUTHORIZED,
                ConfirmationError::NotFound => StatusCode::NOT_FOUND,
                ConfirmationError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::OrderAdmin(err) => match err {
                OrderAdminError::NotFound => StatusCode::NOT_FOUND,
                OrderAdminError::InvalidTransition { .. } | OrderAdminError::StaleStatus => {
                    StatusCode::CONFLICT
                }
                OrderAdminError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the shopper.
    fn public_message(&self) -> String {
        if self.status().is_server_error() {
            return match self {
                Self::Checkout(
                    CheckoutError::OrderCreateFailed(_) | CheckoutError::OrderItemsFailed(_),
                ) => "We could not place your order. Your cart has not been changed, please try again."
                    .to_string(),
                _ => "Internal server error".to_string(),
            };
        }

        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(_)) => {
                "This change conflicts with existing data".to_string()
            }
            Self::Checkout(err) => err.to_string(),
            Self::Confirmation(err) => err.to_string(),
            Self::OrderAdmin(err) => err.to_string(),
            Self::Validation(_) => "Please correct the highlighted fields".to_string(),
            _ => self.to_string(),
        }
    }
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let details = match &self {
            Self::Validation(fields) => fields.clone(),
            _ => Vec::new(),
        };
        let body = ErrorBody {
            error: self.public_message(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this once the shopper is known so errors are associated with them.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order placed", Some(&[("order_id", "123")]));
/// ```
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use bloom_core::OrderStatus;

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order 12".to_string());
        assert_eq!(err.to_string(), "Not found: order 12");

        let err = AppError::Validation(vec!["city is required".to_string()]);
        assert_eq!(err.to_string(), "Validation failed: city is required");
    }

    #[test]
    fn test_checkout_status_codes() {
        assert_eq!(
            AppError::from(CheckoutError::Unauthenticated).status(),
            StatusCode::UNAUTHORIZED
        );
        for err in [
            CheckoutError::MissingAddress,
            CheckoutError::EmptyCart,
            CheckoutError::InvalidAddress,
        ] {
            assert_eq!(AppError::from(err).status(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(
            AppError::from(CheckoutError::OrderItemsFailed(RepositoryError::NotFound)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_order_status_codes() {
        assert_eq!(
            AppError::from(ConfirmationError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(OrderAdminError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Pending,
            })
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(OrderAdminError::StaleStatus).status(),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_server_error_hides_details() {
        let err = AppError::Database(RepositoryError::DataCorruption(
            "order 7 has negative quantity".to_string(),
        ));
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_client_error_message_is_readable() {
        let (status, body) = body_json(CheckoutError::EmptyCart.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "your cart is empty");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_validation_lists_fields() {
        let err = AppError::Validation(vec![
            "street is required".to_string(),
            "city is required".to_string(),
        ]);
        let (_, body) = body_json(err).await;
        assert_eq!(body["details"].as_array().unwrap().len(), 2);
    }
}
