//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::OrderError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Order(OrderError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Order(err) => order_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn order_error_to_response(err: OrderError) -> (StatusCode, String) {
    match &err {
        OrderError::GameNotFound(_)
        | OrderError::OrderNotFound(_)
        | OrderError::LineNotFound(_)
        | OrderError::CartNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        OrderError::Unavailable(_)
        | OrderError::InsufficientStock { .. }
        | OrderError::InvalidQuantity(_)
        | OrderError::EmptyCart(_)
        | OrderError::UnknownPaymentMethod(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        OrderError::AlreadyShipped(_)
        | OrderError::OrderNotOpen(_)
        | OrderError::ConcurrentEdit(_) => (StatusCode::CONFLICT, err.to_string()),
        OrderError::Payment(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
        OrderError::Storage(_) => {
            tracing::error!(error = %err, "storage failure");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}
