//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use domain_fulfillment::FulfillmentError;
use domain_underwriting::UnderwritingError;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream service failure: {0}")]
    BadGateway(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            ApiError::Validation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg.clone())
            }
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "bad_gateway", msg.clone()),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        match err {
            FulfillmentError::Validation(msg) => ApiError::Validation(msg),
            FulfillmentError::InvalidTransition(msg) => ApiError::Conflict(msg),
            FulfillmentError::PolicyNotFound(id) => ApiError::NotFound(id.to_string()),
            FulfillmentError::PaymentGateway(e) => ApiError::BadGateway(e.to_string()),
            FulfillmentError::Account(e) => ApiError::Internal(e.to_string()),
            FulfillmentError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<UnderwritingError> for ApiError {
    fn from(err: UnderwritingError) -> Self {
        match err {
            UnderwritingError::Rejected { .. } => ApiError::Validation(err.to_string()),
            UnderwritingError::Transient { .. } | UnderwritingError::Unauthorized => {
                ApiError::BadGateway(err.to_string())
            }
            UnderwritingError::Protocol(_) => ApiError::BadGateway(err.to_string()),
        }
    }
}
