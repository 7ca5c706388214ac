//! API error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use subkeeper_billing::BillingError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("{0}")]
    BadRequest(String),

    // Stripe errors
    #[error("Payment provider rejected the request: {0}")]
    GatewayRejected(String),
    #[error("Payment provider unavailable")]
    GatewayUnavailable,

    // Internal errors
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Validation
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),

            // Stripe
            ApiError::GatewayRejected(msg) => (StatusCode::BAD_REQUEST, "GATEWAY_REJECTED", msg.clone()),
            ApiError::GatewayUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "GATEWAY_UNAVAILABLE", self.to_string()),

            // Internal
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", self.to_string()),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::BadRequest(msg) => ApiError::BadRequest(msg),
            BillingError::InvalidInput(msg) => ApiError::Validation(msg),
            BillingError::GatewayRejected(msg) => {
                tracing::warn!(error = %msg, "Stripe rejected request");
                ApiError::GatewayRejected(msg)
            }
            BillingError::GatewayUnavailable(msg) => {
                tracing::error!(error = %msg, "Stripe unavailable");
                ApiError::GatewayUnavailable
            }
            BillingError::SignatureInvalid | BillingError::InvalidPayload(_) => {
                ApiError::BadRequest(err.to_string())
            }
            BillingError::Config(msg) => {
                tracing::error!(error = %msg, "Billing misconfigured");
                ApiError::Internal
            }
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
