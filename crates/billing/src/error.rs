//! Billing error types

use thiserror::Error;

/// Billing-specific errors
#[derive(Debug, Error)]
pub enum BillingError {
    /// A subscription rule refused the request
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Stripe validated the call and refused it (unknown id, bad parameter, ...)
    #[error("Stripe rejected the request: {0}")]
    GatewayRejected(String),

    /// Transient network or Stripe-side failure
    #[error("Stripe unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Webhook signature verification failed")]
    SignatureInvalid,

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BillingError {
    /// Whether retrying the same call later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, BillingError::GatewayUnavailable(_))
    }
}

impl From<stripe::StripeError> for BillingError {
    fn from(err: stripe::StripeError) -> Self {
        match err {
            stripe::StripeError::Stripe(request_error) => {
                let status = request_error.http_status;
                let message = request_error
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("HTTP {}", status));
                // Rate limited (429) or server errors (5xx)
                if status == 429 || (500..600).contains(&status) {
                    BillingError::GatewayUnavailable(message)
                } else {
                    BillingError::GatewayRejected(message)
                }
            }
            stripe::StripeError::Timeout => {
                BillingError::GatewayUnavailable("Request timed out".to_string())
            }
            stripe::StripeError::ClientError(msg) => BillingError::GatewayUnavailable(msg),
            other => BillingError::GatewayRejected(other.to_string()),
        }
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
