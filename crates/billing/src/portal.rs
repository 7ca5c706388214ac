//! Stripe Billing Portal

use serde::Serialize;

use crate::checkout::require;
use crate::error::BillingResult;
use crate::gateway::SharedGateway;

/// Portal service for Stripe billing portal sessions
#[derive(Clone)]
pub struct PortalService {
    gateway: SharedGateway,
    return_url: String,
}

impl PortalService {
    pub fn new(gateway: SharedGateway, return_url: impl Into<String>) -> Self {
        Self {
            gateway,
            return_url: return_url.into(),
        }
    }

    /// Create a billing portal session for a customer and return its URL
    pub async fn open_billing_portal(&self, customer_id: &str) -> BillingResult<String> {
        require("customerId", customer_id)?;

        let session = self
            .gateway
            .create_billing_portal_session(customer_id, &self.return_url)
            .await?;

        tracing::info!(
            customer_id = %customer_id,
            session_id = %session.id,
            "Created billing portal session"
        );

        Ok(session.url)
    }
}

/// Response for creating a portal session
#[derive(Debug, Serialize)]
pub struct PortalResponse {
    pub url: String,
}
