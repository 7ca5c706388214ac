//! Stripe Checkout sessions for starting or changing a subscription

use crate::client::RedirectUrls;
use crate::error::{BillingError, BillingResult};
use crate::gateway::{CheckoutRequest, SharedGateway};
use crate::policy::{SubscriptionPolicy, UpdateDecision};

pub const ALREADY_SUBSCRIBED: &str = "Customer already has an active subscription";
pub const NO_ACTIVE_SUBSCRIPTION: &str = "No active subscription found for customer";
pub const SAME_SUBSCRIPTION: &str = "Customer already has this subscription";

/// Checkout service for creating Stripe checkout sessions
#[derive(Clone)]
pub struct CheckoutService {
    gateway: SharedGateway,
    policy: SubscriptionPolicy,
    urls: RedirectUrls,
}

impl CheckoutService {
    pub fn new(gateway: SharedGateway, policy: SubscriptionPolicy, urls: RedirectUrls) -> Self {
        Self {
            gateway,
            policy,
            urls,
        }
    }

    /// Create a checkout session for a customer's first subscription
    ///
    /// Returns the checkout session id.
    pub async fn start_subscription(
        &self,
        customer_id: &str,
        price_id: &str,
    ) -> BillingResult<String> {
        require("customerId", customer_id)?;
        require("priceId", price_id)?;

        if !self.policy.can_create_subscription(customer_id).await? {
            tracing::info!(
                customer_id = %customer_id,
                "Rejected checkout: customer already subscribed"
            );
            return Err(BillingError::BadRequest(ALREADY_SUBSCRIBED.to_string()));
        }

        self.create_session(customer_id, price_id).await
    }

    /// Create a checkout session that moves a subscribed customer to another price
    ///
    /// The current subscription is left alone; once the new one completes the
    /// webhook reconciler cancels the older of the two.
    pub async fn change_subscription(
        &self,
        customer_id: &str,
        new_price_id: &str,
    ) -> BillingResult<String> {
        require("customerId", customer_id)?;
        require("newPriceId", new_price_id)?;

        match self
            .policy
            .can_update_subscription(customer_id, new_price_id)
            .await?
        {
            UpdateDecision::Allow => {}
            UpdateDecision::NoActiveSubscription => {
                return Err(BillingError::BadRequest(NO_ACTIVE_SUBSCRIPTION.to_string()));
            }
            UpdateDecision::SameSubscription => {
                return Err(BillingError::BadRequest(SAME_SUBSCRIPTION.to_string()));
            }
        }

        self.create_session(customer_id, new_price_id).await
    }

    async fn create_session(&self, customer_id: &str, price_id: &str) -> BillingResult<String> {
        let session = self
            .gateway
            .create_checkout_session(CheckoutRequest {
                customer_id: customer_id.to_string(),
                price_id: price_id.to_string(),
                quantity: 1,
                success_url: self.urls.success_url.clone(),
                cancel_url: self.urls.cancel_url.clone(),
            })
            .await?;

        tracing::info!(
            customer_id = %customer_id,
            price_id = %price_id,
            session_id = %session.id,
            "Created checkout session"
        );

        Ok(session.id)
    }
}

pub(crate) fn require(field: &str, value: &str) -> BillingResult<()> {
    if value.trim().is_empty() {
        return Err(BillingError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}
