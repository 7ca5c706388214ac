//! Subscription lifecycle rules
//!
//! Decisions are made from state fetched from Stripe on every call. Nothing
//! is cached.
//!
//! The checks are not atomic with the checkout that follows them. Two
//! concurrent checkouts for one customer can both pass
//! [`SubscriptionPolicy::can_create_subscription`]; the duplicate is cleaned
//! up when `checkout.session.completed` arrives (see [`crate::webhooks`]).

use crate::error::BillingResult;
use crate::gateway::{SharedGateway, SubscriptionStatus};

/// Outcome of a plan change check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateDecision {
    Allow,
    NoActiveSubscription,
    /// The active subscription is already on the requested price
    SameSubscription,
}

/// Policy engine for subscription create/update requests
#[derive(Clone)]
pub struct SubscriptionPolicy {
    gateway: SharedGateway,
}

impl SubscriptionPolicy {
    pub fn new(gateway: SharedGateway) -> Self {
        Self { gateway }
    }

    /// A customer may start a subscription only while they have no active one
    pub async fn can_create_subscription(&self, customer_id: &str) -> BillingResult<bool> {
        let active = self
            .gateway
            .list_subscriptions(customer_id, SubscriptionStatus::Active)
            .await?;

        tracing::debug!(
            customer_id = %customer_id,
            active_subscriptions = active.len(),
            "Checked create eligibility"
        );

        Ok(active.is_empty())
    }

    /// Check whether a customer may move to `new_price_id`
    ///
    /// Only the first active subscription Stripe returns is inspected.
    /// Extra active subscriptions are the reconciler's concern.
    pub async fn can_update_subscription(
        &self,
        customer_id: &str,
        new_price_id: &str,
    ) -> BillingResult<UpdateDecision> {
        let active = self
            .gateway
            .list_subscriptions(customer_id, SubscriptionStatus::Active)
            .await?;

        let decision = match active.first() {
            None => UpdateDecision::NoActiveSubscription,
            Some(current) if current.primary_price_id() == Some(new_price_id) => {
                UpdateDecision::SameSubscription
            }
            Some(_) => UpdateDecision::Allow,
        };

        tracing::debug!(
            customer_id = %customer_id,
            new_price_id = %new_price_id,
            decision = ?decision,
            "Checked update eligibility"
        );

        Ok(decision)
    }
}
