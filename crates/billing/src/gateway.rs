//! Payment gateway boundary
//!
//! Every piece of billing state lives in Stripe. The rest of the crate talks
//! to it only through [`PaymentGateway`], which keeps policy and reconciliation
//! code free of `async-stripe` types and lets tests substitute the gateway.
//!
//! No operation retries. A failure comes back as
//! [`BillingError::GatewayUnavailable`](crate::BillingError::GatewayUnavailable)
//! or [`BillingError::GatewayRejected`](crate::BillingError::GatewayRejected)
//! and the caller decides what to do with it.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::BillingResult;
use crate::events::WebhookEvent;

/// A Stripe customer, referenced by id only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: Option<String>,
    /// `invoice_settings.default_payment_method`
    pub default_payment_method: Option<String>,
    /// Deleted customers keep their id but carry no invoice settings
    #[serde(default)]
    pub deleted: bool,
}

/// Subscription status as far as the lifecycle rules care
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
}

/// A customer's enrollment in one recurring plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub customer_id: String,
    pub status: SubscriptionStatus,
    /// Unix timestamp (seconds)
    pub created: i64,
    /// Price id of each line item, in Stripe order
    pub price_ids: Vec<String>,
}

impl Subscription {
    /// Price of the first line item
    pub fn primary_price_id(&self) -> Option<&str> {
        self.price_ids.first().map(String::as_str)
    }

    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub id: String,
    pub product_id: Option<String>,
    pub unit_amount: Option<i64>,
    pub currency: Option<String>,
    /// Recurring interval (`month`, `year`, ...), `None` for one-off prices
    pub interval: Option<String>,
}

/// Parameters for a subscription-mode checkout session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub customer_id: String,
    pub price_id: String,
    pub quantity: u64,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPortalSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Present once the payment succeeded
    pub payment_method: Option<String>,
}

/// Capabilities this service needs from the payment gateway
#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_customer(&self, email: &str) -> BillingResult<Customer>;

    async fn get_customer(&self, customer_id: &str) -> BillingResult<Customer>;

    async fn list_customers(&self) -> BillingResult<Vec<Customer>>;

    async fn list_products(&self) -> BillingResult<Vec<Product>>;

    async fn list_prices(&self) -> BillingResult<Vec<Price>>;

    /// Subscriptions of one customer in the given status, in gateway order
    async fn list_subscriptions(
        &self,
        customer_id: &str,
        status: SubscriptionStatus,
    ) -> BillingResult<Vec<Subscription>>;

    async fn cancel_subscription(&self, subscription_id: &str) -> BillingResult<()>;

    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> BillingResult<CheckoutSession>;

    async fn create_billing_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> BillingResult<BillingPortalSession>;

    async fn get_payment_intent(&self, payment_intent_id: &str) -> BillingResult<PaymentIntent>;

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> BillingResult<()>;

    /// Verify the `stripe-signature` header against the raw body and parse the event
    fn construct_event(&self, payload: &str, signature: &str) -> BillingResult<WebhookEvent>;
}

/// Gateway handle shared by every service
pub type SharedGateway = Arc<dyn PaymentGateway>;
