// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Subkeeper Billing Module
//!
//! Keeps customer subscriptions consistent with Stripe, which is the only
//! store of billing state.
//!
//! ## Features
//!
//! - **Checkout**: Start a subscription or move to another price through
//!   Stripe Checkout, guarded by the subscription policy
//! - **Billing Portal**: Hand customers a self-service portal link
//! - **Webhooks**: Verify Stripe events, cancel duplicate subscriptions,
//!   adopt the paying card as default payment method
//! - **Customers & Catalog**: Create/fetch customers, list products and prices

pub mod checkout;
pub mod client;
pub mod customer;
pub mod error;
pub mod events;
pub mod gateway;
pub mod policy;
pub mod portal;
pub mod signature;
pub mod webhooks;

use std::sync::Arc;

// Checkout
pub use checkout::CheckoutService;

// Client
pub use client::{RedirectUrls, StripeClient, StripeConfig};

// Customer
pub use customer::CustomerService;

// Error
pub use error::{BillingError, BillingResult};

// Events
pub use events::{CompletedCheckout, EventKind, ObjectRef, PaidInvoice, WebhookEvent};

// Gateway
pub use gateway::{
    BillingPortalSession, CheckoutRequest, CheckoutSession, Customer, MockPaymentGateway,
    PaymentGateway, PaymentIntent, Price, Product, SharedGateway, Subscription,
    SubscriptionStatus,
};

// Policy
pub use policy::{SubscriptionPolicy, UpdateDecision};

// Portal
pub use portal::{PortalResponse, PortalService};

// Webhooks
pub use webhooks::{AckStatus, ReconcileOutcome, WebhookAck, WebhookHandler};

/// Main billing service that combines all billing functionality
#[derive(Clone)]
pub struct BillingService {
    pub checkout: CheckoutService,
    pub customer: CustomerService,
    pub policy: SubscriptionPolicy,
    pub portal: PortalService,
    pub webhooks: WebhookHandler,
}

impl BillingService {
    /// Create a new billing service from environment variables
    pub fn from_env() -> BillingResult<Self> {
        Ok(Self::new(StripeConfig::from_env()?))
    }

    /// Create a new billing service with explicit config
    pub fn new(config: StripeConfig) -> Self {
        let urls = config.redirect_urls.clone();
        let stripe: SharedGateway = Arc::new(StripeClient::new(config));
        Self::with_gateway(stripe, urls)
    }

    /// Wire every service to the same gateway
    pub fn with_gateway(gateway: SharedGateway, urls: RedirectUrls) -> Self {
        let policy = SubscriptionPolicy::new(gateway.clone());

        Self {
            checkout: CheckoutService::new(gateway.clone(), policy.clone(), urls.clone()),
            customer: CustomerService::new(gateway.clone()),
            portal: PortalService::new(gateway.clone(), urls.portal_return_url),
            webhooks: WebhookHandler::new(gateway),
            policy,
        }
    }
}
