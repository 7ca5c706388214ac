//! Stripe webhook handling
//!
//! Events arrive at least once and in no particular order. Each handler
//! re-reads what it needs from Stripe instead of trusting earlier deliveries,
//! so replaying an event is harmless:
//!
//! - `checkout.session.completed`: a customer keeps only their newest active
//!   subscription; older active ones are cancelled. This is what repairs the
//!   race between concurrent checkouts.
//! - `invoice.payment_succeeded`: the card that paid becomes the customer's
//!   default payment method, unless one is already set.
//!
//! Nothing is rolled back if a later call in the same event fails.

use serde::{Deserialize, Serialize};

use crate::error::BillingResult;
use crate::events::{CompletedCheckout, EventKind, PaidInvoice, WebhookEvent};
use crate::gateway::{SharedGateway, Subscription, SubscriptionStatus};

/// Acknowledgement status returned to Stripe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Success,
    Error,
}

/// Body of the webhook response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub status: AckStatus,
}

impl WebhookAck {
    pub fn success() -> Self {
        Self {
            status: AckStatus::Success,
        }
    }

    pub fn error() -> Self {
        Self {
            status: AckStatus::Error,
        }
    }
}

/// What handling an event changed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcileOutcome {
    /// Duplicate subscriptions cancelled
    pub cancelled_subscriptions: Vec<String>,
    /// Payment method that became the default, if any
    pub default_payment_method_set: Option<String>,
}

/// Webhook handler for Stripe events
#[derive(Clone)]
pub struct WebhookHandler {
    gateway: SharedGateway,
}

impl WebhookHandler {
    pub fn new(gateway: SharedGateway) -> Self {
        Self { gateway }
    }

    /// Verify, classify and reconcile one delivery
    ///
    /// A signature or payload that cannot be verified yields an `error`
    /// acknowledgement, never an `Err`. Gateway failures while reconciling
    /// are returned as `Err`.
    pub async fn handle_webhook(&self, payload: &str, signature: &str) -> BillingResult<WebhookAck> {
        let event = match self.gateway.construct_event(payload, signature) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    payload_len = payload.len(),
                    "Error verifying webhook signature"
                );
                return Ok(WebhookAck::error());
            }
        };

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type(),
            "Stripe webhook event verified"
        );

        self.handle_event(event).await?;
        Ok(WebhookAck::success())
    }

    /// Apply the reconciliation action for a verified event
    pub async fn handle_event(&self, event: WebhookEvent) -> BillingResult<ReconcileOutcome> {
        let outcome = match &event.kind {
            EventKind::CheckoutSessionCompleted(session) => {
                self.handle_checkout_completed(session).await?
            }
            EventKind::InvoicePaymentSucceeded(invoice) => {
                self.handle_invoice_payment_succeeded(invoice).await?
            }
            EventKind::Unknown { event_type } => {
                tracing::debug!(
                    event_id = %event.id,
                    event_type = %event_type,
                    "Unhandled Stripe event type"
                );
                ReconcileOutcome::default()
            }
        };

        Ok(outcome)
    }

    async fn handle_checkout_completed(
        &self,
        session: &CompletedCheckout,
    ) -> BillingResult<ReconcileOutcome> {
        let Some(customer_id) = session.customer_id() else {
            tracing::warn!(session_id = %session.id, "Checkout session has no customer");
            return Ok(ReconcileOutcome::default());
        };

        let cancelled = self.cancel_duplicate_subscriptions(customer_id).await?;

        tracing::info!(
            session_id = %session.id,
            customer_id = %customer_id,
            cancelled = cancelled.len(),
            "Checkout session completed"
        );

        Ok(ReconcileOutcome {
            cancelled_subscriptions: cancelled,
            ..Default::default()
        })
    }

    async fn handle_invoice_payment_succeeded(
        &self,
        invoice: &PaidInvoice,
    ) -> BillingResult<ReconcileOutcome> {
        let Some(customer_id) = invoice.customer_id() else {
            tracing::warn!(invoice_id = ?invoice.id, "Paid invoice has no customer");
            return Ok(ReconcileOutcome::default());
        };

        let default_payment_method_set = match invoice.payment_intent_id() {
            Some(payment_intent_id) => {
                self.adopt_default_payment_method(customer_id, payment_intent_id)
                    .await?
            }
            None => {
                tracing::debug!(
                    invoice_id = ?invoice.id,
                    customer_id = %customer_id,
                    "Paid invoice has no payment intent"
                );
                None
            }
        };

        tracing::info!(
            invoice_id = ?invoice.id,
            customer_id = %customer_id,
            "Invoice payment succeeded"
        );

        Ok(ReconcileOutcome {
            default_payment_method_set,
            ..Default::default()
        })
    }

    /// Cancel every active subscription except the newest one
    ///
    /// Returns the ids that were cancelled. With zero or one active
    /// subscription this is a no-op, which is what a replay sees.
    pub async fn cancel_duplicate_subscriptions(
        &self,
        customer_id: &str,
    ) -> BillingResult<Vec<String>> {
        let active = self
            .gateway
            .list_subscriptions(customer_id, SubscriptionStatus::Active)
            .await?;

        let Some(keep) = newest_subscription(&active) else {
            return Ok(Vec::new());
        };

        let mut cancelled = Vec::new();
        for (index, subscription) in active.iter().enumerate() {
            if index == keep {
                continue;
            }

            self.gateway.cancel_subscription(&subscription.id).await?;

            tracing::info!(
                customer_id = %customer_id,
                subscription_id = %subscription.id,
                kept_subscription_id = %active[keep].id,
                "Previous subscription cancelled"
            );

            cancelled.push(subscription.id.clone());
        }

        Ok(cancelled)
    }

    /// Make the payment method used by `payment_intent_id` the customer's
    /// default, unless they already have one
    ///
    /// Returns the payment method id when the default was changed.
    pub async fn adopt_default_payment_method(
        &self,
        customer_id: &str,
        payment_intent_id: &str,
    ) -> BillingResult<Option<String>> {
        let intent = self.gateway.get_payment_intent(payment_intent_id).await?;

        let Some(payment_method_id) = intent.payment_method else {
            tracing::warn!(
                customer_id = %customer_id,
                payment_intent_id = %payment_intent_id,
                "Payment intent has no payment method"
            );
            return Ok(None);
        };

        let customer = self.gateway.get_customer(customer_id).await?;
        if customer.deleted {
            tracing::warn!(
                customer_id = %customer_id,
                payment_intent_id = %payment_intent_id,
                "Customer is deleted, default payment method left alone"
            );
            return Ok(None);
        }

        if let Some(existing) = customer.default_payment_method {
            tracing::debug!(
                customer_id = %customer_id,
                default_payment_method = %existing,
                "Customer already has a default payment method"
            );
            return Ok(None);
        }

        self.gateway
            .set_default_payment_method(customer_id, &payment_method_id)
            .await?;

        tracing::info!(
            customer_id = %customer_id,
            payment_method_id = %payment_method_id,
            "Default payment method set"
        );

        Ok(Some(payment_method_id))
    }
}

/// Index of the most recently created subscription
///
/// Ties go to the earlier position in Stripe's list order.
pub fn newest_subscription(subscriptions: &[Subscription]) -> Option<usize> {
    subscriptions
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, i64)>, (index, subscription)| match best {
            Some((_, created)) if created >= subscription.created => best,
            _ => Some((index, subscription.created)),
        })
        .map(|(index, _)| index)
}
