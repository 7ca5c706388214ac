//! Stripe webhook events
//!
//! Events are decoded by hand from the envelope rather than through
//! `stripe::Event`, whose generated types only accept the API version
//! async-stripe was built against. Only the fields the reconciler reads are
//! modelled; everything else in the payload is ignored.
//!
//! The payload shape is selected by the `type` tag:
//!
//! - `checkout.session.completed` → [`CompletedCheckout`]
//! - `invoice.payment_succeeded` → [`PaidInvoice`]
//! - anything else → [`EventKind::Unknown`]

use serde::{Deserialize, Serialize};

use crate::error::{BillingError, BillingResult};

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const INVOICE_PAYMENT_SUCCEEDED: &str = "invoice.payment_succeeded";

/// Reference to another Stripe object: either its id or the expanded object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectRef {
    Id(String),
    Object { id: String },
}

impl ObjectRef {
    pub fn id(&self) -> &str {
        match self {
            ObjectRef::Id(id) => id,
            ObjectRef::Object { id } => id,
        }
    }
}

/// `data.object` of `checkout.session.completed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedCheckout {
    pub id: String,
    #[serde(default)]
    pub customer: Option<ObjectRef>,
    #[serde(default)]
    pub subscription: Option<ObjectRef>,
}

impl CompletedCheckout {
    pub fn customer_id(&self) -> Option<&str> {
        self.customer.as_ref().map(ObjectRef::id)
    }
}

/// `data.object` of `invoice.payment_succeeded`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaidInvoice {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub customer: Option<ObjectRef>,
    #[serde(default)]
    pub payment_intent: Option<ObjectRef>,
}

impl PaidInvoice {
    pub fn customer_id(&self) -> Option<&str> {
        self.customer.as_ref().map(ObjectRef::id)
    }

    pub fn payment_intent_id(&self) -> Option<&str> {
        self.payment_intent.as_ref().map(ObjectRef::id)
    }
}

/// Known event kinds, each with its own payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    CheckoutSessionCompleted(CompletedCheckout),
    InvoicePaymentSucceeded(PaidInvoice),
    /// Delivered but not handled by this service
    Unknown { event_type: String },
}

impl EventKind {
    /// The Stripe `type` tag this kind was decoded from
    pub fn event_type(&self) -> &str {
        match self {
            EventKind::CheckoutSessionCompleted(_) => CHECKOUT_SESSION_COMPLETED,
            EventKind::InvoicePaymentSucceeded(_) => INVOICE_PAYMENT_SUCCEEDED,
            EventKind::Unknown { event_type } => event_type,
        }
    }
}

/// A verified Stripe event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub id: String,
    /// Unix timestamp (seconds) at which Stripe created the event
    pub created: i64,
    pub kind: EventKind,
}

#[derive(Deserialize)]
struct Envelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: i64,
    data: EnvelopeData,
}

#[derive(Deserialize)]
struct EnvelopeData {
    object: serde_json::Value,
}

impl WebhookEvent {
    /// Decode an event from its (already verified) JSON body
    pub fn parse(payload: &str) -> BillingResult<Self> {
        let envelope: Envelope = serde_json::from_str(payload)
            .map_err(|e| BillingError::InvalidPayload(format!("event envelope: {}", e)))?;

        let kind = match envelope.event_type.as_str() {
            CHECKOUT_SESSION_COMPLETED => EventKind::CheckoutSessionCompleted(
                decode_object(&envelope.event_type, envelope.data.object)?,
            ),
            INVOICE_PAYMENT_SUCCEEDED => EventKind::InvoicePaymentSucceeded(decode_object(
                &envelope.event_type,
                envelope.data.object,
            )?),
            _ => EventKind::Unknown {
                event_type: envelope.event_type,
            },
        };

        Ok(Self {
            id: envelope.id,
            created: envelope.created,
            kind,
        })
    }

    pub fn event_type(&self) -> &str {
        self.kind.event_type()
    }
}

fn decode_object<T: serde::de::DeserializeOwned>(
    event_type: &str,
    object: serde_json::Value,
) -> BillingResult<T> {
    serde_json::from_value(object)
        .map_err(|e| BillingError::InvalidPayload(format!("{} object: {}", event_type, e)))
}
