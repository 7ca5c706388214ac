//! In-memory stand-in for Stripe
//!
//! Holds just enough state to observe what the reconciler does: customers,
//! subscriptions, payment intents and a log of every mutating call.
//! Webhook payloads go through the real signature check and parser.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use subkeeper_billing::{
    signature, BillingError, BillingPortalSession, BillingResult, BillingService,
    CheckoutRequest, CheckoutSession, Customer, PaymentGateway, PaymentIntent, Price, Product,
    RedirectUrls, SharedGateway, Subscription, SubscriptionStatus, WebhookEvent,
};

pub const WEBHOOK_SECRET: &str = "whsec_integration_secret";

#[derive(Default)]
struct State {
    customers: HashMap<String, Customer>,
    subscriptions: Vec<Subscription>,
    payment_intents: HashMap<String, PaymentIntent>,
    checkout_requests: Vec<CheckoutRequest>,
    mutations: Vec<String>,
    next_id: u32,
}

#[derive(Clone, Default)]
pub struct FakeStripe {
    state: Arc<Mutex<State>>,
}

impl FakeStripe {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_customer(&self, id: &str, default_payment_method: Option<&str>) {
        self.state().customers.insert(
            id.to_string(),
            Customer {
                id: id.to_string(),
                email: Some(format!("{}@example.com", id)),
                default_payment_method: default_payment_method.map(str::to_string),
                deleted: false,
            },
        );
    }

    pub fn delete_customer(&self, id: &str) {
        if let Some(customer) = self.state().customers.get_mut(id) {
            customer.deleted = true;
            customer.default_payment_method = None;
        }
    }

    pub fn add_subscription(
        &self,
        id: &str,
        customer_id: &str,
        price_id: &str,
        created: i64,
        status: SubscriptionStatus,
    ) {
        self.state().subscriptions.push(Subscription {
            id: id.to_string(),
            customer_id: customer_id.to_string(),
            status,
            created,
            price_ids: vec![price_id.to_string()],
        });
    }

    pub fn add_payment_intent(&self, id: &str, payment_method: Option<&str>) {
        self.state().payment_intents.insert(
            id.to_string(),
            PaymentIntent {
                id: id.to_string(),
                payment_method: payment_method.map(str::to_string),
            },
        );
    }

    pub fn active_subscription_ids(&self, customer_id: &str) -> Vec<String> {
        self.state()
            .subscriptions
            .iter()
            .filter(|s| s.customer_id == customer_id && s.is_active())
            .map(|s| s.id.clone())
            .collect()
    }

    pub fn default_payment_method(&self, customer_id: &str) -> Option<String> {
        self.state()
            .customers
            .get(customer_id)
            .and_then(|c| c.default_payment_method.clone())
    }

    pub fn checkout_requests(&self) -> Vec<CheckoutRequest> {
        self.state().checkout_requests.clone()
    }

    /// Mutating calls made so far, e.g. `cancel sub_old`
    pub fn mutations(&self) -> Vec<String> {
        self.state().mutations.clone()
    }

    pub fn service(&self) -> BillingService {
        let gateway: SharedGateway = Arc::new(self.clone());
        BillingService::with_gateway(gateway, RedirectUrls::from_base_url("http://localhost:3000"))
    }
}

fn unknown(kind: &str, id: &str) -> BillingError {
    BillingError::GatewayRejected(format!("No such {}: '{}'", kind, id))
}

#[async_trait]
impl PaymentGateway for FakeStripe {
    async fn create_customer(&self, email: &str) -> BillingResult<Customer> {
        let mut state = self.state();
        state.next_id += 1;
        let customer = Customer {
            id: format!("cus_fake{}", state.next_id),
            email: Some(email.to_string()),
            default_payment_method: None,
            deleted: false,
        };
        state.customers.insert(customer.id.clone(), customer.clone());
        state.mutations.push(format!("create_customer {}", customer.id));
        Ok(customer)
    }

    async fn get_customer(&self, customer_id: &str) -> BillingResult<Customer> {
        self.state()
            .customers
            .get(customer_id)
            .cloned()
            .ok_or_else(|| unknown("customer", customer_id))
    }

    async fn list_customers(&self) -> BillingResult<Vec<Customer>> {
        Ok(self.state().customers.values().cloned().collect())
    }

    async fn list_products(&self) -> BillingResult<Vec<Product>> {
        Ok(vec![])
    }

    async fn list_prices(&self) -> BillingResult<Vec<Price>> {
        Ok(vec![])
    }

    async fn list_subscriptions(
        &self,
        customer_id: &str,
        status: SubscriptionStatus,
    ) -> BillingResult<Vec<Subscription>> {
        let mut subscriptions: Vec<Subscription> = self
            .state()
            .subscriptions
            .iter()
            .filter(|s| s.customer_id == customer_id && s.status == status)
            .cloned()
            .collect();
        // Stripe lists newest first
        subscriptions.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(subscriptions)
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> BillingResult<()> {
        let mut state = self.state();
        let subscription = state
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription_id)
            .ok_or_else(|| unknown("subscription", subscription_id))?;
        subscription.status = SubscriptionStatus::Inactive;
        state.mutations.push(format!("cancel {}", subscription_id));
        Ok(())
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> BillingResult<CheckoutSession> {
        let mut state = self.state();
        state.next_id += 1;
        let id = format!("cs_fake{}", state.next_id);
        state.checkout_requests.push(request);
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.stripe.com/c/pay/{}", id)),
            id,
        })
    }

    async fn create_billing_portal_session(
        &self,
        customer_id: &str,
        _return_url: &str,
    ) -> BillingResult<BillingPortalSession> {
        if !self.state().customers.contains_key(customer_id) {
            return Err(unknown("customer", customer_id));
        }
        Ok(BillingPortalSession {
            id: "bps_fake".to_string(),
            url: format!("https://billing.stripe.com/p/session/{}", customer_id),
        })
    }

    async fn get_payment_intent(&self, payment_intent_id: &str) -> BillingResult<PaymentIntent> {
        self.state()
            .payment_intents
            .get(payment_intent_id)
            .cloned()
            .ok_or_else(|| unknown("payment_intent", payment_intent_id))
    }

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> BillingResult<()> {
        let mut state = self.state();
        let customer = state
            .customers
            .get_mut(customer_id)
            .filter(|c| !c.deleted)
            .ok_or_else(|| unknown("customer", customer_id))?;
        customer.default_payment_method = Some(payment_method_id.to_string());
        state
            .mutations
            .push(format!("set_default {} {}", customer_id, payment_method_id));
        Ok(())
    }

    fn construct_event(&self, payload: &str, signature: &str) -> BillingResult<WebhookEvent> {
        signature::verify(
            payload,
            signature,
            WEBHOOK_SECRET,
            signature::DEFAULT_TOLERANCE_SECS,
            now(),
        )?;
        WebhookEvent::parse(payload)
    }
}

pub fn now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

/// Signed `stripe-signature` header for `payload`
pub fn sign(payload: &str) -> String {
    signature::sign_payload(WEBHOOK_SECRET, now(), payload).unwrap()
}

pub fn checkout_completed_payload(event_id: &str, customer_id: &str) -> String {
    serde_json::json!({
        "id": event_id,
        "object": "event",
        "type": "checkout.session.completed",
        "created": now(),
        "data": {"object": {
            "id": format!("cs_{}", event_id),
            "object": "checkout.session",
            "mode": "subscription",
            "customer": customer_id,
        }}
    })
    .to_string()
}

pub fn invoice_paid_payload(event_id: &str, customer_id: &str, payment_intent: &str) -> String {
    serde_json::json!({
        "id": event_id,
        "object": "event",
        "type": "invoice.payment_succeeded",
        "created": now(),
        "data": {"object": {
            "id": format!("in_{}", event_id),
            "object": "invoice",
            "customer": customer_id,
            "payment_intent": payment_intent,
        }}
    })
    .to_string()
}
