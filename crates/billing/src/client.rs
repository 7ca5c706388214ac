//! Stripe client configuration and the production [`PaymentGateway`]

use async_trait::async_trait;
use stripe::{
    CheckoutSessionMode, Client, CreateBillingPortalSession, CreateCheckoutSession,
    CreateCheckoutSessionLineItems, CreateCustomer, CustomerId, CustomerInvoiceSettings, Expandable,
    ListCustomers, ListPrices, ListProducts, ListSubscriptions, PaymentIntentId, SubscriptionId,
    SubscriptionStatusFilter, UpdateCustomer,
};

use crate::error::{BillingError, BillingResult};
use crate::events::WebhookEvent;
use crate::gateway::{
    BillingPortalSession, CheckoutRequest, CheckoutSession, Customer, PaymentGateway,
    PaymentIntent, Price, Product, Subscription, SubscriptionStatus,
};
use crate::signature;

/// Where Stripe sends the customer after hosted flows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectUrls {
    pub success_url: String,
    pub cancel_url: String,
    /// Billing portal "return to app" link
    pub portal_return_url: String,
}

impl RedirectUrls {
    /// Derive the standard destinations from the app's base URL
    pub fn from_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            success_url: format!("{}/subscription/success", base),
            cancel_url: format!("{}/subscription/cancel", base),
            portal_return_url: base.to_string(),
        }
    }
}

/// Configuration for Stripe billing
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Stripe secret API key
    pub secret_key: String,
    /// Stripe webhook signing secret
    pub webhook_secret: String,
    /// Allowed clock skew for webhook signatures
    pub webhook_tolerance_secs: i64,
    pub redirect_urls: RedirectUrls,
}

impl StripeConfig {
    /// Create config from environment variables
    pub fn from_env() -> BillingResult<Self> {
        let app_base_url =
            std::env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let defaults = RedirectUrls::from_base_url(&app_base_url);

        let webhook_tolerance_secs = match std::env::var("STRIPE_WEBHOOK_TOLERANCE_SECS") {
            Ok(raw) => raw.parse().map_err(|_| {
                BillingError::Config(format!(
                    "STRIPE_WEBHOOK_TOLERANCE_SECS must be a number of seconds, got {:?}",
                    raw
                ))
            })?,
            Err(_) => signature::DEFAULT_TOLERANCE_SECS,
        };

        Ok(Self {
            secret_key: std::env::var("STRIPE_SECRET_KEY")
                .map_err(|_| BillingError::Config("STRIPE_SECRET_KEY not set".to_string()))?,
            webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET")
                .map_err(|_| BillingError::Config("STRIPE_WEBHOOK_SECRET not set".to_string()))?,
            webhook_tolerance_secs,
            redirect_urls: RedirectUrls {
                success_url: std::env::var("STRIPE_SUCCESS_URL").unwrap_or(defaults.success_url),
                cancel_url: std::env::var("STRIPE_CANCEL_URL").unwrap_or(defaults.cancel_url),
                portal_return_url: std::env::var("STRIPE_PORTAL_RETURN_URL")
                    .unwrap_or(defaults.portal_return_url),
            },
        })
    }
}

/// Stripe billing client
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    config: StripeConfig,
}

impl StripeClient {
    /// Create a new Stripe client from config
    pub fn new(config: StripeConfig) -> Self {
        let client = Client::new(&config.secret_key);
        Self { client, config }
    }

    /// Create a new Stripe client from environment variables
    pub fn from_env() -> BillingResult<Self> {
        let config = StripeConfig::from_env()?;
        Ok(Self::new(config))
    }

    /// Get the inner Stripe client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the config
    pub fn config(&self) -> &StripeConfig {
        &self.config
    }
}

fn parse_customer_id(customer_id: &str) -> BillingResult<CustomerId> {
    customer_id
        .parse::<CustomerId>()
        .map_err(|e| BillingError::InvalidInput(format!("Invalid customer ID: {}", e)))
}

fn map_customer(customer: stripe::Customer) -> Customer {
    // Stripe omits invoice settings on deleted customers
    let deleted = customer.deleted || customer.invoice_settings.is_none();

    Customer {
        id: customer.id.to_string(),
        email: customer.email,
        deleted,
        default_payment_method: customer
            .invoice_settings
            .and_then(|settings| settings.default_payment_method)
            .map(|pm| match pm {
                Expandable::Id(id) => id.to_string(),
                Expandable::Object(pm) => pm.id.to_string(),
            }),
    }
}

fn map_subscription(subscription: stripe::Subscription) -> Subscription {
    let status = if subscription.status == stripe::SubscriptionStatus::Active {
        SubscriptionStatus::Active
    } else {
        SubscriptionStatus::Inactive
    };

    Subscription {
        id: subscription.id.to_string(),
        customer_id: match &subscription.customer {
            Expandable::Id(id) => id.to_string(),
            Expandable::Object(customer) => customer.id.to_string(),
        },
        status,
        created: subscription.created,
        price_ids: subscription
            .items
            .data
            .iter()
            .filter_map(|item| item.price.as_ref())
            .map(|price| price.id.to_string())
            .collect(),
    }
}

fn map_product(product: stripe::Product) -> Product {
    Product {
        id: product.id.to_string(),
        name: product.name,
        active: product.active.unwrap_or(false),
    }
}

fn map_price(price: stripe::Price) -> Price {
    Price {
        id: price.id.to_string(),
        product_id: price.product.map(|product| match product {
            Expandable::Id(id) => id.to_string(),
            Expandable::Object(product) => product.id.to_string(),
        }),
        unit_amount: price.unit_amount,
        currency: price.currency.map(|c| format!("{:?}", c).to_lowercase()),
        interval: price.recurring.map(|r| r.interval.as_str().to_string()),
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_customer(&self, email: &str) -> BillingResult<Customer> {
        let params = CreateCustomer {
            email: Some(email),
            ..Default::default()
        };

        let customer = stripe::Customer::create(self.inner(), params).await?;

        tracing::info!(customer_id = %customer.id, "Created Stripe customer");

        Ok(map_customer(customer))
    }

    async fn get_customer(&self, customer_id: &str) -> BillingResult<Customer> {
        let customer_id = parse_customer_id(customer_id)?;
        let customer = stripe::Customer::retrieve(self.inner(), &customer_id, &[]).await?;
        Ok(map_customer(customer))
    }

    async fn list_customers(&self) -> BillingResult<Vec<Customer>> {
        let customers = stripe::Customer::list(self.inner(), &ListCustomers::new()).await?;
        Ok(customers.data.into_iter().map(map_customer).collect())
    }

    async fn list_products(&self) -> BillingResult<Vec<Product>> {
        let products = stripe::Product::list(self.inner(), &ListProducts::new()).await?;
        Ok(products.data.into_iter().map(map_product).collect())
    }

    async fn list_prices(&self) -> BillingResult<Vec<Price>> {
        let prices = stripe::Price::list(self.inner(), &ListPrices::new()).await?;
        Ok(prices.data.into_iter().map(map_price).collect())
    }

    async fn list_subscriptions(
        &self,
        customer_id: &str,
        status: SubscriptionStatus,
    ) -> BillingResult<Vec<Subscription>> {
        let mut params = ListSubscriptions::new();
        params.customer = Some(parse_customer_id(customer_id)?);
        params.status = Some(match status {
            SubscriptionStatus::Active => SubscriptionStatusFilter::Active,
            SubscriptionStatus::Inactive => SubscriptionStatusFilter::Canceled,
        });

        let subscriptions = stripe::Subscription::list(self.inner(), &params).await?;
        Ok(subscriptions.data.into_iter().map(map_subscription).collect())
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> BillingResult<()> {
        let sub_id = subscription_id
            .parse::<SubscriptionId>()
            .map_err(|e| BillingError::InvalidInput(format!("Invalid subscription ID: {}", e)))?;

        let subscription =
            stripe::Subscription::cancel(self.inner(), &sub_id, stripe::CancelSubscription::default())
                .await?;

        tracing::info!(
            subscription_id = %subscription.id,
            status = ?subscription.status,
            "Cancelled Stripe subscription"
        );

        Ok(())
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> BillingResult<CheckoutSession> {
        let customer_id = parse_customer_id(&request.customer_id)?;

        let line_items = vec![CreateCheckoutSessionLineItems {
            price: Some(request.price_id.clone()),
            quantity: Some(request.quantity),
            ..Default::default()
        }];

        let params = CreateCheckoutSession {
            customer: Some(customer_id),
            mode: Some(CheckoutSessionMode::Subscription),
            line_items: Some(line_items),
            success_url: Some(&request.success_url),
            cancel_url: Some(&request.cancel_url),
            ..Default::default()
        };

        let session = stripe::CheckoutSession::create(self.inner(), params).await?;

        Ok(CheckoutSession {
            id: session.id.to_string(),
            url: session.url,
        })
    }

    async fn create_billing_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> BillingResult<BillingPortalSession> {
        let customer_id = parse_customer_id(customer_id)?;

        let mut params = CreateBillingPortalSession::new(customer_id);
        params.return_url = Some(return_url);

        let session = stripe::BillingPortalSession::create(self.inner(), params).await?;

        Ok(BillingPortalSession {
            id: session.id.to_string(),
            url: session.url,
        })
    }

    async fn get_payment_intent(&self, payment_intent_id: &str) -> BillingResult<PaymentIntent> {
        let pi_id = payment_intent_id
            .parse::<PaymentIntentId>()
            .map_err(|e| BillingError::InvalidInput(format!("Invalid payment intent ID: {}", e)))?;

        let intent = stripe::PaymentIntent::retrieve(self.inner(), &pi_id, &[]).await?;

        Ok(PaymentIntent {
            id: intent.id.to_string(),
            payment_method: intent.payment_method.map(|pm| match pm {
                Expandable::Id(id) => id.to_string(),
                Expandable::Object(pm) => pm.id.to_string(),
            }),
        })
    }

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> BillingResult<()> {
        let customer_id = parse_customer_id(customer_id)?;

        let params = UpdateCustomer {
            invoice_settings: Some(CustomerInvoiceSettings {
                default_payment_method: Some(payment_method_id.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        stripe::Customer::update(self.inner(), &customer_id, params).await?;

        Ok(())
    }

    fn construct_event(&self, payload: &str, signature: &str) -> BillingResult<WebhookEvent> {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        signature::verify(
            payload,
            signature,
            &self.config.webhook_secret,
            self.config.webhook_tolerance_secs,
            now,
        )?;
        WebhookEvent::parse(payload)
    }
}
