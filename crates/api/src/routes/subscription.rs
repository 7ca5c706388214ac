//! Subscription routes for Stripe integration

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use subkeeper_billing::{Customer, PortalResponse, Price, Product, WebhookAck};

use crate::{error::ApiResult, state::AppState};

/// Header carrying Stripe's webhook signature
pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

// ============================================================================
// Customers & Catalog
// ============================================================================

/// Request to create a customer
#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    #[serde(default)]
    pub email: String,
}

/// Create a Stripe customer
pub async fn create_customer(
    State(state): State<AppState>,
    Json(req): Json<CreateCustomerRequest>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let customer = state.billing.customer.create_customer(&req.email).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    Ok(Json(state.billing.customer.get_customer(&id).await?))
}

pub async fn list_customers(State(state): State<AppState>) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.billing.customer.list_customers().await?))
}

pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.billing.customer.list_products().await?))
}

pub async fn list_prices(State(state): State<AppState>) -> ApiResult<Json<Vec<Price>>> {
    Ok(Json(state.billing.customer.list_prices().await?))
}

// ============================================================================
// Checkout redirects
// ============================================================================

pub async fn success() -> &'static str {
    "Subscription was successful!"
}

pub async fn cancel() -> &'static str {
    "Subscription was canceled!"
}

// ============================================================================
// Checkout & Portal
// ============================================================================

/// Request to start a first subscription
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub price_id: String,
}

/// Request to move to another price
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionRequest {
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub new_price_id: String,
}

/// Request for a billing portal link
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSubscriptionRequest {
    #[serde(default)]
    pub customer_id: String,
}

/// Response carrying a checkout session id
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutSessionResponse {
    pub id: String,
}

/// Create a checkout session for a customer's first subscription
pub async fn create_subscription_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSubscriptionRequest>,
) -> ApiResult<Json<CheckoutSessionResponse>> {
    let id = state
        .billing
        .checkout
        .start_subscription(&req.customer_id, &req.price_id)
        .await?;

    Ok(Json(CheckoutSessionResponse { id }))
}

/// Create a checkout session for a plan change
pub async fn update_subscription_session(
    State(state): State<AppState>,
    Json(req): Json<UpdateSubscriptionRequest>,
) -> ApiResult<Json<CheckoutSessionResponse>> {
    let id = state
        .billing
        .checkout
        .change_subscription(&req.customer_id, &req.new_price_id)
        .await?;

    Ok(Json(CheckoutSessionResponse { id }))
}

/// Open the billing portal for the customer's current subscription
pub async fn current_subscription(
    State(state): State<AppState>,
    Json(req): Json<CurrentSubscriptionRequest>,
) -> ApiResult<Json<PortalResponse>> {
    let url = state
        .billing
        .portal
        .open_billing_portal(&req.customer_id)
        .await?;

    Ok(Json(PortalResponse { url }))
}

// ============================================================================
// Webhook
// ============================================================================

/// Handle Stripe webhook events
///
/// Verification failures are answered with `{"status":"error"}` and a 200 so
/// Stripe does not redeliver a payload that can never verify. A missing
/// signature header is verified as an empty signature, and a body that is
/// not UTF-8 is treated as unverifiable.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    tracing::info!(body_len = body.len(), "Stripe webhook received");

    let body = match std::str::from_utf8(&body) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "Stripe webhook body is not valid UTF-8");
            return Ok(Json(WebhookAck::error()));
        }
    };

    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if signature.is_empty() {
        tracing::warn!("Stripe webhook missing signature header");
    }

    let ack = state.billing.webhooks.handle_webhook(body, signature).await?;
    Ok(Json(ack))
}
