//! API routes

pub mod health;
pub mod subscription;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    let subscription_routes = Router::new()
        .route(
            "/customers",
            post(subscription::create_customer).get(subscription::list_customers),
        )
        .route("/customers/:id", get(subscription::get_customer))
        .route("/products", get(subscription::list_products))
        .route("/prices", get(subscription::list_prices))
        .route("/success", get(subscription::success))
        .route("/cancel", get(subscription::cancel))
        .route("/create", post(subscription::create_subscription_session))
        .route("/update", post(subscription::update_subscription_session))
        .route("/current", post(subscription::current_subscription))
        .route("/webhook", post(subscription::webhook));

    Router::new()
        .merge(health_routes)
        .nest("/subscription", subscription_routes)
        // Stripe event payloads stay well under 1MB
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
