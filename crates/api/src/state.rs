//! Shared application state

use std::sync::Arc;

use subkeeper_billing::BillingService;

use crate::config::Config;

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub billing: Arc<BillingService>,
}

impl AppState {
    pub fn new(config: Config, billing: BillingService) -> Self {
        Self {
            config: Arc::new(config),
            billing: Arc::new(billing),
        }
    }
}
