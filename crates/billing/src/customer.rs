//! Stripe customer and catalog lookups
//!
//! Straight pass-through to the gateway; nothing here is cached.

use crate::checkout::require;
use crate::error::{BillingError, BillingResult};
use crate::gateway::{Customer, Price, Product, SharedGateway};

/// Customer service for managing Stripe customers and reading the catalog
#[derive(Clone)]
pub struct CustomerService {
    gateway: SharedGateway,
}

impl CustomerService {
    pub fn new(gateway: SharedGateway) -> Self {
        Self { gateway }
    }

    /// Create a new Stripe customer
    pub async fn create_customer(&self, email: &str) -> BillingResult<Customer> {
        let email = email.trim();
        if !email.contains('@') {
            return Err(BillingError::InvalidInput(format!(
                "Invalid email address: {:?}",
                email
            )));
        }

        self.gateway.create_customer(email).await
    }

    pub async fn get_customer(&self, customer_id: &str) -> BillingResult<Customer> {
        require("customerId", customer_id)?;
        self.gateway.get_customer(customer_id).await
    }

    pub async fn list_customers(&self) -> BillingResult<Vec<Customer>> {
        self.gateway.list_customers().await
    }

    pub async fn list_products(&self) -> BillingResult<Vec<Product>> {
        self.gateway.list_products().await
    }

    pub async fn list_prices(&self) -> BillingResult<Vec<Price>> {
        self.gateway.list_prices().await
    }
}
