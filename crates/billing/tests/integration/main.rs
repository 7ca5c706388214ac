//! Integration tests for the subscription lifecycle
//!
//! These run the billing services against an in-memory Stripe stand-in and
//! check the state Stripe would be left in after each flow.
//!
//! ## Running Tests
//! ```bash
//! cargo test -p subkeeper-billing --test integration
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;
mod lifecycle;
