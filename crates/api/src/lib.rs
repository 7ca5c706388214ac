// Test code patterns (expected in test files):
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Subkeeper API Library
//!
//! HTTP boundary for the subscription service: routing, request decoding
//! and error mapping on top of `subkeeper-billing`.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{Config, LogFormat};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
