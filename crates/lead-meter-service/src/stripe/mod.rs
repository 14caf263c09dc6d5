//! Stripe integration for metered usage.
//!
//! Stripe handles:
//! - Usage records against metered subscription items
//! - Billing meter events
//! - Deduplication of retried submissions via `Idempotency-Key`

pub mod client;
pub mod types;

pub use client::StripeClient;
pub use client::StripeError;
pub use types::*;
