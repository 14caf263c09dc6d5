//! Core types and pipeline stages for lead-meter.
//!
//! This crate provides the pure, I/O-free parts of the relay that turns
//! CRM lead-created webhooks into metered usage records:
//!
//! - **Identifiers**: `ClientId`, `BillingTarget`
//! - **Events**: `LeadEvent` and the payload normalizer
//! - **Registry**: `ClientRegistry`, the read-only client → billing target map
//! - **Usage**: `UsageRecordRequest`, timestamp derivation and idempotency keys
//!
//! # Idempotency
//!
//! No local state is kept between requests. Duplicate deliveries of the same
//! logical event produce the same idempotency key, and the billing provider
//! applies a given key at most once.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod event;
pub mod ids;
pub mod registry;
pub mod usage;

pub use error::{RelayError, Result};
pub use event::{LeadEvent, NO_LEAD};
pub use ids::{BillingTarget, ClientId, METER_CUSTOMER_SEPARATOR};
pub use registry::ClientRegistry;
pub use usage::{
    derive_timestamp, idempotency_key, UsageRecordRequest, IDEMPOTENCY_KEY_SEPARATOR,
    INTEGRATION_TAG, USAGE_QUANTITY,
};
