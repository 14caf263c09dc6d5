//! Lead-meter HTTP relay service.
//!
//! Receives lead-created webhooks from the CRM and records one unit of
//! metered usage per lead against Stripe:
//!
//! - `POST /ghl-webhook` - lead-created events
//! - `GET /` and `GET /health` - liveness and readiness probes
//!
//! # Authentication
//!
//! Two independent checks guard the webhook endpoint:
//!
//! 1. **Shared token** - the `X-Webhook-Token` header must match the configured
//!    secret. Always enforced; an unconfigured secret rejects everything.
//! 2. **Stripe signature** - verified only when a signing secret is configured
//!    and the request carries a `Stripe-Signature` header.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod stripe;

pub use auth::{AuthError, Authenticator, SignatureCheck};
pub use config::{ConfigError, ServiceConfig};
pub use error::ApiError;
pub use gateway::{GatewayError, UsageGateway};
pub use routes::create_router;
pub use state::AppState;
pub use stripe::{StripeClient, StripeError};
