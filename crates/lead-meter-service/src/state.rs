//! Application state.

use std::sync::Arc;

use lead_meter_core::ClientRegistry;

use crate::auth::Authenticator;
use crate::config::ServiceConfig;
use crate::gateway::UsageGateway;
use crate::stripe::{StripeClient, StripeError};

/// Application state shared across handlers.
///
/// Built once at startup and never mutated; concurrent requests only read it.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration, including the client → billing target mapping.
    pub config: ServiceConfig,

    /// Webhook authenticator.
    pub auth: Authenticator,

    /// Destination for usage records.
    pub gateway: Arc<dyn UsageGateway>,
}

impl AppState {
    /// Client → billing target mapping.
    #[must_use]
    pub fn clients(&self) -> &ClientRegistry {
        &self.config.clients
    }

    /// Create application state with an explicit gateway.
    #[must_use]
    pub fn new(config: ServiceConfig, gateway: Arc<dyn UsageGateway>) -> Self {
        let auth = Authenticator::new(
            config.shared_webhook_token.clone(),
            config.stripe_webhook_secret.clone(),
            config.signature_tolerance(),
        );

        if config.shared_webhook_token.is_none() {
            tracing::warn!("SHARED_WEBHOOK_TOKEN not configured - all webhooks will be rejected");
        }
        if config.stripe_webhook_secret.is_none() {
            tracing::info!("Stripe webhook secret not configured - signature checks disabled");
        }
        if config.clients.is_empty() {
            tracing::warn!("Client map is empty - every client will be unknown");
        }

        Self {
            config,
            auth,
            gateway,
        }
    }

    /// Create application state backed by the Stripe API.
    pub fn with_stripe(config: ServiceConfig) -> Result<Self, StripeError> {
        let stripe = StripeClient::with_options(
            config.stripe_api_key.clone(),
            config.stripe_api_base.clone(),
            std::time::Duration::from_secs(config.stripe_timeout_seconds),
        )?
        .with_api_version(config.stripe_api_version.clone());

        tracing::info!(api_base = %config.stripe_api_base, "Stripe integration enabled");

        Ok(Self::new(config, Arc::new(stripe)))
    }
}
