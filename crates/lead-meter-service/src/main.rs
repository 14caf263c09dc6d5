//! Lead-meter service - CRM lead webhooks to Stripe metered usage
//!
//! This is the main entry point for the lead-meter service.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lead_meter_service::{create_router, AppState, ServiceConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lead_meter=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting lead-meter service");

    let config = ServiceConfig::from_env().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        e
    })?;

    tracing::info!(
        listen_addr = %config.listen_addr(),
        clients = config.clients.len(),
        shared_token_configured = config.shared_webhook_token.is_some(),
        signature_checks = config.stripe_webhook_secret.is_some(),
        "Service configuration loaded"
    );

    let state = AppState::with_stripe(config.clone())?;
    let app = create_router(state);

    tracing::info!(listen_addr = %config.listen_addr(), "Server listening");
    let listener = tokio::net::TcpListener::bind(config.listen_addr()).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
