//! Service configuration.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use lead_meter_core::ClientRegistry;

use crate::auth::DEFAULT_SIGNATURE_TOLERANCE;
use crate::stripe::StripeClient;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Configuration errors that prevent startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The Stripe secret key is required.
    #[error("Missing STRIPE_SECRET_KEY env var.")]
    MissingStripeKey,

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {name}: {value}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Port to listen on (default: 3000).
    pub port: u16,

    /// Stripe secret API key (required).
    pub stripe_api_key: String,

    /// Stripe webhook signing secret (optional).
    pub stripe_webhook_secret: Option<String>,

    /// Stripe API base URL (default: `https://api.stripe.com/v1`).
    pub stripe_api_base: String,

    /// Pinned Stripe API version (optional).
    ///
    /// Subscription item targets use the legacy usage-records endpoint, which
    /// Stripe removed in `2025-03-31.basil`; pin an earlier version such as
    /// `2024-06-20` when any client maps to an `si_` target.
    pub stripe_api_version: Option<String>,

    /// Timeout for each Stripe call in seconds.
    pub stripe_timeout_seconds: u64,

    /// Shared token expected in `X-Webhook-Token`.
    pub shared_webhook_token: Option<String>,

    /// Client → billing target mapping.
    pub clients: ClientRegistry,

    /// Replay tolerance for signed requests in seconds.
    pub signature_tolerance_seconds: u64,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Stripe secrets file structure. Either field may be omitted.
#[derive(Debug, Default, Deserialize)]
struct StripeSecrets {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    webhook_secret: Option<String>,
}

const STRIPE_SECRET_PATHS: &[&str] = &[".secrets/stripe.json", "../.secrets/stripe.json"];

impl ServiceConfig {
    /// Load configuration from the process environment.
    ///
    /// A Stripe secrets file, when present, takes precedence over the
    /// `STRIPE_SECRET_KEY` and `STRIPE_WEBHOOK_SECRET` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secrets = load_stripe_secrets().unwrap_or_default();
        Self::from_lookup(overlay_secrets(secrets, |name| std::env::var(name).ok()))
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| non_empty(lookup(name));
        let defaults = Self::default();

        let stripe_api_key = var("STRIPE_SECRET_KEY").ok_or(ConfigError::MissingStripeKey)?;
        let client_map = var("CLIENT_MAP_JSON").unwrap_or_else(|| "{}".into());

        Ok(Self {
            port: parse_var(&var, "PORT", defaults.port)?,
            stripe_api_key,
            stripe_webhook_secret: var("STRIPE_WEBHOOK_SECRET"),
            stripe_api_base: var("STRIPE_API_BASE").unwrap_or(defaults.stripe_api_base),
            stripe_api_version: var("STRIPE_API_VERSION"),
            stripe_timeout_seconds: parse_var(
                &var,
                "STRIPE_TIMEOUT_SECONDS",
                defaults.stripe_timeout_seconds,
            )?,
            shared_webhook_token: var("SHARED_WEBHOOK_TOKEN"),
            clients: ClientRegistry::from_json(&client_map),
            signature_tolerance_seconds: parse_var(
                &var,
                "SIGNATURE_TOLERANCE_SECONDS",
                defaults.signature_tolerance_seconds,
            )?,
            max_body_bytes: parse_var(&var, "MAX_BODY_BYTES", defaults.max_body_bytes)?,
            request_timeout_seconds: parse_var(
                &var,
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            )?,
        })
    }

    /// Socket address to bind.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// Deadline for answering a webhook, including the provider call.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Replay tolerance for signed requests.
    #[must_use]
    pub const fn signature_tolerance(&self) -> Duration {
        Duration::from_secs(self.signature_tolerance_seconds)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_var<V, T>(var: &V, name: &'static str, default: T) -> Result<T, ConfigError>
where
    V: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match var(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

/// Layer the secrets file over `env`: a non-empty file value wins for
/// `STRIPE_SECRET_KEY` and `STRIPE_WEBHOOK_SECRET`, everything else comes
/// from `env`.
fn overlay_secrets<F>(secrets: StripeSecrets, env: F) -> impl Fn(&str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let api_key = non_empty(secrets.api_key);
    let webhook_secret = non_empty(secrets.webhook_secret);

    move |name| {
        let from_file = match name {
            "STRIPE_SECRET_KEY" => api_key.clone(),
            "STRIPE_WEBHOOK_SECRET" => webhook_secret.clone(),
            _ => None,
        };
        from_file.or_else(|| env(name))
    }
}

/// Load Stripe secrets from the first secrets file found.
fn load_stripe_secrets() -> Option<StripeSecrets> {
    for path in STRIPE_SECRET_PATHS {
        match load_secrets_file::<StripeSecrets>(path) {
            Ok(secrets) => {
                tracing::warn!(
                    path = %path,
                    api_key = secrets.api_key.is_some(),
                    webhook_secret = secrets.webhook_secret.is_some(),
                    "Stripe secrets file overrides STRIPE_SECRET_KEY / STRIPE_WEBHOOK_SECRET"
                );
                return Some(secrets);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Ignoring unreadable Stripe secrets file");
            }
        }
    }

    tracing::debug!("Stripe secrets file not found, using environment variables");
    None
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(
    path: impl AsRef<Path>,
) -> Result<T, std::io::Error> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            stripe_api_key: String::new(),
            stripe_webhook_secret: None,
            stripe_api_base: StripeClient::BASE_URL.into(),
            stripe_api_version: None,
            stripe_timeout_seconds: StripeClient::DEFAULT_TIMEOUT.as_secs(),
            shared_webhook_token: None,
            clients: ClientRegistry::empty(),
            signature_tolerance_seconds: DEFAULT_SIGNATURE_TOLERANCE.as_secs(),
            max_body_bytes: 1024 * 1024, // 1MB
            request_timeout_seconds: 9,
        }
    }
}
