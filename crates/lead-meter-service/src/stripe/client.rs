//! Stripe API client implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use lead_meter_core::{BillingTarget, UsageRecordRequest};

use super::types::{MeterEvent, StripeErrorResponse, UsageRecord};
use crate::gateway::{GatewayError, UsageGateway};

/// Error type for Stripe operations.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// HTTP request failed or the response body could not be decoded.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe API returned an error.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error type.
        error_type: String,
        /// Error message.
        message: String,
        /// Error code.
        code: Option<String>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Stripe API client.
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    api_key: String,
    base_url: String,
    api_version: Option<String>,
}

impl StripeClient {
    /// Payload key a meter maps to the billed customer (Stripe's default).
    pub const METER_CUSTOMER_KEY: &'static str = "stripe_customer_id";

    /// Stripe API base URL.
    pub const BASE_URL: &'static str = "https://api.stripe.com/v1";

    /// Default HTTP timeout for Stripe calls.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create a new Stripe client against the public API.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Stripe secret API key (`sk_test_...` or `sk_live_...`)
    pub fn new(api_key: impl Into<String>) -> Result<Self, StripeError> {
        Self::with_options(api_key, Self::BASE_URL, Self::DEFAULT_TIMEOUT)
    }

    /// Create a new Stripe client with a custom base URL and timeout.
    pub fn with_options(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StripeError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(StripeError::Configuration("Stripe API key is empty".into()));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_version: None,
        })
    }

    /// Pin the `Stripe-Version` sent with every request.
    #[must_use]
    pub fn with_api_version(mut self, version: Option<String>) -> Self {
        self.api_version = version.filter(|v| !v.is_empty());
        self
    }

    /// Record usage against a metered subscription item.
    pub async fn create_usage_record(
        &self,
        subscription_item: &str,
        quantity: u64,
        timestamp: i64,
        idempotency_key: &str,
    ) -> Result<UsageRecord, StripeError> {
        let params = [
            ("quantity", quantity.to_string()),
            ("timestamp", timestamp.to_string()),
            ("action", "increment".to_string()),
        ];

        let url = format!(
            "{}/subscription_items/{}/usage_records",
            self.base_url, subscription_item
        );
        self.post_form(&url, &params, idempotency_key).await
    }

    /// Report a billing meter event for `customer`.
    ///
    /// The idempotency key doubles as the meter event `identifier`, which
    /// Stripe also uses to deduplicate meter events.
    pub async fn create_meter_event(
        &self,
        event_name: &str,
        customer: &str,
        value: u64,
        timestamp: i64,
        idempotency_key: &str,
    ) -> Result<MeterEvent, StripeError> {
        let customer_field = format!("payload[{}]", Self::METER_CUSTOMER_KEY);
        let params = [
            ("event_name", event_name.to_string()),
            (customer_field.as_str(), customer.to_string()),
            ("payload[value]", value.to_string()),
            ("timestamp", timestamp.to_string()),
            ("identifier", idempotency_key.to_string()),
        ];

        let url = format!("{}/billing/meter_events", self.base_url);
        self.post_form(&url, &params, idempotency_key).await
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
        idempotency_key: &str,
    ) -> Result<T, StripeError> {
        let mut request = self
            .client
            .post(url)
            .basic_auth(&self.api_key, Option::<&str>::None)
            .header("Idempotency-Key", idempotency_key)
            .form(params);

        if let Some(version) = &self.api_version {
            request = request.header("Stripe-Version", version);
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        // Try to parse error response
        let error_body: Result<StripeErrorResponse, _> = response.json().await;

        match error_body {
            Ok(stripe_error) => Err(StripeError::Api {
                status: status.as_u16(),
                message: stripe_error
                    .error
                    .message
                    .unwrap_or_else(|| format!("Stripe returned HTTP {status}")),
                error_type: stripe_error.error.error_type,
                code: stripe_error.error.code,
            }),
            Err(_) => Err(StripeError::Api {
                status: status.as_u16(),
                error_type: "unknown".to_string(),
                message: format!("Stripe returned HTTP {status}"),
                code: None,
            }),
        }
    }
}

#[async_trait]
impl UsageGateway for StripeClient {
    async fn submit(&self, request: &UsageRecordRequest) -> Result<(), GatewayError> {
        match &request.target {
            BillingTarget::SubscriptionItem(item) => {
                let record = self
                    .create_usage_record(
                        item,
                        request.quantity,
                        request.timestamp,
                        &request.idempotency_key,
                    )
                    .await?;
                tracing::debug!(
                    usage_record = %record.id,
                    subscription_item = %item,
                    "Stripe usage record created"
                );
            }
            BillingTarget::Meter {
                event_name,
                customer,
            } => {
                let event = self
                    .create_meter_event(
                        event_name,
                        customer,
                        request.quantity,
                        request.timestamp,
                        &request.idempotency_key,
                    )
                    .await?;
                tracing::debug!(
                    event_name = %event.event_name,
                    customer = %customer,
                    identifier = ?event.identifier,
                    "Stripe meter event created"
                );
            }
        }

        Ok(())
    }
}
