//! Common test utilities for lead-meter integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use axum_test::TestServer;

use lead_meter_core::{ClientRegistry, UsageRecordRequest};
use lead_meter_service::crypto::hmac_sha256_hex;
use lead_meter_service::stripe::StripeError;
use lead_meter_service::{create_router, AppState, GatewayError, ServiceConfig, UsageGateway};

/// Shared token configured for the test service.
pub const TOKEN: &str = "secret1";

/// Stripe signing secret used by signature tests.
pub const SIGNING_SECRET: &str = "whsec_test_secret";

/// Gateway that records submissions instead of calling Stripe.
#[derive(Default)]
pub struct RecordingGateway {
    submissions: Mutex<Vec<UsageRecordRequest>>,
    failure: Option<String>,
    delay: Option<Duration>,
}

impl RecordingGateway {
    /// A gateway that rejects every submission with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// A gateway that takes `delay` before recording each submission.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Submissions received so far.
    pub fn submissions(&self) -> Vec<UsageRecordRequest> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl UsageGateway for RecordingGateway {
    async fn submit(&self, request: &UsageRecordRequest) -> Result<(), GatewayError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.submissions.lock().unwrap().push(request.clone());

        match &self.failure {
            None => Ok(()),
            Some(message) => Err(GatewayError::Stripe(StripeError::Api {
                status: 400,
                error_type: "invalid_request_error".into(),
                message: message.clone(),
                code: None,
            })),
        }
    }
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The gateway the service submits to.
    pub gateway: Arc<RecordingGateway>,
}

impl TestHarness {
    /// Harness with the shared token configured and no signing secret.
    pub fn new() -> Self {
        Self::build(test_config(), RecordingGateway::default())
    }

    /// Harness that also verifies Stripe signatures.
    pub fn with_signing_secret() -> Self {
        let mut config = test_config();
        config.stripe_webhook_secret = Some(SIGNING_SECRET.to_string());
        Self::build(config, RecordingGateway::default())
    }

    /// Harness whose gateway rejects every submission.
    pub fn with_failing_gateway(message: &str) -> Self {
        Self::build(test_config(), RecordingGateway::failing(message))
    }

    /// Harness from an explicit configuration.
    pub fn with_config(config: ServiceConfig) -> Self {
        Self::build(config, RecordingGateway::default())
    }

    /// Harness from an explicit configuration and gateway.
    pub fn with_gateway(config: ServiceConfig, gateway: RecordingGateway) -> Self {
        Self::build(config, gateway)
    }

    fn build(config: ServiceConfig, gateway: RecordingGateway) -> Self {
        let gateway = Arc::new(gateway);
        let state = AppState::new(config, gateway.clone());
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self { server, gateway }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration used by the default harness.
pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        stripe_api_key: "sk_test_xxx".into(),
        shared_webhook_token: Some(TOKEN.into()),
        clients: ClientRegistry::from_json(r#"{"roofco":"si_999","plumbco":"leads_created:cus_123"}"#),
        ..ServiceConfig::default()
    }
}

/// `X-Webhook-Token` header name.
pub fn token_header() -> HeaderName {
    HeaderName::from_static("x-webhook-token")
}

/// `Stripe-Signature` header name.
pub fn signature_header() -> HeaderName {
    HeaderName::from_static("stripe-signature")
}

/// Header value from a string.
pub fn value(s: &str) -> HeaderValue {
    HeaderValue::from_str(s).expect("valid header value")
}

/// Build a valid `Stripe-Signature` header for `body` signed at `timestamp`.
pub fn stripe_signature(body: &[u8], timestamp: i64) -> String {
    let ts = timestamp.to_string();
    let sig = hmac_sha256_hex(SIGNING_SECRET, &[ts.as_bytes(), b".", body]);
    format!("t={ts},v1={sig}")
}
