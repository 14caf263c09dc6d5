//! Webhook request authentication.
//!
//! Two independent predicates protect the webhook endpoint:
//!
//! - [`Authenticator::check_shared_token`] - the CRM must send the configured
//!   secret in `X-Webhook-Token`. Runs on every request.
//! - [`Authenticator::check_signature`] - a Stripe-style `Stripe-Signature`
//!   header is verified against the signing secret. Runs only when both the
//!   secret and the header are present.
//!
//! [`Authenticator::authorize`] runs the signature check first so that a bad
//! signature is reported as such even when the token is also wrong.

use std::time::Duration;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};

use crate::crypto::{constant_time_eq, hmac_sha256_hex};

/// Header carrying the shared webhook token.
pub const WEBHOOK_TOKEN_HEADER: &str = "x-webhook-token";

/// Header carrying the provider signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Signature scheme version accepted in the signature header.
const SIGNATURE_SCHEME: &str = "v1";

/// Default replay tolerance for signed requests (Stripe's default).
pub const DEFAULT_SIGNATURE_TOLERANCE: Duration = Duration::from_secs(300);

/// Authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Shared token missing, wrong, or not configured.
    #[error("Unauthorized")]
    Unauthorized,

    /// A signature header was present but did not verify.
    #[error("{0}")]
    SignatureInvalid(String),
}

/// Result of the conditional signature check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    /// The signature header verified against the signing secret.
    Verified,
    /// No signing secret configured, or no signature header sent.
    Skipped,
}

/// Request authenticator built once from configuration.
#[derive(Clone)]
pub struct Authenticator {
    shared_token: Option<String>,
    signing_secret: Option<String>,
    tolerance: Duration,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("shared_token_configured", &self.shared_token.is_some())
            .field("signing_secret_configured", &self.signing_secret.is_some())
            .field("tolerance", &self.tolerance)
            .finish()
    }
}

impl Authenticator {
    /// Create an authenticator. Empty secrets count as unset.
    #[must_use]
    pub fn new(
        shared_token: Option<String>,
        signing_secret: Option<String>,
        tolerance: Duration,
    ) -> Self {
        Self {
            shared_token: shared_token.filter(|s| !s.is_empty()),
            signing_secret: signing_secret.filter(|s| !s.is_empty()),
            tolerance,
        }
    }

    /// Run both checks: signature (if applicable) first, then the shared token.
    pub fn authorize(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<SignatureCheck, AuthError> {
        let signature = self.check_signature(headers, body, Utc::now())?;
        self.check_shared_token(headers)?;
        Ok(signature)
    }

    /// Compare `X-Webhook-Token` with the configured shared token.
    pub fn check_shared_token(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let Some(expected) = self.shared_token.as_deref() else {
            tracing::warn!("Shared webhook token not configured - rejecting request");
            return Err(AuthError::Unauthorized);
        };

        let provided = headers
            .get(WEBHOOK_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::Unauthorized)?;

        if constant_time_eq(provided, expected) {
            Ok(())
        } else {
            Err(AuthError::Unauthorized)
        }
    }

    /// Verify the `Stripe-Signature` header against the raw body.
    ///
    /// Skipped when no signing secret is configured or no header is present.
    pub fn check_signature(
        &self,
        headers: &HeaderMap,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<SignatureCheck, AuthError> {
        let Some(secret) = self.signing_secret.as_deref() else {
            return Ok(SignatureCheck::Skipped);
        };
        let Some(header) = headers.get(SIGNATURE_HEADER) else {
            return Ok(SignatureCheck::Skipped);
        };

        let header = header.to_str().map_err(|_| {
            AuthError::SignatureInvalid("Signature header is not valid text".into())
        })?;

        verify_signature(secret, header, body, now, self.tolerance)?;
        Ok(SignatureCheck::Verified)
    }
}

/// Verify a `t=<unix>,v1=<hex>[,v1=<hex>...]` signature header.
pub fn verify_signature(
    secret: &str,
    header: &str,
    body: &[u8],
    now: DateTime<Utc>,
    tolerance: Duration,
) -> Result<(), AuthError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", ts)) => timestamp = Some(ts),
            Some((SIGNATURE_SCHEME, sig)) => signatures.push(sig),
            _ => {}
        }
    }

    let timestamp = timestamp
        .and_then(|ts| ts.parse::<i64>().ok().map(|secs| (ts, secs)))
        .filter(|_| !signatures.is_empty());
    let Some((timestamp, signed_at)) = timestamp else {
        return Err(AuthError::SignatureInvalid(
            "Unable to extract timestamp and signatures from header".into(),
        ));
    };

    let expected = hmac_sha256_hex(secret, &[timestamp.as_bytes(), b".", body]);
    if !signatures.iter().any(|sig| constant_time_eq(&expected, sig)) {
        return Err(AuthError::SignatureInvalid(
            "No signatures found matching the expected signature for payload".into(),
        ));
    }

    let tolerance = i64::try_from(tolerance.as_secs()).unwrap_or(i64::MAX);
    if signed_at < now.timestamp().saturating_sub(tolerance) {
        return Err(AuthError::SignatureInvalid(
            "Timestamp outside the tolerance zone".into(),
        ));
    }

    Ok(())
}
