//! Billing gateway abstraction.
//!
//! The relay submits exactly one usage record per accepted event. The
//! gateway attaches the record's idempotency key so the billing provider
//! deduplicates retried submissions; the relay itself never retries.

use async_trait::async_trait;

use lead_meter_core::UsageRecordRequest;

use crate::stripe::StripeError;

/// Failure to record usage with the billing provider.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The provider (or the transport to it) rejected the submission.
    #[error(transparent)]
    Stripe(#[from] StripeError),

    /// The provider did not answer within the request deadline. The
    /// submission keeps running in the background.
    #[error("Usage submission timed out after {0}s")]
    TimedOut(u64),

    /// The submission task did not run to completion.
    #[error("usage submission aborted: {0}")]
    Aborted(String),
}

/// Destination for usage records.
#[async_trait]
pub trait UsageGateway: Send + Sync {
    /// Submit one usage record, keyed by its idempotency key.
    async fn submit(&self, request: &UsageRecordRequest) -> Result<(), GatewayError>;
}
