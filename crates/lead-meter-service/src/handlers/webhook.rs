//! CRM lead-created webhook handler.
//!
//! Each request moves through
//! `authenticate → parse → resolve → translate → submit` and stops at the
//! first failing stage. Nothing is retried within a request; CRM re-delivery
//! reproduces the same idempotency key, so the provider records it once.
//!
//! The provider call is bounded by the request deadline. When it expires the
//! CRM gets a `400` while the detached submission is left to finish.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use lead_meter_core::{LeadEvent, UsageRecordRequest};

use crate::error::ApiError;
use crate::gateway::{GatewayError, UsageGateway};
use crate::state::AppState;

/// Body returned for an accepted event.
#[derive(Debug, Serialize)]
pub struct Accepted {
    /// Always `true`.
    pub success: bool,
}

/// Terminal state of one webhook request.
pub type RelayOutcome = Result<Json<Accepted>, ApiError>;

/// Handle a lead-created webhook.
#[tracing::instrument(
    name = "ghl_webhook",
    skip_all,
    fields(request_id = %Uuid::new_v4(), client_id = tracing::field::Empty)
)]
pub async fn ghl_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> RelayOutcome {
    let outcome = match body {
        Ok(body) => relay(&state, &headers, &body).await,
        Err(rejection) => unreadable_body(&state, &headers, &rejection),
    };

    match outcome {
        Ok(request) => {
            tracing::info!(
                target_id = %request.target,
                target_kind = request.target.kind(),
                timestamp = request.timestamp,
                idempotency_key = %request.idempotency_key,
                "+1 lead recorded"
            );
            Ok(Json(Accepted { success: true }))
        }
        Err(err) => {
            tracing::warn!(kind = err.kind(), error = %err, "Webhook rejected");
            Err(err)
        }
    }
}

async fn relay(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<UsageRecordRequest, ApiError> {
    state.auth.authorize(headers, body)?;

    let event = LeadEvent::parse(body)?;
    tracing::Span::current().record("client_id", event.client_id.as_str());

    let target = state.clients().resolve(event.client_id.as_str())?.clone();
    let request = UsageRecordRequest::translate(&event, target);

    let deadline = state.config.request_timeout();
    let submission = submit_detached(Arc::clone(&state.gateway), request.clone());
    match tokio::time::timeout(deadline, submission).await {
        Ok(result) => result?,
        Err(_) => return Err(GatewayError::TimedOut(deadline.as_secs()).into()),
    }
    Ok(request)
}

/// A body that could not be buffered (too large or cut off) is an invalid
/// payload, but the shared token still decides first.
fn unreadable_body(
    state: &AppState,
    headers: &HeaderMap,
    rejection: &BytesRejection,
) -> Result<UsageRecordRequest, ApiError> {
    state.auth.check_shared_token(headers)?;
    Err(ApiError::InvalidPayload(rejection.body_text()))
}

/// Submit on a separate task so a dropped inbound connection does not cancel
/// a submission that is already in flight.
async fn submit_detached(
    gateway: Arc<dyn UsageGateway>,
    request: UsageRecordRequest,
) -> Result<(), GatewayError> {
    let submission =
        async move { gateway.submit(&request).await }.instrument(tracing::Span::current());

    tokio::spawn(submission)
        .await
        .map_err(|e| GatewayError::Aborted(e.to_string()))?
}
