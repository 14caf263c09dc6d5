//! Usage record construction.
//!
//! Every accepted lead event becomes one usage record of quantity 1. The
//! record carries an idempotency key derived from the client, the lead and
//! the billing timestamp, so a CRM retry of the same event yields the same key
//! and the billing provider applies it at most once.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::event::LeadEvent;
use crate::ids::BillingTarget;

/// Tag identifying this integration in idempotency keys.
pub const INTEGRATION_TAG: &str = "ghl";

/// Separator between idempotency key components.
pub const IDEMPOTENCY_KEY_SEPARATOR: &str = ":";

/// Escape character for separators occurring inside a key component.
const ESCAPE: &str = "%";

/// Units recorded per accepted lead event.
pub const USAGE_QUANTITY: u64 = 1;

/// Naive (offset-less) datetime layouts, interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A usage record ready to be submitted to the billing provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageRecordRequest {
    /// Where the usage accumulates.
    #[serde(serialize_with = "serialize_target")]
    pub target: BillingTarget,

    /// Units of usage. Always [`USAGE_QUANTITY`].
    pub quantity: u64,

    /// Billing timestamp in Unix seconds.
    pub timestamp: i64,

    /// Key the provider uses to deduplicate retried submissions.
    pub idempotency_key: String,
}

impl UsageRecordRequest {
    /// Translate an event using the current wall-clock time as fallback.
    #[must_use]
    pub fn translate(event: &LeadEvent, target: BillingTarget) -> Self {
        Self::translate_at(event, target, Utc::now())
    }

    /// Translate an event with an explicit fallback time.
    #[must_use]
    pub fn translate_at(event: &LeadEvent, target: BillingTarget, now: DateTime<Utc>) -> Self {
        let timestamp = derive_timestamp(event.occurred_at.as_deref(), now);
        let idempotency_key = idempotency_key(
            event.client_id.as_str(),
            event.lead_id_or_placeholder(),
            timestamp,
        );

        Self {
            target,
            quantity: USAGE_QUANTITY,
            timestamp,
            idempotency_key,
        }
    }
}

fn serialize_target<S: serde::Serializer>(
    target: &BillingTarget,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(target)
}

/// Derive the billing timestamp in whole Unix seconds.
///
/// A parseable `occurred_at` wins (fractional seconds are floored). An absent
/// or unparseable value falls back to `now`; the unparseable case is logged.
#[must_use]
pub fn derive_timestamp(occurred_at: Option<&str>, now: DateTime<Utc>) -> i64 {
    match occurred_at {
        None => now.timestamp(),
        Some(raw) => parse_timestamp(raw).unwrap_or_else(|| {
            tracing::warn!(
                occurred_at = %raw,
                "Unparseable occurredAt; falling back to current time"
            );
            now.timestamp()
        }),
    }
}

/// Parse an ISO-8601 style timestamp into Unix seconds.
fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.timestamp());
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().timestamp());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp())
}

/// Build the idempotency key `ghl:<client>:<lead>:<timestamp>`.
///
/// `%` and `:` inside the client or lead id are percent-encoded, so two
/// different (client, lead) pairs never share a key.
#[must_use]
pub fn idempotency_key(client_id: &str, lead_id: &str, timestamp: i64) -> String {
    [
        INTEGRATION_TAG,
        &*escape_component(client_id),
        &*escape_component(lead_id),
        &timestamp.to_string(),
    ]
    .join(IDEMPOTENCY_KEY_SEPARATOR)
}

fn escape_component(raw: &str) -> Cow<'_, str> {
    if raw.contains(ESCAPE) || raw.contains(IDEMPOTENCY_KEY_SEPARATOR) {
        Cow::Owned(
            raw.replace(ESCAPE, "%25")
                .replace(IDEMPOTENCY_KEY_SEPARATOR, "%3A"),
        )
    } else {
        Cow::Borrowed(raw)
    }
}
