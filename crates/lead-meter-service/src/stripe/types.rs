//! Stripe API types.

use serde::Deserialize;

/// Usage record created against a metered subscription item.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageRecord {
    /// Usage record ID (`mbur_...`).
    pub id: String,
    /// Recorded quantity.
    #[serde(default)]
    pub quantity: i64,
    /// Subscription item the usage was recorded against.
    #[serde(default)]
    pub subscription_item: Option<String>,
    /// Usage timestamp (Unix).
    #[serde(default)]
    pub timestamp: i64,
}

/// Billing meter event.
#[derive(Debug, Clone, Deserialize)]
pub struct MeterEvent {
    /// Meter event name.
    pub event_name: String,
    /// Provider-side deduplication identifier.
    #[serde(default)]
    pub identifier: Option<String>,
    /// Event timestamp (Unix).
    #[serde(default)]
    pub timestamp: i64,
}

/// Stripe API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorResponse {
    /// Error details.
    pub error: StripeErrorDetail,
}

/// Stripe error detail.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorDetail {
    /// Error type.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error message.
    #[serde(default)]
    pub message: Option<String>,
    /// Error code.
    #[serde(default)]
    pub code: Option<String>,
    /// Parameter that caused the error.
    #[serde(default)]
    pub param: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_usage_record() {
        let record: UsageRecord = serde_json::from_str(
            r#"{"id":"mbur_1","object":"usage_record","livemode":false,"quantity":1,
                "subscription_item":"si_999","timestamp":1756152000}"#,
        )
        .unwrap();

        assert_eq!(record.id, "mbur_1");
        assert_eq!(record.subscription_item.as_deref(), Some("si_999"));
    }

    #[test]
    fn parses_error_without_message() {
        let err: StripeErrorResponse =
            serde_json::from_str(r#"{"error":{"type":"api_error"}}"#).unwrap();

        assert_eq!(err.error.error_type, "api_error");
        assert!(err.error.message.is_none());
    }
}
