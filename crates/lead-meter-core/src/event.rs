//! Lead-created events and the payload normalizer.
//!
//! The CRM posts a JSON body such as:
//!
//! ```json
//! { "clientId": "roofco", "leadId": "abc123", "occurredAt": "2025-08-25T20:00:00Z" }
//! ```
//!
//! Only `clientId` is required.

use serde_json::Value;

use crate::error::{RelayError, Result};
use crate::ids::ClientId;

/// Placeholder lead identifier used when the CRM sends none.
pub const NO_LEAD: &str = "noLead";

/// A validated lead-created event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadEvent {
    /// The CRM client the lead belongs to.
    pub client_id: ClientId,

    /// The lead identifier, if the CRM sent a non-empty one.
    pub lead_id: Option<String>,

    /// Raw `occurredAt` value, if the CRM sent a non-empty string.
    pub occurred_at: Option<String>,
}

impl LeadEvent {
    /// Create an event directly (primarily for testing).
    #[must_use]
    pub fn new(client_id: ClientId) -> Self {
        Self {
            client_id,
            lead_id: None,
            occurred_at: None,
        }
    }

    /// Set the lead identifier.
    #[must_use]
    pub fn with_lead_id(mut self, lead_id: impl Into<String>) -> Self {
        self.lead_id = Some(lead_id.into()).filter(|s: &String| !s.is_empty());
        self
    }

    /// Set the raw occurrence timestamp.
    #[must_use]
    pub fn with_occurred_at(mut self, occurred_at: impl Into<String>) -> Self {
        self.occurred_at = Some(occurred_at.into()).filter(|s: &String| !s.is_empty());
        self
    }

    /// Parse and validate a raw webhook body.
    ///
    /// A body that is not well-formed JSON yields [`RelayError::InvalidPayload`].
    /// A well-formed document without a usable `clientId` (including documents
    /// that are not objects at all) yields [`RelayError::MissingClientId`].
    pub fn parse(body: &[u8]) -> Result<Self> {
        let document: Value =
            serde_json::from_slice(body).map_err(|e| RelayError::InvalidPayload(e.to_string()))?;

        let client_id = document
            .get("clientId")
            .and_then(identifier_text)
            .and_then(ClientId::new)
            .ok_or(RelayError::MissingClientId)?;

        let lead_id = document
            .get("leadId")
            .and_then(identifier_text)
            .filter(|s| !s.is_empty());

        let occurred_at = match document.get("occurredAt") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                tracing::warn!(
                    client_id = %client_id,
                    occurred_at = %other,
                    "Ignoring non-string occurredAt"
                );
                None
            }
        };

        Ok(Self {
            client_id,
            lead_id,
            occurred_at,
        })
    }

    /// The lead identifier, or [`NO_LEAD`] when absent.
    #[must_use]
    pub fn lead_id_or_placeholder(&self) -> &str {
        self.lead_id.as_deref().unwrap_or(NO_LEAD)
    }
}

/// Render an identifier field. Strings pass through, numbers are rendered in
/// decimal, anything else counts as absent.
fn identifier_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
