//! Error types for lead-meter.

/// Result type for lead-meter pipeline stages.
pub type Result<T> = std::result::Result<T, RelayError>;

/// Errors raised by the pure pipeline stages (normalizer and registry).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// The body is not a well-formed JSON document.
    #[error("Invalid JSON payload")]
    InvalidPayload(String),

    /// The document parsed but carries no usable `clientId`.
    #[error("Missing clientId in webhook body.")]
    MissingClientId,

    /// No billing target is mapped for the client.
    #[error("Unknown clientId '{client_id}' (no billing meter mapping).")]
    UnknownClient {
        /// The client that was looked up.
        client_id: String,
    },
}

impl RelayError {
    /// Stable error kind used in log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidPayload(_) => "invalid_payload",
            Self::MissingClientId => "missing_client_id",
            Self::UnknownClient { .. } => "unknown_client",
        }
    }
}
