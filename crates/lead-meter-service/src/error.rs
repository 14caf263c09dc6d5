//! API error types and responses.
//!
//! The CRM's delivery mechanism only looks at the status code, so rejections
//! are rendered as plain text.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use lead_meter_core::RelayError;

use crate::auth::AuthError;
use crate::gateway::GatewayError;

/// Webhook rejection.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Shared-token check failed.
    #[error("Unauthorized")]
    Unauthorized,

    /// A provider signature was present but failed verification.
    #[error("Webhook Error: {0}")]
    SignatureInvalid(String),

    /// Body is not well-formed JSON.
    #[error("Invalid JSON payload")]
    InvalidPayload(String),

    /// Body has no `clientId`.
    #[error("Missing clientId in webhook body.")]
    MissingClientId,

    /// No billing target mapped for the client.
    #[error("Unknown clientId '{0}' (no billing meter mapping).")]
    UnknownClient(String),

    /// The billing provider rejected or could not process the usage record.
    #[error("{0}")]
    Gateway(#[from] GatewayError),
}

impl ApiError {
    /// Stable error kind used in log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::SignatureInvalid(_) => "signature_invalid",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::MissingClientId => "missing_client_id",
            Self::UnknownClient(_) => "unknown_client",
            Self::Gateway(_) => "gateway_error",
        }
    }

    /// HTTP status for this rejection.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthorized => Self::Unauthorized,
            AuthError::SignatureInvalid(msg) => Self::SignatureInvalid(msg),
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::InvalidPayload(detail) => Self::InvalidPayload(detail),
            RelayError::MissingClientId => Self::MissingClientId,
            RelayError::UnknownClient { client_id } => Self::UnknownClient(client_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stripe::StripeError;

    #[test]
    fn unauthorized_is_401() {
        let err = ApiError::from(AuthError::Unauthorized);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "Unauthorized");
    }

    #[test]
    fn everything_else_is_400() {
        let errors = [
            ApiError::SignatureInvalid("bad".into()),
            ApiError::InvalidPayload("eof".into()),
            ApiError::MissingClientId,
            ApiError::UnknownClient("roofco".into()),
            ApiError::Gateway(GatewayError::Aborted("cancelled".into())),
            ApiError::Gateway(GatewayError::TimedOut(9)),
        ];

        for err in errors {
            assert_eq!(err.status(), StatusCode::BAD_REQUEST, "{}", err.kind());
        }
    }

    #[test]
    fn gateway_message_is_the_provider_message() {
        let err = ApiError::from(GatewayError::from(StripeError::Api {
            status: 400,
            error_type: "invalid_request_error".into(),
            message: "No such subscription item: 'si_999'".into(),
            code: Some("resource_missing".into()),
        }));

        assert_eq!(err.to_string(), "No such subscription item: 'si_999'");
    }

    #[test]
    fn signature_message_is_prefixed() {
        let err = ApiError::from(AuthError::SignatureInvalid("Timestamp outside the tolerance zone".into()));
        assert_eq!(
            err.to_string(),
            "Webhook Error: Timestamp outside the tolerance zone"
        );
    }
}
