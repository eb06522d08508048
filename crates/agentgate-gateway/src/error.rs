use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use agentgate_identity::Rejection;
use agentgate_provider::ProviderError;

/// Aggregates every failure the orchestrator can produce, with a `code()`
/// classification used to pick an HTTP status.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Missing API key. Set the Authorization header.")]
    AuthMissing,

    #[error("Missing message. `message` must be non-empty.")]
    ValidationError,

    #[error("rate limited")]
    RateRejected(Rejection, String),

    #[error("upstream error: {0}")]
    Upstream(#[from] ProviderError),

    #[error("storage error: {0}")]
    Storage(#[from] agentgate_identity::IdentityError),

    #[error("identity not found")]
    NotFound,
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::AuthMissing => "auth_missing",
            GatewayError::ValidationError => "validation_error",
            GatewayError::RateRejected(..) => "rate_rejected",
            GatewayError::Upstream(_) => "upstream_error",
            GatewayError::Storage(_) => "storage_error",
            GatewayError::NotFound => "not_found",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            GatewayError::AuthMissing => StatusCode::UNAUTHORIZED,
            GatewayError::ValidationError => StatusCode::BAD_REQUEST,
            GatewayError::RateRejected(..) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            GatewayError::RateRejected(rejection, upgrade_url) => json!({
                "error": match rejection.reason {
                    agentgate_identity::RejectReason::DailyExhausted => "Daily limit reached",
                    agentgate_identity::RejectReason::RateExceeded => "Rate limit exceeded",
                },
                "resetIn": rejection.reset_hint(),
                "tier": rejection.tier.to_string(),
                "upgrade": upgrade_url,
            }),
            GatewayError::NotFound => json!({ "error": "Identity not found" }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
