use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::GatewayError;
use crate::orchestrator;

#[derive(Deserialize)]
pub struct ChatRequestBody {
    pub message: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Serialize)]
pub struct ChatResponseBody {
    pub ok: bool,
    pub response: String,
    pub identity: agentgate_identity::types::IdentityProjection,
}

/// POST /v1/chat — resolve identity, admit, call upstream, record, respond.
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ChatRequestBody>,
) -> Result<Json<ChatResponseBody>, GatewayError> {
    let key = extract_api_key(&headers).unwrap_or_default();
    let provider = extract_provider(&headers);

    let outcome =
        orchestrator::handle_chat(&state, &key, &provider, &body.message, body.model.as_deref())
            .await?;

    Ok(Json(ChatResponseBody {
        ok: true,
        response: outcome.response,
        identity: outcome.identity,
    }))
}

/// The upstream key travels either as a bearer token or as a dedicated
/// `X-Provider-Key` header; this is the sole credential the gateway
/// accepts — there is no separate end-user auth layer.
pub(crate) fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
        .or_else(|| {
            headers
                .get("x-provider-key")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
}

fn extract_provider(headers: &HeaderMap) -> String {
    headers
        .get("x-provider")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("openai")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_provider_defaults_to_openai() {
        let headers = HeaderMap::new();
        assert_eq!(extract_provider(&headers), "openai");
    }

    #[test]
    fn extract_api_key_strips_bearer_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer sk-test".parse().unwrap());
        assert_eq!(extract_api_key(&headers).as_deref(), Some("sk-test"));
    }

    #[test]
    fn extract_api_key_is_none_without_header() {
        let headers = HeaderMap::new();
        assert!(extract_api_key(&headers).is_none());
    }

    #[test]
    fn extract_api_key_falls_back_to_x_provider_key() {
        let mut headers = HeaderMap::new();
        headers.insert("x-provider-key", "sk-via-header".parse().unwrap());
        assert_eq!(extract_api_key(&headers).as_deref(), Some("sk-via-header"));
    }

    #[test]
    fn extract_api_key_prefers_bearer_over_x_provider_key() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer sk-bearer".parse().unwrap());
        headers.insert("x-provider-key", "sk-fallback".parse().unwrap());
        assert_eq!(extract_api_key(&headers).as_deref(), Some("sk-bearer"));
    }
}
