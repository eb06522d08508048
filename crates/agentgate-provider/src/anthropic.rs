use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{ChatRequest, LlmProvider, NormalizedReply, ProviderError, Role};

const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.anthropic.com".to_string()),
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn call(&self, req: &ChatRequest) -> Result<NormalizedReply, ProviderError> {
        let body = build_request_body(req);
        let url = format!("{}/v1/messages", self.base_url);

        debug!(model = %req.model, "sending request to Anthropic");

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 429 {
            let retry_after_ms = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(5000);
            return Err(ProviderError::RateLimited { retry_after_ms });
        }

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "Anthropic API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(normalize(api_resp))
    }
}

/// Anthropic's messages API takes the system prompt as a top-level field,
/// not as a message with role "system" — the first system message (if any)
/// is pulled out of the turn list and the rest passed through unchanged.
fn build_request_body(req: &ChatRequest) -> serde_json::Value {
    let mut system = String::new();
    let mut messages: Vec<serde_json::Value> = Vec::new();

    for m in &req.messages {
        match m.role {
            Role::System if system.is_empty() => system = m.content.clone(),
            _ => messages.push(serde_json::json!({
                "role": m.role,
                "content": m.content,
            })),
        }
    }

    serde_json::json!({
        "model": req.model,
        "max_tokens": req.max_tokens,
        "system": system,
        "messages": messages,
    })
}

fn normalize(resp: ApiResponse) -> NormalizedReply {
    let content: String = resp
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Unknown => None,
        })
        .collect::<Vec<_>>()
        .join("");

    let content = if content.is_empty() {
        crate::provider::NO_RESPONSE_SENTINEL.to_string()
    } else {
        content
    };

    NormalizedReply::from_content(content)
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Message, Role};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn req() -> ChatRequest {
        ChatRequest {
            model: "claude-3-5-sonnet-20241022".to_string(),
            messages: vec![
                Message::new(Role::System, "be terse"),
                Message::new(Role::User, "hello"),
            ],
            max_tokens: 1000,
        }
    }

    #[tokio::test]
    async fn extracts_system_message_and_normalizes_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "hi there"}]
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("sk-ant-test".to_string(), Some(server.uri()));
        let reply = provider.call(&req()).await.unwrap();
        assert_eq!(reply.content(), "hi there");
    }

    #[tokio::test]
    async fn empty_content_falls_back_to_sentinel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": []
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("sk-ant-test".to_string(), Some(server.uri()));
        let reply = provider.call(&req()).await.unwrap();
        assert_eq!(reply.content(), crate::provider::NO_RESPONSE_SENTINEL);
    }

    #[tokio::test]
    async fn rate_limit_is_parsed_from_retry_after_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3"))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::new("sk-ant-test".to_string(), Some(server.uri()));
        let err = provider.call(&req()).await.unwrap_err();
        match err {
            ProviderError::RateLimited { retry_after_ms } => assert_eq!(retry_after_ms, 3000),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn system_message_is_extracted_only_once() {
        let body = build_request_body(&ChatRequest {
            model: "claude-3-5-sonnet-20241022".to_string(),
            messages: vec![
                Message::new(Role::System, "first"),
                Message::new(Role::User, "hi"),
            ],
            max_tokens: 1000,
        });
        assert_eq!(body["system"], "first");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }
}
