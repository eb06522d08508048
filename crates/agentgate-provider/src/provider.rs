use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Sentinel substituted when a provider response is missing assistant
/// content. Applied once in `normalize` (C5) and defensively again when the
/// orchestrator (C6) extracts the reply text, so the pipeline always has
/// something to append to memory instead of hard-failing.
pub const NO_RESPONSE_SENTINEL: &str = "No response";

/// Default upstream request budget when the caller doesn't override it.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

pub fn default_model(provider: &str) -> &'static str {
    match provider {
        "anthropic" => "claude-3-5-sonnet-20241022",
        _ => "gpt-4",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in the conversation sent to an upstream provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Request to an upstream LLM provider, dialect-agnostic.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
}

/// OpenAI-shaped normalized reply, used internally regardless of which
/// upstream dialect actually answered the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedReply {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub role: String,
    pub content: String,
}

impl NormalizedReply {
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                message: ResponseMessage {
                    role: "assistant".to_string(),
                    content: content.into(),
                },
            }],
        }
    }

    /// Extract the first choice's assistant content, falling back to the
    /// sentinel if the reply has no choices at all.
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or(NO_RESPONSE_SENTINEL)
    }
}

/// Alias kept separate from `NormalizedReply` at the call boundary so a
/// provider implementation's internal response type (pre-normalization)
/// never leaks past `LlmProvider::call`.
pub type ChatResponse = NormalizedReply;

/// Common interface for both upstream dialects (OpenAI-chat, Anthropic-messages).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name, used in logs and error messages.
    fn name(&self) -> &str;

    /// Send a request and return a normalized, OpenAI-shaped reply.
    async fn call(&self, req: &ChatRequest) -> Result<NormalizedReply, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("response parse error: {0}")]
    Parse(String),

    #[error("rate limited by upstream, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
}
