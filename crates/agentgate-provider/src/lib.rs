pub mod anthropic;
pub mod openai;
pub mod provider;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use provider::{
    default_model, ChatRequest, ChatResponse, LlmProvider, Message, NormalizedReply,
    ProviderError, Role, DEFAULT_MAX_TOKENS, NO_RESPONSE_SENTINEL,
};
