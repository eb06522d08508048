//! The chat request pipeline: resolve -> admit -> build -> call -> record -> respond.

use serde::Serialize;

use agentgate_core::time;
use agentgate_identity::types::IdentityProjection;
use agentgate_identity::Identity;
use agentgate_memory::{ring, MemoryEntry, Role as MemoryRole, SentimentScorer};
use agentgate_provider::{
    default_model, AnthropicProvider, ChatRequest, LlmProvider, Message as ProviderMessage,
    NormalizedReply, OpenAiProvider, Role as ProviderRole, DEFAULT_MAX_TOKENS,
};

use crate::app::AppState;
use crate::error::GatewayError;

const SIX_RECENT_MEMORY_ENTRIES: usize = 6;

#[derive(Debug, Serialize)]
pub struct ChatOutcome {
    pub response: String,
    pub identity: IdentityProjection,
}

/// Run the full chat pipeline for one incoming request.
pub async fn handle_chat(
    state: &AppState,
    key: &str,
    provider_name: &str,
    message: &str,
    model: Option<&str>,
) -> Result<ChatOutcome, GatewayError> {
    if key.is_empty() {
        return Err(GatewayError::AuthMissing);
    }
    if message.trim().is_empty() {
        return Err(GatewayError::ValidationError);
    }

    // ── 1. Resolve ──────────────────────────────────────────────────────
    let fp = state.identities.fingerprint(key);
    let (mut identity, _created) = state.identities.resolve_or_create(&fp)?;

    // ── 2. Admit ────────────────────────────────────────────────────────
    let now_ms = time::now_ms();
    let today = time::today();
    state
        .rate_limiter
        .admit(&identity, &state.config.limits, today, now_ms)
        .map_err(|rejection| GatewayError::RateRejected(rejection, state.config.upgrade_url.clone()))?;

    // ── 3. Score & update EWMA (deferred: only persisted on success) ───
    let sample = state.sentiment.score(message);
    let updated_sentiment = SentimentScorer::ewma_update(identity.traits.sentiment, sample);

    // ── 4. Compose system prompt ────────────────────────────────────────
    let system_prompt = build_system_prompt(&identity, updated_sentiment);

    // ── 5. Assemble messages ────────────────────────────────────────────
    let recent: Vec<ProviderMessage> = ring::recent(&identity.memory, SIX_RECENT_MEMORY_ENTRIES)
        .iter()
        .map(to_provider_message)
        .collect();

    let mut messages = Vec::with_capacity(recent.len() + 2);
    messages.push(ProviderMessage::new(ProviderRole::System, system_prompt));
    messages.extend(recent);
    messages.push(ProviderMessage::new(ProviderRole::User, message));

    let model = model
        .map(str::to_string)
        .unwrap_or_else(|| default_model(provider_name).to_string());

    let request = ChatRequest {
        model,
        messages,
        max_tokens: DEFAULT_MAX_TOKENS,
    };

    // ── 6. Call upstream ─────────────────────────────────────────────────
    let provider = build_provider(state, provider_name, key);
    let reply: NormalizedReply = provider.call(&request).await?;

    // ── 7. Extract reply ────────────────────────────────────────────────
    let reply_text = reply.content().to_string();

    // ── 8. Record ────────────────────────────────────────────────────────
    // Re-reads the row under the store's write lock rather than writing back
    // the `identity` snapshot taken before the upstream `await` above — see
    // `IdentityStore::record_successful_call` for why that matters under
    // concurrent requests for the same fingerprint.
    let capacity = identity.tier.effective_memory_capacity(&state.config.limits);
    let today_str = today.format("%Y-%m-%d").to_string();
    let identity = state.identities.record_successful_call(
        &fp,
        capacity,
        message,
        &reply_text,
        updated_sentiment,
        &today_str,
        now_ms,
    )?;

    // ── 9. Respond ───────────────────────────────────────────────────────
    Ok(ChatOutcome {
        response: reply_text,
        identity: IdentityProjection::from(&identity),
    })
}

fn build_provider(state: &AppState, provider_name: &str, key: &str) -> Box<dyn LlmProvider> {
    match provider_name {
        "anthropic" => Box::new(AnthropicProvider::new(
            key.to_string(),
            state.config.anthropic_base_url.clone(),
        )),
        _ => Box::new(OpenAiProvider::new(
            key.to_string(),
            state.config.openai_base_url.clone(),
        )),
    }
}

fn to_provider_message(entry: &MemoryEntry) -> ProviderMessage {
    let role = match entry.role {
        MemoryRole::User => ProviderRole::User,
        MemoryRole::Assistant => ProviderRole::Assistant,
    };
    ProviderMessage::new(role, entry.content.clone())
}

/// Fixed template: display name, trust score, tone label, interaction count,
/// and the character-capped context window, ending with a stable sentence
/// claiming continuity with past interactions.
fn build_system_prompt(identity: &Identity, sentiment: f64) -> String {
    let tone = tone_label(sentiment);
    let context = ring::context_window(&identity.memory, ring::DEFAULT_CONTEXT_CHARS);
    format!(
        "You are a helpful assistant speaking with {name}. Their trust score is {trust:.2}. \
         Their recent tone has been {tone}. You have exchanged {count} messages with them so far.\n\
         Recent conversation:\n{context}\n\
         Continue this conversation naturally, as if you remember everything that came before.",
        name = identity.display_name,
        trust = identity.traits.trust_score,
        tone = tone,
        count = identity.calls_total,
        context = context,
    )
}

fn tone_label(sentiment: f64) -> &'static str {
    if sentiment > 0.3 {
        "positive"
    } else if sentiment < -0.3 {
        "concerned"
    } else {
        "neutral"
    }
}
