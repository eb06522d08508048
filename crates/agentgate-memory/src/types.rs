use serde::{Deserialize, Serialize};

/// The two roles a retained conversational turn can have. Unlike the
/// provider-facing message role, memory entries never carry `system` — the
/// system prompt is synthesized fresh on every request, never retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn retained for context. `content` is truncated to at most 500
/// characters at construction time — the truncation happens once, at the
/// point of insertion into the ring, never again on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub role: Role,
    pub content: String,
    /// ms since epoch.
    pub timestamp: i64,
}

/// Storage truncation: memory entries keep at most this many characters.
/// The orchestrator still forwards the *full* message to the upstream
/// provider — this limit applies only to what's retained for future context.
pub const MAX_ENTRY_CHARS: usize = 500;

impl MemoryEntry {
    pub fn new(role: Role, content: &str, timestamp: i64) -> Self {
        Self {
            role,
            content: truncate_chars(content, MAX_ENTRY_CHARS),
            timestamp,
        }
    }
}

/// Truncate `s` to at most `max_chars` *characters* (not bytes), respecting
/// UTF-8 boundaries.
pub(crate) fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
