//! Bounded per-identity memory ring: FIFO of conversational turns, capacity
//! determined by tier, with a character-capped context window for prompt
//! injection.

use agentgate_core::Tier;

use crate::types::{MemoryEntry, Role};

/// Default character cap used by `context_window` when callers don't
/// override it.
pub const DEFAULT_CONTEXT_CHARS: usize = 2000;

/// Number of most-recent entries considered when building a context window.
const CONTEXT_WINDOW_ENTRIES: usize = 10;

/// Push a new entry to the tail of `memory`, then evict from the head while
/// the ring exceeds `tier`'s fixed capacity. Enterprise tier has no capacity
/// and therefore never evicts.
pub fn append(memory: &mut Vec<MemoryEntry>, tier: Tier, role: Role, content: &str, now_ms: i64) {
    append_with_capacity(memory, tier.memory_capacity(), role, content, now_ms);
}

/// Same as [`append`], but with an explicit capacity — used when an
/// operator-configured override replaces the tier's fixed default.
pub fn append_with_capacity(
    memory: &mut Vec<MemoryEntry>,
    capacity: Option<usize>,
    role: Role,
    content: &str,
    now_ms: i64,
) {
    memory.push(MemoryEntry::new(role, content, now_ms));
    if let Some(capacity) = capacity {
        while memory.len() > capacity {
            memory.remove(0);
        }
    }
}

/// Concatenate the last `CONTEXT_WINDOW_ENTRIES` entries (or fewer if the
/// ring is shorter), in order, as lines `"[role]: content\n"`, then take the
/// last `max_chars` *characters* of the resulting string. The truncation is
/// a tail cut by character count, not a drop of whole lines.
pub fn context_window(memory: &[MemoryEntry], max_chars: usize) -> String {
    let start = memory.len().saturating_sub(CONTEXT_WINDOW_ENTRIES);
    let mut rendered = String::new();
    for entry in &memory[start..] {
        rendered.push_str(&format!("[{}]: {}\n", entry.role, entry.content));
    }
    tail_chars(&rendered, max_chars)
}

/// The last `n` entries, oldest-first.
pub fn recent(memory: &[MemoryEntry], n: usize) -> &[MemoryEntry] {
    let start = memory.len().saturating_sub(n);
    &memory[start..]
}

fn tail_chars(s: &str, max_chars: usize) -> String {
    let total = s.chars().count();
    if total <= max_chars {
        return s.to_string();
    }
    s.chars().skip(total - max_chars).collect()
}
