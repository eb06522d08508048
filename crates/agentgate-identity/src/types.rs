use agentgate_core::Tier;
use agentgate_memory::{ring, MemoryEntry, Role};
use serde::{Deserialize, Serialize};

/// Trust/contradiction fields are reserved for future behavior; the core
/// never writes to them beyond their initial default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Traits {
    pub sentiment: f64,
    pub trust_score: f64,
    pub contradictions: u32,
}

impl Default for Traits {
    fn default() -> Self {
        Self {
            sentiment: 0.0,
            trust_score: 0.5,
            contradictions: 0,
        }
    }
}

/// The gateway's persistent record for one upstream-key holder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Short opaque handle, distinct from the fingerprint so it can appear
    /// in client-facing responses without ambiguity.
    pub id: String,
    /// Primary key: the key's fingerprint, never the raw key.
    pub fingerprint: String,
    pub display_name: String,
    pub tier: Tier,
    pub created_at: i64,
    pub calls_today: u32,
    pub calls_total: u64,
    pub last_call_at: Option<i64>,
    /// `YYYY-MM-DD`, used for day-rollover detection alongside `calls_today`.
    pub last_call_date: Option<String>,
    pub memory: Vec<MemoryEntry>,
    pub traits: Traits,
    pub billing_customer_id: Option<String>,
}

impl Identity {
    pub fn new(fingerprint: impl Into<String>, id: impl Into<String>, now_ms: i64) -> Self {
        let id = id.into();
        Self {
            display_name: format!("user-{}", &id[..id.len().min(8)]),
            id,
            fingerprint: fingerprint.into(),
            tier: Tier::default(),
            created_at: now_ms,
            calls_today: 0,
            calls_total: 0,
            last_call_at: None,
            last_call_date: None,
            memory: Vec::new(),
            traits: Traits::default(),
            billing_customer_id: None,
        }
    }

    /// Append the user/assistant turn pair and advance the call counters and
    /// day-rollover bookkeeping, in the order the contract requires: memory
    /// first, then counters, then the rollover-aware date fields. Pure
    /// mutation — callers are responsible for persisting the result under
    /// whatever locking discipline their store requires.
    pub fn record_successful_call(
        &mut self,
        memory_capacity: Option<usize>,
        user_content: &str,
        assistant_content: &str,
        sentiment: f64,
        today_str: &str,
        now_ms: i64,
    ) {
        ring::append_with_capacity(&mut self.memory, memory_capacity, Role::User, user_content, now_ms);
        ring::append_with_capacity(
            &mut self.memory,
            memory_capacity,
            Role::Assistant,
            assistant_content,
            now_ms,
        );

        let rolled_over = self.last_call_date.as_deref() != Some(today_str);
        self.calls_today = if rolled_over { 1 } else { self.calls_today + 1 };
        self.calls_total += 1;
        self.last_call_at = Some(now_ms);
        self.last_call_date = Some(today_str.to_string());
        self.traits.sentiment = sentiment;
    }
}

/// Public projection returned to clients in the chat response (§4.6 step 9)
/// and to the admin surface — never the fingerprint, never memory contents.
#[derive(Debug, Clone, Serialize)]
pub struct IdentityProjection {
    pub id: String,
    pub display_name: String,
    pub tier: Tier,
    pub created_at: i64,
    pub calls_today: u32,
    pub calls_total: u64,
    pub memory_size: usize,
    pub sentiment: f64,
}

/// The three `Traits` fields, as surfaced to the admin lookup. `sentiment`
/// is rounded the same way as `IdentityProjection::sentiment`;
/// `trust_score`/`contradictions` are passed through verbatim — reserved
/// fields the core never mutates beyond their defaults.
#[derive(Debug, Clone, Serialize)]
pub struct TraitsProjection {
    pub sentiment: f64,
    pub trust_score: f64,
    pub contradictions: u32,
}

impl From<&Traits> for TraitsProjection {
    fn from(traits: &Traits) -> Self {
        Self {
            sentiment: (traits.sentiment * 100.0).round() / 100.0,
            trust_score: traits.trust_score,
            contradictions: traits.contradictions,
        }
    }
}

/// Admin-surface identity lookup (§4.7): the same public fields as
/// `IdentityProjection`, plus the full `traits` struct — §4.7 asks for
/// "traits" on this endpoint specifically, where the chat response only
/// wants `sentiment`.
#[derive(Debug, Clone, Serialize)]
pub struct IdentityAdminProjection {
    pub id: String,
    pub display_name: String,
    pub tier: Tier,
    pub created_at: i64,
    pub calls_today: u32,
    pub calls_total: u64,
    pub memory_size: usize,
    pub traits: TraitsProjection,
}

impl From<&Identity> for IdentityAdminProjection {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            display_name: identity.display_name.clone(),
            tier: identity.tier,
            created_at: identity.created_at,
            calls_today: identity.calls_today,
            calls_total: identity.calls_total,
            memory_size: identity.memory.len(),
            traits: TraitsProjection::from(&identity.traits),
        }
    }
}

impl From<&Identity> for IdentityProjection {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.clone(),
            display_name: identity.display_name.clone(),
            tier: identity.tier,
            created_at: identity.created_at,
            calls_today: identity.calls_today,
            calls_total: identity.calls_total,
            memory_size: identity.memory.len(),
            sentiment: (identity.traits.sentiment * 100.0).round() / 100.0,
        }
    }
}
