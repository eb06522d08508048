use chrono::{NaiveDate, Utc};

/// Milliseconds since the Unix epoch, UTC. Used for all stored timestamps
/// (`created_at`, `last_call_at`, `MemoryEntry::timestamp`).
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Today's calendar date, UTC (see DESIGN.md Open Question 1: the gateway
/// resolves day-rollover against UTC rather than a per-identity locale).
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
