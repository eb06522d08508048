//! Two-axis admission control: per-day quota (Axis A, carried on the
//! `Identity` record) and per-minute sliding window (Axis B, process-local
//! and intentionally non-durable — it resets on restart).

use std::collections::VecDeque;

use agentgate_core::config::LimitsConfig;
use agentgate_core::Tier;
use chrono::NaiveDate;
use dashmap::DashMap;
use tracing::instrument;

use crate::types::Identity;

const WINDOW_MS: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    DailyExhausted,
    RateExceeded,
}

#[derive(Debug, Clone)]
pub struct Rejection {
    pub reason: RejectReason,
    pub tier: Tier,
}

impl Rejection {
    pub fn reset_hint(&self) -> &'static str {
        match self.reason {
            RejectReason::DailyExhausted => "tomorrow",
            RejectReason::RateExceeded => "1 minute",
        }
    }
}

/// Holds only the per-minute sliding windows; the daily axis lives on the
/// `Identity` record itself and is read (never mutated) here.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: DashMap<String, VecDeque<i64>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `calls_today` to use for this decision: zero if a day rollover is
    /// pending (the identity's last recorded call was on a different date).
    pub fn effective_calls_today(identity: &Identity, today: NaiveDate) -> u32 {
        let today_str = today.format("%Y-%m-%d").to_string();
        if identity.last_call_date.as_deref() == Some(today_str.as_str()) {
            identity.calls_today
        } else {
            0
        }
    }

    /// Check both axes and, if admitted, record the per-minute timestamp.
    /// Does not mutate `identity` — the daily counter increment and its
    /// rollover reset are committed by the orchestrator on successful
    /// completion, together with the memory append. `limits` carries any
    /// operator-configured per-tier overrides; absent a matching override,
    /// the tier's fixed defaults apply.
    #[instrument(skip(self, limits), fields(fingerprint = %identity.fingerprint, tier = %identity.tier))]
    pub fn admit(
        &self,
        identity: &Identity,
        limits: &LimitsConfig,
        today: NaiveDate,
        now_ms: i64,
    ) -> Result<(), Rejection> {
        let tier = identity.tier;

        if let Some(limit) = tier.effective_daily_limit(limits) {
            let calls_today = Self::effective_calls_today(identity, today);
            if calls_today >= limit {
                return Err(Rejection {
                    reason: RejectReason::DailyExhausted,
                    tier,
                });
            }
        }

        if let Some(limit) = tier.effective_per_minute_limit(limits) {
            let mut window = self.windows.entry(identity.fingerprint.clone()).or_default();
            window.retain(|&ts| ts > now_ms - WINDOW_MS);
            if window.len() as u32 >= limit {
                return Err(Rejection {
                    reason: RejectReason::RateExceeded,
                    tier,
                });
            }
            window.push_back(now_ms);
        }

        Ok(())
    }
}
