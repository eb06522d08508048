use serde::{Deserialize, Serialize};

/// Subscription class. Determines memory ring capacity and rate/quota limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Pro,
    Team,
    Enterprise,
}

impl Tier {
    /// Memory ring capacity. `None` means unbounded (enterprise — no eviction).
    pub fn memory_capacity(&self) -> Option<usize> {
        match self {
            Tier::Free => Some(5),
            Tier::Pro => Some(100),
            Tier::Team => Some(1000),
            Tier::Enterprise => None,
        }
    }

    /// Per-minute sliding-window admission limit. `None` means unbounded.
    pub fn per_minute_limit(&self) -> Option<u32> {
        match self {
            Tier::Free => Some(10),
            Tier::Pro => Some(60),
            Tier::Team => Some(300),
            Tier::Enterprise => None,
        }
    }

    /// Per-calendar-day admission limit. `None` means unbounded.
    pub fn daily_limit(&self) -> Option<u32> {
        match self {
            Tier::Free => Some(100),
            Tier::Pro => Some(10_000),
            Tier::Team => Some(100_000),
            Tier::Enterprise => None,
        }
    }

    /// [`Self::memory_capacity`], substituting the operator's config-file
    /// override when one is present for this tier.
    pub fn effective_memory_capacity(&self, limits: &crate::config::LimitsConfig) -> Option<usize> {
        match limits.override_for(*self).and_then(|o| o.memory_capacity) {
            Some(capacity) => Some(capacity),
            None => self.memory_capacity(),
        }
    }

    /// [`Self::per_minute_limit`], substituting the operator's config-file
    /// override when one is present for this tier.
    pub fn effective_per_minute_limit(&self, limits: &crate::config::LimitsConfig) -> Option<u32> {
        match limits.override_for(*self).and_then(|o| o.per_minute) {
            Some(limit) => Some(limit),
            None => self.per_minute_limit(),
        }
    }

    /// [`Self::daily_limit`], substituting the operator's config-file
    /// override when one is present for this tier.
    pub fn effective_daily_limit(&self, limits: &crate::config::LimitsConfig) -> Option<u32> {
        match limits.override_for(*self).and_then(|o| o.per_day) {
            Some(limit) => Some(limit),
            None => self.daily_limit(),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Free => write!(f, "free"),
            Tier::Pro => write!(f, "pro"),
            Tier::Team => write!(f, "team"),
            Tier::Enterprise => write!(f, "enterprise"),
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            "team" => Ok(Tier::Team),
            "enterprise" => Ok(Tier::Enterprise),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}
