//! Usage bookkeeping for per-caller quotas.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-identifier counter within the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageRecord {
    pub count: u32,
    pub last_reset: DateTime<Utc>,
}

impl UsageRecord {
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            last_reset: now,
        }
    }
}

/// Outcome of a check-and-consume call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageDecision {
    pub can_proceed: bool,
    pub remaining_attempts: u32,
}
