//! Per-identifier usage tracker with a fixed reset window.
//!
//! Records are created lazily and reset once more than `window` has passed
//! since their last reset. Check and increment happen under one lock, so
//! concurrent callers can never push a counter past the ceiling.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::Clock;
use crate::models::{UsageDecision, UsageRecord};

/// Counts accepted calls per caller within a window.
pub struct UsageTracker {
    ceiling: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    records: Mutex<HashMap<String, UsageRecord>>,
}

impl UsageTracker {
    pub fn new(ceiling: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ceiling,
            window,
            clock,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    // No mutation below can leave a record half-written, so a poisoned map is still valid.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, UsageRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, record: &UsageRecord, now: DateTime<Utc>) -> bool {
        match (now - record.last_reset).to_std() {
            Ok(elapsed) => elapsed > self.window,
            // Clock moved backwards.
            Err(_) => false,
        }
    }

    /// Consume one attempt for `identifier` if any remain in its window.
    pub fn check_and_consume(&self, identifier: &str) -> UsageDecision {
        let now = self.clock.now();
        let mut records = self.lock();

        let record = records
            .entry(identifier.to_string())
            .or_insert_with(|| UsageRecord::fresh(now));
        if self.is_expired(record, now) {
            *record = UsageRecord::fresh(now);
        }

        if record.count < self.ceiling {
            record.count += 1;
            UsageDecision {
                can_proceed: true,
                remaining_attempts: self.ceiling - record.count,
            }
        } else {
            UsageDecision {
                can_proceed: false,
                remaining_attempts: 0,
            }
        }
    }

    /// Time left until `identifier`'s counter resets; zero when it has no live record.
    pub fn window_remaining(&self, identifier: &str) -> Duration {
        let now = self.clock.now();
        let records = self.lock();

        match records.get(identifier) {
            Some(record) if !self.is_expired(record, now) => {
                let elapsed = (now - record.last_reset).to_std().unwrap_or_default();
                self.window.saturating_sub(elapsed)
            }
            _ => Duration::ZERO,
        }
    }

    /// Drop records whose window has elapsed. Returns how many were dropped.
    pub fn prune_expired(&self) -> usize {
        let now = self.clock.now();
        let mut records = self.lock();

        let before = records.len();
        records.retain(|_, record| !self.is_expired(record, now));
        before - records.len()
    }

    /// Number of identifiers currently tracked.
    pub fn tracked(&self) -> usize {
        self.lock().len()
    }
}
