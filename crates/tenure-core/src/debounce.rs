//! Suppression of re-entrant triggers

use std::time::Duration;
use tenure_util::{duration_secs, MonotonicInstant};

/// Whether a trigger at `now` falls inside the debounce window opened by
/// `last_check`. The boundary itself is not debounced.
pub fn should_debounce(
    last_check: Option<MonotonicInstant>,
    now: MonotonicInstant,
    interval: Duration,
) -> bool {
    match last_check {
        None => false,
        Some(last) => now.secs_since(last) < duration_secs(interval),
    }
}

/// Time of the last trigger that was actually processed
#[derive(Debug, Clone, Copy, Default)]
pub struct DebounceContext {
    last_check: Option<MonotonicInstant>,
}

impl DebounceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_check(&self) -> Option<MonotonicInstant> {
        self.last_check
    }

    /// Returns true if the trigger should be processed, and if so records
    /// `now` as the new reference point. Debounced triggers leave the
    /// context untouched.
    pub fn admit(&mut self, now: MonotonicInstant, interval: Duration) -> bool {
        if should_debounce(self.last_check, now, interval) {
            return false;
        }
        self.last_check = Some(now);
        true
    }

    /// Record a processed trigger that does not go through the gate
    pub fn record(&mut self, now: MonotonicInstant) {
        self.last_check = Some(now);
    }

    pub fn reset(&mut self) {
        self.last_check = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE: Duration = Duration::from_secs(5);

    fn at(secs: i64) -> MonotonicInstant {
        MonotonicInstant::from_secs(secs)
    }

    #[test]
    fn test_should_debounce() {
        assert!(!should_debounce(None, at(1000), FIVE));
        assert!(should_debounce(Some(at(1000)), at(1003), FIVE));
        assert!(!should_debounce(Some(at(1000)), at(1010), FIVE));
        assert!(!should_debounce(Some(at(1000)), at(1005), FIVE));
    }

    #[test]
    fn test_admit_only_moves_on_processed_triggers() {
        let mut ctx = DebounceContext::new();
        assert!(ctx.admit(at(1000), FIVE));
        assert_eq!(ctx.last_check(), Some(at(1000)));

        // Debounced: window stays anchored at 1000
        assert!(!ctx.admit(at(1003), FIVE));
        assert_eq!(ctx.last_check(), Some(at(1000)));

        assert!(ctx.admit(at(1005), FIVE));
        assert_eq!(ctx.last_check(), Some(at(1005)));
    }

    #[test]
    fn test_reset() {
        let mut ctx = DebounceContext::new();
        ctx.record(at(1000));
        ctx.reset();
        assert!(ctx.admit(at(1001), FIVE));
    }
}
