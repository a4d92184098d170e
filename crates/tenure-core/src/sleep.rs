//! Sleep interval classification

use std::time::Duration;
use tenure_util::{duration_secs, MonotonicInstant};

/// Seconds between sleep entry and wake, if sleep entry was observed.
pub fn sleep_duration(sleep_start: Option<MonotonicInstant>, wake: MonotonicInstant) -> Option<i64> {
    sleep_start.map(|start| wake.secs_since(start))
}

/// A sleep is short when it was observed and lasted less than `threshold`.
pub fn is_short_sleep(
    sleep_start: Option<MonotonicInstant>,
    wake: MonotonicInstant,
    threshold: Duration,
) -> bool {
    match sleep_duration(sleep_start, wake) {
        None => false,
        Some(slept) => slept < duration_secs(threshold),
    }
}

/// Pending sleep entry, consumed by the next wake
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepInterval {
    sleep_start: Option<MonotonicInstant>,
}

impl SleepInterval {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, at: MonotonicInstant) {
        self.sleep_start = Some(at);
    }

    /// Hand out the recorded sleep entry and forget it.
    pub fn take_on_wake(&mut self) -> Option<MonotonicInstant> {
        self.sleep_start.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: Duration = Duration::from_secs(300);

    fn at(secs: i64) -> MonotonicInstant {
        MonotonicInstant::from_secs(secs)
    }

    #[test]
    fn test_is_short_sleep() {
        assert!(is_short_sleep(Some(at(1000)), at(1060), THRESHOLD));
        assert!(!is_short_sleep(Some(at(1000)), at(1600), THRESHOLD));
        assert!(!is_short_sleep(Some(at(1000)), at(1300), THRESHOLD));
        assert!(!is_short_sleep(None, at(1060), THRESHOLD));
    }

    #[test]
    fn test_sleep_duration() {
        assert_eq!(sleep_duration(Some(at(1000)), at(1600)), Some(600));
        assert_eq!(sleep_duration(None, at(1600)), None);
    }

    #[test]
    fn test_interval_consumed_once() {
        let mut interval = SleepInterval::new();
        interval.begin(at(1000));
        interval.begin(at(1200));

        assert_eq!(interval.take_on_wake(), Some(at(1200)));
        assert_eq!(interval.take_on_wake(), None);
    }
}
