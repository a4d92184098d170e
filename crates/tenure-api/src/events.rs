//! Events reported by host watchers

use serde::{Deserialize, Serialize};
use std::fmt;
use tenure_util::MonotonicInstant;

/// Lifecycle of the external application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    Started,
    Stopped,
}

/// System power-state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerEvent {
    /// The system is about to sleep (or was last seen awake at `at`)
    SleepBegan { at: MonotonicInstant },
    /// The system resumed at `at`
    WokeUp { at: MonotonicInstant },
}

/// Why the engine is being asked to look at the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// The external application was observed starting
    AppStarted,
    /// The renewal timer fired
    RenewalDue,
    /// A retry after NotReady or a failure
    Retry,
    /// A verification timer set after a wake with no usable record
    WakeVerification,
    /// The system woke from sleep
    Wake,
    /// The user asked for a renewal
    Manual,
}

impl Trigger {
    /// Scheduled triggers come from the single renewal timer and bypass debounce
    pub fn is_scheduled(&self) -> bool {
        matches!(
            self,
            Trigger::RenewalDue | Trigger::Retry | Trigger::WakeVerification
        )
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trigger::AppStarted => "app_started",
            Trigger::RenewalDue => "renewal_due",
            Trigger::Retry => "retry",
            Trigger::WakeVerification => "wake_verification",
            Trigger::Wake => "wake",
            Trigger::Manual => "manual",
        };
        f.write_str(s)
    }
}
