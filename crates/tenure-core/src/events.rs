//! Core events emitted by the engine

use std::fmt;
use std::time::Duration;
use tenure_api::{Notification, StatusUpdate, Trigger};

/// What the single renewal timer is armed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPurpose {
    Renewal,
    Retry,
    WakeVerification,
}

impl TimerPurpose {
    pub fn trigger(&self) -> Trigger {
        match self {
            TimerPurpose::Renewal => Trigger::RenewalDue,
            TimerPurpose::Retry => Trigger::Retry,
            TimerPurpose::WakeVerification => Trigger::WakeVerification,
        }
    }
}

impl fmt::Display for TimerPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimerPurpose::Renewal => "renewal",
            TimerPurpose::Retry => "retry",
            TimerPurpose::WakeVerification => "wake_verification",
        };
        f.write_str(s)
    }
}

/// Instructions for the service, in the order they should be applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// Run the toggle action now and report back with its outcome
    ToggleRequested { trigger: Trigger },

    /// Replace any pending timer with one firing after `delay`
    TimerScheduled {
        purpose: TimerPurpose,
        delay: Duration,
    },

    /// Drop any pending timer
    TimerCancelled,

    /// Presentation status changed
    StatusChanged(StatusUpdate),

    /// Show a notification to the user
    Notify(Notification),
}
