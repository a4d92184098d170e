//! Session state

use std::fmt;
use std::time::Duration;
use tenure_api::PersistedRecord;
use tenure_config::RenewalPolicy;
use tenure_util::{MonotonicInstant, SessionId, WallTime};

use crate::{calculate_refresh_delay, is_session_valid, remaining_time, serialize, RefreshDelay};

/// Where the engine is in the renewal cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The application is not running
    Inactive,
    /// The toggle action has been requested and its result is pending
    AwaitingAction,
    /// A confirmed session exists and a renewal is scheduled
    Active,
    /// Session state came from disk, survived a sleep, or the last toggle
    /// did not succeed. Not yet confirmed.
    Stale,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Inactive => "inactive",
            Phase::AwaitingAction => "awaiting_action",
            Phase::Active => "active",
            Phase::Stale => "stale",
        };
        f.write_str(s)
    }
}

/// The one private-mode window being kept alive.
///
/// `start_mono` drives all arithmetic; `start_wall` is only written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub session_id: SessionId,
    pub start_mono: MonotonicInstant,
    pub start_wall: WallTime,
}

impl SessionState {
    pub fn new(session_id: SessionId, start_mono: MonotonicInstant, start_wall: WallTime) -> Self {
        Self {
            session_id,
            start_mono,
            start_wall,
        }
    }

    pub fn remaining(&self, now: MonotonicInstant, duration: Duration) -> i64 {
        remaining_time(self.start_mono, now, duration)
    }

    pub fn is_valid(&self, now: MonotonicInstant, duration: Duration) -> bool {
        is_session_valid(self.start_mono, now, duration)
    }

    pub fn refresh_delay(&self, now: MonotonicInstant, policy: &RenewalPolicy) -> RefreshDelay {
        calculate_refresh_delay(self.start_mono, now, policy)
    }

    pub fn to_record(&self, now: WallTime) -> Option<PersistedRecord> {
        serialize(Some(self.start_wall), now)
    }
}
