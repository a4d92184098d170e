//! Session expiry arithmetic

use std::time::Duration;
use tenure_config::RenewalPolicy;
use tenure_util::{duration_secs, MonotonicInstant};

/// When the next renewal should happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshDelay {
    /// Renew after this long (zero means now)
    After(Duration),
    /// The session has already lapsed
    Expired,
}

/// Seconds left in the session window. Negative once it has lapsed.
pub fn remaining_time(start: MonotonicInstant, now: MonotonicInstant, duration: Duration) -> i64 {
    duration_secs(duration).saturating_sub(now.secs_since(start))
}

/// A session is valid while strictly positive time remains.
pub fn is_session_valid(start: MonotonicInstant, now: MonotonicInstant, duration: Duration) -> bool {
    remaining_time(start, now, duration) > 0
}

/// Delay until the renewal lead window opens.
pub fn calculate_refresh_delay(
    start: MonotonicInstant,
    now: MonotonicInstant,
    policy: &RenewalPolicy,
) -> RefreshDelay {
    let remaining = remaining_time(start, now, policy.session_duration);
    if remaining <= 0 {
        return RefreshDelay::Expired;
    }

    let lead = duration_secs(policy.renew_before_expiry);
    if remaining <= lead {
        RefreshDelay::After(Duration::ZERO)
    } else {
        RefreshDelay::After(Duration::from_secs((remaining - lead) as u64))
    }
}
