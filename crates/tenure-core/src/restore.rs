//! Evaluation of sessions restored from disk

use std::time::Duration;
use tenure_config::RenewalPolicy;
use tenure_util::duration_secs;

/// Whether a restored session has enough headroom to trust without
/// re-running the toggle action. Restored sessions already inside the
/// renewal lead window are not usable.
pub fn is_restored_state_usable(elapsed: Option<i64>, policy: &RenewalPolicy) -> bool {
    match elapsed {
        None => false,
        Some(elapsed) => {
            let remaining = duration_secs(policy.session_duration).saturating_sub(elapsed);
            remaining > duration_secs(policy.renew_before_expiry)
        }
    }
}

/// Renewal delay for a restored session, floored at zero.
pub fn refresh_delay_for_restored_state(elapsed: i64, policy: &RenewalPolicy) -> Duration {
    let remaining = duration_secs(policy.session_duration).saturating_sub(elapsed);
    let delay = remaining.saturating_sub(duration_secs(policy.renew_before_expiry));
    Duration::from_secs(delay.max(0) as u64)
}
