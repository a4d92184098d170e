//! Suspend/resume detection
//!
//! `CLOCK_BOOTTIME` keeps counting while the system is suspended and
//! `CLOCK_MONOTONIC` does not, so the gap between them grows by exactly the
//! time spent asleep. Polling that gap detects a suspend after the fact,
//! without a logind connection.

use nix::time::{clock_gettime, ClockId};
use std::time::Duration;
use tenure_api::PowerEvent;
use tenure_host_api::HostEvent;
use tenure_util::{duration_secs, MonotonicInstant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Gap growth below this is clock jitter, not a suspend.
pub const MIN_SUSPEND_SECS: i64 = 2;

/// Seconds the system has spent suspended since boot
pub fn suspended_secs() -> Option<i64> {
    let boot = clock_gettime(ClockId::CLOCK_BOOTTIME).ok()?;
    let mono = clock_gettime(ClockId::CLOCK_MONOTONIC).ok()?;
    Some(i64::from(boot.tv_sec()) - i64::from(mono.tv_sec()))
}

/// Compare two readings of the suspended-time counter. On a suspend,
/// returns the `(sleep, wake)` pair on the boot clock.
pub fn detect_suspend(
    previous_suspended: i64,
    current_suspended: i64,
    now: MonotonicInstant,
) -> Option<(MonotonicInstant, MonotonicInstant)> {
    let slept = current_suspended - previous_suspended;
    if slept < MIN_SUSPEND_SECS {
        return None;
    }
    Some((MonotonicInstant::from_secs(now.as_secs() - slept), now))
}

/// Polls the suspended-time counter and reports sleep/wake pairs.
#[derive(Debug, Clone)]
pub struct SuspendMonitor {
    poll_interval: Duration,
}

impl SuspendMonitor {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Runs until the receiving side goes away.
    pub async fn run(self, event_tx: mpsc::UnboundedSender<HostEvent>) {
        let Some(mut previous) = suspended_secs() else {
            warn!("Boot clock unavailable, sleep detection disabled");
            return;
        };

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            poll_secs = duration_secs(self.poll_interval),
            "Suspend monitor started"
        );

        loop {
            interval.tick().await;

            let Some(current) = suspended_secs() else {
                continue;
            };

            if let Some((sleep_at, wake_at)) = detect_suspend(previous, current, MonotonicInstant::now()) {
                info!(
                    slept_secs = wake_at.secs_since(sleep_at),
                    "Resume from suspend detected"
                );

                let sent = event_tx
                    .send(HostEvent::Power(PowerEvent::SleepBegan { at: sleep_at }))
                    .and_then(|_| event_tx.send(HostEvent::Power(PowerEvent::WokeUp { at: wake_at })));
                if sent.is_err() {
                    debug!("Event receiver dropped, suspend monitor exiting");
                    break;
                }
            }
            previous = current;
        }
    }
}
