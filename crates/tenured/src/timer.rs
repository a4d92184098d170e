//! The single renewal timer

use std::time::Duration;
use tenure_core::TimerPurpose;
use tokio::time::Instant;
use tracing::debug;

/// One cancellable deadline. Arming replaces whatever was pending.
#[derive(Debug, Default)]
pub struct RenewalTimer {
    slot: Option<(Instant, TimerPurpose)>,
}

impl RenewalTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, purpose: TimerPurpose, delay: Duration) {
        debug!(%purpose, delay_secs = delay.as_secs(), "Timer armed");
        self.slot = Some((Instant::now() + delay, purpose));
    }

    pub fn cancel(&mut self) {
        if let Some((_, purpose)) = self.slot.take() {
            debug!(%purpose, "Timer cancelled");
        }
    }

    pub fn purpose(&self) -> Option<TimerPurpose> {
        self.slot.map(|(_, purpose)| purpose)
    }

    pub fn is_armed(&self) -> bool {
        self.slot.is_some()
    }

    /// Resolves when the armed deadline passes, disarming the timer.
    /// Never resolves while disarmed. Safe to drop mid-wait.
    pub async fn fired(&mut self) -> TimerPurpose {
        match self.slot {
            Some((deadline, purpose)) => {
                tokio::time::sleep_until(deadline).await;
                self.slot = None;
                purpose
            }
            None => std::future::pending().await,
        }
    }
}
