//! Mock host adapter for testing

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tenure_api::{AppEvent, Notification, PowerEvent, StatusUpdate, ToggleOutcome};
use tokio::sync::mpsc;

use crate::{HostAdapter, HostError, HostEvent, HostResult, StatusSink};

/// Mock host adapter for unit/integration testing
///
/// Toggle outcomes are scripted; once the script runs out every toggle
/// reports `Enabled`. Status updates and notifications are recorded.
pub struct MockHost {
    event_tx: mpsc::UnboundedSender<HostEvent>,
    event_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<HostEvent>>>>,

    outcomes: Arc<Mutex<VecDeque<ToggleOutcome>>>,
    toggle_count: Arc<Mutex<usize>>,
    statuses: Arc<Mutex<Vec<StatusUpdate>>>,
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl MockHost {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            event_tx: tx,
            event_rx: Arc::new(Mutex::new(Some(rx))),
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            toggle_count: Arc::new(Mutex::new(0)),
            statuses: Arc::new(Mutex::new(Vec::new())),
            notifications: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue the outcome of a future toggle
    pub fn push_outcome(&self, outcome: ToggleOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    /// Number of times the toggle action ran
    pub fn toggle_count(&self) -> usize {
        *self.toggle_count.lock().unwrap()
    }

    pub fn statuses(&self) -> Vec<StatusUpdate> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    /// Simulate the watched application starting or stopping
    pub fn simulate_app(&self, event: AppEvent) {
        let _ = self.event_tx.send(HostEvent::App(event));
    }

    /// Simulate a sleep or wake
    pub fn simulate_power(&self, event: PowerEvent) {
        let _ = self.event_tx.send(HostEvent::Power(event));
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostAdapter for MockHost {
    async fn toggle(&self) -> ToggleOutcome {
        *self.toggle_count.lock().unwrap() += 1;
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ToggleOutcome::Enabled)
    }

    fn subscribe(&self) -> HostResult<mpsc::UnboundedReceiver<HostEvent>> {
        self.event_rx
            .lock()
            .map_err(|_| HostError::Internal("event receiver lock poisoned".into()))?
            .take()
            .ok_or(HostError::AlreadySubscribed)
    }
}

impl StatusSink for MockHost {
    fn show_status(&self, status: &StatusUpdate) {
        self.statuses.lock().unwrap().push(status.clone());
    }

    fn notify(&self, notification: &Notification) {
        self.notifications.lock().unwrap().push(notification.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenure_util::MonotonicInstant;

    #[tokio::test]
    async fn mock_scripted_outcomes() {
        let host = MockHost::new();
        host.push_outcome(ToggleOutcome::NotReady);

        assert_eq!(host.toggle().await, ToggleOutcome::NotReady);
        assert_eq!(host.toggle().await, ToggleOutcome::Enabled);
        assert_eq!(host.toggle_count(), 2);
    }

    #[tokio::test]
    async fn mock_events_reach_subscriber() {
        let host = MockHost::new();
        let mut rx = host.subscribe().unwrap();
        assert!(matches!(host.subscribe(), Err(HostError::AlreadySubscribed)));

        host.simulate_app(AppEvent::Started);
        host.simulate_power(PowerEvent::WokeUp {
            at: MonotonicInstant::from_secs(10),
        });

        assert_eq!(rx.recv().await, Some(HostEvent::App(AppEvent::Started)));
        assert!(matches!(
            rx.recv().await,
            Some(HostEvent::Power(PowerEvent::WokeUp { .. }))
        ));
    }
}
