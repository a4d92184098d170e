//! Linux host adapter implementation

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tenure_api::ToggleOutcome;
use tenure_host_api::{HostAdapter, HostError, HostEvent, HostResult};
use tokio::sync::mpsc;
use tracing::info;

use crate::{CommandToggle, ProcessMonitor, SuspendMonitor};

/// Linux host adapter
pub struct LinuxHost {
    toggle: CommandToggle,
    process_monitor: ProcessMonitor,
    suspend_monitor: SuspendMonitor,
    event_tx: mpsc::UnboundedSender<HostEvent>,
    event_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<HostEvent>>>>,
}

impl LinuxHost {
    pub fn new(
        toggle: CommandToggle,
        process_monitor: ProcessMonitor,
        suspend_monitor: SuspendMonitor,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            toggle,
            process_monitor,
            suspend_monitor,
            event_tx: tx,
            event_rx: Arc::new(Mutex::new(Some(rx))),
        }
    }

    /// Start the background lifecycle and power watchers
    pub fn start_monitors(&self) -> Vec<tokio::task::JoinHandle<()>> {
        info!(
            process = %self.process_monitor.process_name(),
            "Starting host monitors"
        );

        vec![
            tokio::spawn(self.process_monitor.clone().run(self.event_tx.clone())),
            tokio::spawn(self.suspend_monitor.clone().run(self.event_tx.clone())),
        ]
    }
}

#[async_trait]
impl HostAdapter for LinuxHost {
    async fn toggle(&self) -> ToggleOutcome {
        self.toggle.run().await
    }

    fn subscribe(&self) -> HostResult<mpsc::UnboundedReceiver<HostEvent>> {
        self.event_rx
            .lock()
            .map_err(|_| HostError::Internal("event receiver lock poisoned".into()))?
            .take()
            .ok_or(HostError::AlreadySubscribed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn host(script: &str) -> LinuxHost {
        LinuxHost::new(
            CommandToggle::new(
                "sh",
                vec!["-c".into(), script.into()],
                HashMap::new(),
                Duration::from_secs(5),
            ),
            ProcessMonitor::new("tenure-test-none", Duration::from_secs(1)),
            SuspendMonitor::new(Duration::from_secs(5)),
        )
    }

    #[tokio::test]
    async fn test_toggle_through_adapter() {
        let host = host("echo enabled");
        assert_eq!(host.toggle().await, ToggleOutcome::Enabled);
    }

    #[tokio::test]
    async fn test_subscribe_once() {
        let host = host("echo enabled");
        let _rx = host.subscribe().unwrap();
        assert!(matches!(host.subscribe(), Err(HostError::AlreadySubscribed)));
    }
}
