//! Host adapter traits

use async_trait::async_trait;
use std::time::Duration;
use tenure_api::{AppEvent, Notification, PowerEvent, StatusUpdate, ToggleOutcome};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from host adapter operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    #[error("Already subscribed")]
    AlreadySubscribed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Events from the host adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// The watched application started or stopped
    App(AppEvent),

    /// The system slept or woke
    Power(PowerEvent),
}

/// Host adapter trait - implemented by platform-specific adapters
#[async_trait]
pub trait HostAdapter: Send + Sync {
    /// Run the toggle action against the external application.
    ///
    /// Never errors: every problem is reported as [`ToggleOutcome::Failed`].
    async fn toggle(&self) -> ToggleOutcome;

    /// Subscribe to host events. Only one subscriber is supported.
    fn subscribe(&self) -> HostResult<mpsc::UnboundedReceiver<HostEvent>>;

    /// Optional: check if the host adapter is healthy
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Where status and notifications are shown
pub trait StatusSink: Send + Sync {
    fn show_status(&self, status: &StatusUpdate);

    fn notify(&self, notification: &Notification);
}
