//! Status and notification output

use std::sync::Mutex;
use tenure_api::{Notification, NotificationLevel, StatusUpdate};
use tenure_host_api::StatusSink;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// Logs status changes and shows notifications with `notify-send`.
pub struct DesktopNotifier {
    desktop_notifications: bool,
    last_status: Mutex<Option<StatusUpdate>>,
}

impl DesktopNotifier {
    pub fn new(desktop_notifications: bool) -> Self {
        Self {
            desktop_notifications,
            last_status: Mutex::new(None),
        }
    }

    fn send_desktop(&self, notification: &Notification) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No async runtime, skipping desktop notification");
            return;
        };

        let urgency = match notification.level {
            NotificationLevel::Info => "low",
            NotificationLevel::Warning => "normal",
            NotificationLevel::Error => "critical",
        };

        let mut cmd = Command::new("notify-send");
        cmd.arg("--app-name=tenured")
            .arg(format!("--urgency={}", urgency))
            .arg(&notification.title)
            .arg(&notification.body);

        runtime.spawn(async move {
            match cmd.status().await {
                Ok(status) if status.success() => {}
                Ok(status) => debug!(?status, "notify-send failed"),
                Err(e) => debug!(error = %e, "notify-send unavailable"),
            }
        });
    }
}

impl StatusSink for DesktopNotifier {
    fn show_status(&self, status: &StatusUpdate) {
        let Ok(mut last) = self.last_status.lock() else {
            return;
        };

        // Remaining time ticks on every update; only log status changes
        if last.as_ref().map(|s| s.status) != Some(status.status) {
            info!(
                status = %status.status,
                remaining = status.remaining.as_deref().unwrap_or("-"),
                "Session status"
            );
        }
        *last = Some(status.clone());
    }

    fn notify(&self, notification: &Notification) {
        match notification.level {
            NotificationLevel::Info => {
                info!(title = %notification.title, body = %notification.body, "Notification")
            }
            NotificationLevel::Warning => {
                warn!(title = %notification.title, body = %notification.body, "Notification")
            }
            NotificationLevel::Error => {
                error!(title = %notification.title, body = %notification.body, "Notification")
            }
        }

        if self.desktop_notifications {
            self.send_desktop(notification);
        }
    }
}
