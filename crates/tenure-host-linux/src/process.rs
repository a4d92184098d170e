//! Application lifecycle watcher based on /proc scanning

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tenure_api::AppEvent;
use tenure_host_api::HostEvent;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Whether any process under `proc_root` has `comm` equal to `name`
pub fn is_process_running(proc_root: &Path, name: &str) -> bool {
    let entries = match fs::read_dir(proc_root) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(root = %proc_root.display(), error = %e, "Cannot list processes");
            return false;
        }
    };

    entries.flatten().any(|entry| {
        let is_pid = entry
            .file_name()
            .to_str()
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
        // Processes may exit between listing and reading
        is_pid
            && fs::read_to_string(entry.path().join("comm"))
                .is_ok_and(|comm| comm.trim_end_matches('\n') == name)
    })
}

/// Polls for the watched process and reports start/stop transitions.
#[derive(Debug, Clone)]
pub struct ProcessMonitor {
    process_name: String,
    poll_interval: Duration,
    proc_root: PathBuf,
}

impl ProcessMonitor {
    pub fn new(process_name: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            process_name: process_name.into(),
            poll_interval,
            proc_root: PathBuf::from("/proc"),
        }
    }

    /// Scan a different directory instead of /proc
    pub fn with_proc_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.proc_root = root.into();
        self
    }

    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    /// Runs until the receiving side goes away.
    ///
    /// The first scan always reports what it sees, so a session restored
    /// while the process is absent gets cleared.
    pub async fn run(self, event_tx: mpsc::UnboundedSender<HostEvent>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(process = %self.process_name, "Process monitor started");
        let mut was_running: Option<bool> = None;

        loop {
            interval.tick().await;

            let running = is_process_running(&self.proc_root, &self.process_name);
            if was_running == Some(running) {
                continue;
            }
            was_running = Some(running);

            let event = if running {
                AppEvent::Started
            } else {
                AppEvent::Stopped
            };
            debug!(process = %self.process_name, ?event, "Application state changed");

            if event_tx.send(HostEvent::App(event)).is_err() {
                debug!("Event receiver dropped, process monitor exiting");
                break;
            }
        }
    }
}
