//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Session lifetime and renewal timing
    #[serde(default)]
    pub session: RawSessionConfig,

    /// Retry behavior for the toggle action
    #[serde(default)]
    pub retry: RawRetryConfig,

    /// How to toggle the permission
    pub toggle: RawToggleConfig,

    /// Which application to watch
    pub app: RawAppConfig,

    /// Sleep/wake detection
    #[serde(default)]
    pub power: RawPowerConfig,

    /// Global service settings
    #[serde(default)]
    pub service: RawServiceConfig,
}

/// Session timing. Every value is in seconds.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSessionConfig {
    /// Lifetime of one private-mode window
    pub duration_seconds: Option<u64>,

    /// Renew this long before the window closes
    pub renew_before_expiry_seconds: Option<u64>,

    /// Verification delay after a wake when no record is available
    pub wake_verification_delay_seconds: Option<u64>,

    /// Triggers closer together than this are ignored
    pub debounce_seconds: Option<u64>,

    /// Sleeps shorter than this don't need re-verification
    pub short_sleep_threshold_seconds: Option<u64>,
}

/// Toggle retry settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawRetryConfig {
    /// Fixed backoff after a NotReady outcome
    pub not_ready_backoff_seconds: Option<u64>,

    /// NotReady outcomes tolerated before reporting a failure
    pub max_not_ready_attempts: Option<u32>,

    /// Backoff after a failed toggle
    pub failure_backoff_seconds: Option<u64>,
}

/// Toggle action definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawToggleConfig {
    /// Command and arguments; its stdout reports the outcome
    pub command: Vec<String>,

    /// Additional environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Kill the command if it runs longer than this
    pub timeout_seconds: Option<u64>,
}

/// Watched application
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawAppConfig {
    /// Process name as shown in /proc/<pid>/comm
    pub process_name: String,

    /// How often to scan for the process
    pub poll_interval_seconds: Option<u64>,
}

/// Sleep detection settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPowerConfig {
    /// How often to compare the boot and monotonic clocks
    pub poll_interval_seconds: Option<u64>,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory for the state file and audit log
    pub data_dir: Option<PathBuf>,

    /// Show desktop notifications
    pub notifications: Option<bool>,
}
