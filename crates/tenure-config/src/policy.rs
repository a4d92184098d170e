//! Validated configuration structures

use crate::schema::{
    RawAppConfig, RawConfig, RawPowerConfig, RawRetryConfig, RawServiceConfig, RawSessionConfig,
    RawToggleConfig,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SESSION_DURATION_SECS: u64 = 21600;
pub const DEFAULT_RENEW_BEFORE_EXPIRY_SECS: u64 = 1800;
pub const DEFAULT_WAKE_VERIFICATION_DELAY_SECS: u64 = 1800;
pub const DEFAULT_DEBOUNCE_SECS: u64 = 5;
pub const DEFAULT_SHORT_SLEEP_THRESHOLD_SECS: u64 = 300;

/// Validated configuration ready for use by the service
#[derive(Debug, Clone)]
pub struct Config {
    pub renewal: RenewalPolicy,
    pub retry: RetryPolicy,
    pub toggle: ToggleConfig,
    pub app: AppConfig,
    pub power: PowerConfig,
    pub service: ServiceConfig,
}

impl Config {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            renewal: RenewalPolicy::from_raw(&raw.session),
            retry: RetryPolicy::from_raw(&raw.retry),
            toggle: ToggleConfig::from_raw(raw.toggle),
            app: AppConfig::from_raw(raw.app),
            power: PowerConfig::from_raw(&raw.power),
            service: ServiceConfig::from_raw(raw.service),
        }
    }
}

/// The named durations that drive the renewal engine.
///
/// `renew_before_expiry < session_duration` is assumed but not enforced;
/// violating it makes every renewal delay zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalPolicy {
    /// Lifetime of one private-mode window
    pub session_duration: Duration,
    /// Lead time before expiry at which renewal happens
    pub renew_before_expiry: Duration,
    /// Fallback delay before re-verifying after a wake with no record
    pub wake_verification_delay: Duration,
    /// Minimum spacing between processed triggers
    pub debounce_interval: Duration,
    /// Sleeps shorter than this are ignored
    pub short_sleep_threshold: Duration,
}

impl RenewalPolicy {
    fn from_raw(raw: &RawSessionConfig) -> Self {
        let defaults = Self::default();
        Self {
            session_duration: raw
                .duration_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_duration),
            renew_before_expiry: raw
                .renew_before_expiry_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.renew_before_expiry),
            wake_verification_delay: raw
                .wake_verification_delay_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.wake_verification_delay),
            debounce_interval: raw
                .debounce_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.debounce_interval),
            short_sleep_threshold: raw
                .short_sleep_threshold_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.short_sleep_threshold),
        }
    }
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self {
            session_duration: Duration::from_secs(DEFAULT_SESSION_DURATION_SECS),
            renew_before_expiry: Duration::from_secs(DEFAULT_RENEW_BEFORE_EXPIRY_SECS),
            wake_verification_delay: Duration::from_secs(DEFAULT_WAKE_VERIFICATION_DELAY_SECS),
            debounce_interval: Duration::from_secs(DEFAULT_DEBOUNCE_SECS),
            short_sleep_threshold: Duration::from_secs(DEFAULT_SHORT_SLEEP_THRESHOLD_SECS),
        }
    }
}

/// Toggle retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub not_ready_backoff: Duration,
    pub max_not_ready_attempts: u32,
    pub failure_backoff: Duration,
}

impl RetryPolicy {
    fn from_raw(raw: &RawRetryConfig) -> Self {
        let defaults = Self::default();
        Self {
            not_ready_backoff: raw
                .not_ready_backoff_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.not_ready_backoff),
            max_not_ready_attempts: raw
                .max_not_ready_attempts
                .unwrap_or(defaults.max_not_ready_attempts),
            failure_backoff: raw
                .failure_backoff_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.failure_backoff),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            not_ready_backoff: Duration::from_secs(10),
            max_not_ready_attempts: 6,
            failure_backoff: Duration::from_secs(300),
        }
    }
}

/// External toggle command
#[derive(Debug, Clone)]
pub struct ToggleConfig {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub timeout: Duration,
}

impl ToggleConfig {
    fn from_raw(raw: RawToggleConfig) -> Self {
        let mut argv = raw.command.into_iter();
        Self {
            command: argv.next().unwrap_or_default(),
            args: argv.collect(),
            env: raw.env,
            timeout: Duration::from_secs(raw.timeout_seconds.unwrap_or(60)),
        }
    }
}

/// Watched application
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub process_name: String,
    pub poll_interval: Duration,
}

impl AppConfig {
    fn from_raw(raw: RawAppConfig) -> Self {
        Self {
            process_name: raw.process_name.trim().to_string(),
            poll_interval: Duration::from_secs(raw.poll_interval_seconds.unwrap_or(2)),
        }
    }
}

/// Sleep detection
#[derive(Debug, Clone, Copy)]
pub struct PowerConfig {
    pub poll_interval: Duration,
}

impl PowerConfig {
    fn from_raw(raw: &RawPowerConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(raw.poll_interval_seconds.unwrap_or(5)),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub notifications: bool,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            data_dir: raw
                .data_dir
                .unwrap_or_else(tenure_util::data_dir_without_env),
            notifications: raw.notifications.unwrap_or(true),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: tenure_util::data_dir_without_env(),
            notifications: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renewal_policy_defaults() {
        let policy = RenewalPolicy::default();
        assert_eq!(policy.session_duration, Duration::from_secs(21600));
        assert_eq!(policy.renew_before_expiry, Duration::from_secs(1800));
        assert_eq!(policy.wake_verification_delay, Duration::from_secs(1800));
        assert_eq!(policy.debounce_interval, Duration::from_secs(5));
        assert_eq!(policy.short_sleep_threshold, Duration::from_secs(300));
    }

    #[test]
    fn partial_session_section_keeps_other_defaults() {
        let raw = RawSessionConfig {
            duration_seconds: Some(3600),
            ..Default::default()
        };
        let policy = RenewalPolicy::from_raw(&raw);
        assert_eq!(policy.session_duration, Duration::from_secs(3600));
        assert_eq!(policy.renew_before_expiry, Duration::from_secs(1800));
    }

    #[test]
    fn toggle_argv_split() {
        let raw = RawToggleConfig {
            command: vec!["/usr/bin/osascript".into(), "toggle.scpt".into()],
            env: HashMap::new(),
            timeout_seconds: None,
        };
        let toggle = ToggleConfig::from_raw(raw);
        assert_eq!(toggle.command, "/usr/bin/osascript");
        assert_eq!(toggle.args, vec!["toggle.scpt".to_string()]);
        assert_eq!(toggle.timeout, Duration::from_secs(60));
    }
}
