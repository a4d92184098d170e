//! Time utilities for tenured
//!
//! Two clocks are used and never mixed:
//! - [`MonotonicInstant`] for all in-process arithmetic (renewal deadlines,
//!   debounce windows, sleep intervals). Immune to wall-clock changes.
//! - [`WallTime`] for the persisted record only, since a monotonic reading
//!   means nothing to the next process.
//!
//! Both have whole-second resolution.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `TENURE_MOCK_TIME` environment variable can be set
//! to override the wall clock. This is useful for exercising persisted-record
//! validation (expired records, clock skew) without touching the system clock.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`)
//!
//! Example:
//! ```bash
//! TENURE_MOCK_TIME="2025-12-25 14:30:00" tenured
//! ```

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "TENURE_MOCK_TIME";

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

/// Anchor for the process-local fallback clock.
static PROCESS_ANCHOR: OnceLock<Instant> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S") {
                    Ok(naive_dt) => match Local.from_local_datetime(&naive_dt).single() {
                        Some(mock_dt) => {
                            let offset = mock_dt.signed_duration_since(chrono::Local::now());
                            tracing::info!(
                                mock_time = %mock_time_str,
                                offset_secs = offset.num_seconds(),
                                "Mock time enabled"
                            );
                            return Some(offset);
                        }
                        None => {
                            tracing::warn!(
                                mock_time = %mock_time_str,
                                "Failed to convert mock time to local timezone"
                            );
                        }
                    },
                    Err(_) => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = "%Y-%m-%d %H:%M:%S",
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    if let Some(offset) = get_mock_time_offset() {
        real_now + offset
    } else {
        real_now
    }
}

/// Format a DateTime for display with full date and time.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Whole seconds of a duration as a signed value, saturating at `i64::MAX`.
pub fn duration_secs(d: Duration) -> i64 {
    i64::try_from(d.as_secs()).unwrap_or(i64::MAX)
}

/// A point on the boot clock, in whole seconds.
///
/// On Linux this is `CLOCK_BOOTTIME`, which keeps counting while the system
/// is suspended, so a session started before a sleep still expires on time.
/// Values are signed: a session restored from disk may have started before
/// the current boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonotonicInstant(i64);

impl MonotonicInstant {
    pub fn now() -> Self {
        Self(boot_clock_secs())
    }

    pub const fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    pub const fn as_secs(&self) -> i64 {
        self.0
    }

    /// Signed seconds from `earlier` to `self`. Negative if `earlier` is
    /// actually later.
    pub fn secs_since(&self, earlier: MonotonicInstant) -> i64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Returns elapsed time since `earlier`, or zero if `earlier` is in the future
    pub fn saturating_duration_since(&self, earlier: MonotonicInstant) -> Duration {
        Duration::from_secs(self.secs_since(earlier).max(0) as u64)
    }
}

impl std::ops::Add<Duration> for MonotonicInstant {
    type Output = MonotonicInstant;

    fn add(self, rhs: Duration) -> Self::Output {
        MonotonicInstant(self.0.saturating_add(duration_secs(rhs)))
    }
}

impl std::ops::Sub<Duration> for MonotonicInstant {
    type Output = MonotonicInstant;

    fn sub(self, rhs: Duration) -> Self::Output {
        MonotonicInstant(self.0.saturating_sub(duration_secs(rhs)))
    }
}

#[cfg(target_os = "linux")]
fn boot_clock_secs() -> i64 {
    use nix::time::{clock_gettime, ClockId};

    match clock_gettime(ClockId::CLOCK_BOOTTIME) {
        Ok(ts) => i64::from(ts.tv_sec()),
        Err(e) => {
            tracing::warn!(error = %e, "CLOCK_BOOTTIME unavailable, using process clock");
            process_clock_secs()
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn boot_clock_secs() -> i64 {
    process_clock_secs()
}

fn process_clock_secs() -> i64 {
    let anchor = PROCESS_ANCHOR.get_or_init(Instant::now);
    duration_secs(anchor.elapsed())
}

/// Calendar time as Unix epoch seconds.
///
/// Only used where time has to survive the process: the persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WallTime(i64);

impl WallTime {
    /// Current wall-clock time (mock-aware in debug builds)
    pub fn now() -> Self {
        Self(now().timestamp())
    }

    pub const fn from_epoch_secs(secs: i64) -> Self {
        Self(secs)
    }

    pub const fn epoch_secs(&self) -> i64 {
        self.0
    }

    /// Signed seconds from `earlier` to `self`. Negative means the wall clock
    /// moved backward between the two readings.
    pub fn secs_since(&self, earlier: WallTime) -> i64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn to_local(&self) -> Option<DateTime<Local>> {
        Local.timestamp_opt(self.0, 0).single()
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_local() {
            Some(dt) => write!(f, "{}", format_datetime_full(&dt)),
            None => write!(f, "@{}", self.0),
        }
    }
}

/// Render remaining session time for the status display.
///
/// `None` or a negative value means the session is gone.
pub fn format_remaining(seconds: Option<i64>) -> String {
    match seconds {
        None => "expired".to_string(),
        Some(s) if s < 0 => "expired".to_string(),
        Some(s) if s < 60 => "< 1m".to_string(),
        Some(s) if s < 3600 => format!("{}m", s / 60),
        Some(s) => format!("{}h {}m", s / 3600, (s % 3600) / 60),
    }
}
