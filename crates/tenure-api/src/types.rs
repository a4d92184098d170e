//! Shared value types for tenured

use serde::{Deserialize, Serialize};
use std::fmt;
use tenure_util::WallTime;

use crate::RECORD_SCHEMA_VERSION;

/// Result of running the toggle action against the external application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ToggleOutcome {
    /// Private mode was switched on by this call
    Enabled,
    /// Private mode was already on; the window was re-asserted
    AlreadyEnabled,
    /// The application is running but not ready to be driven yet
    /// (e.g. its menu bar has not appeared). Retryable.
    NotReady,
    /// The action failed
    Failed { reason: String },
}

impl ToggleOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Whether the permission is now known to be on
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Enabled | Self::AlreadyEnabled)
    }
}

/// Session status shown by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// The application is not running, nothing to protect
    Inactive,
    /// Waiting on the toggle action
    Enabling,
    /// Session is on and a renewal is scheduled
    Active,
    /// Session state was restored or survived a sleep and is not yet confirmed
    Verifying,
    /// The application was not ready; a retry is scheduled
    Retrying,
    /// The last toggle attempt failed
    Failed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Inactive => "inactive",
            SessionStatus::Enabling => "enabling",
            SessionStatus::Active => "active",
            SessionStatus::Verifying => "verifying",
            SessionStatus::Retrying => "retrying",
            SessionStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Status payload for the presentation sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: SessionStatus,
    /// Formatted remaining session time, when a session exists
    pub remaining: Option<String>,
}

impl StatusUpdate {
    pub fn new(status: SessionStatus, remaining: Option<String>) -> Self {
        Self { status, remaining }
    }

    pub fn inactive() -> Self {
        Self::new(SessionStatus::Inactive, None)
    }
}

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// User-visible notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Durable session record
///
/// Every field is lenient on read: a torn or hand-edited file that lacks
/// fields still parses, and the codec treats it as absent state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    #[serde(default)]
    pub schema_version: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_wall_clock: Option<WallTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at_wall_clock: Option<WallTime>,
}

impl PersistedRecord {
    /// Build a current-version record
    pub fn new(start: WallTime, saved_at: WallTime) -> Self {
        Self {
            schema_version: RECORD_SCHEMA_VERSION,
            start_wall_clock: Some(start),
            saved_at_wall_clock: Some(saved_at),
        }
    }
}
