//! Audit event types

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tenure_api::Trigger;
use tenure_util::SessionId;

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// A new protected span began
    SessionEnabled {
        session_id: SessionId,
        trigger: Trigger,
        already_enabled: bool,
    },

    /// The window of an existing span was re-asserted
    SessionRenewed {
        session_id: SessionId,
        trigger: Trigger,
    },

    /// A saved record was accepted at startup or after a wake
    SessionRestored {
        session_id: SessionId,
        elapsed_secs: i64,
    },

    /// The session was dropped
    SessionCleared {
        session_id: SessionId,
        reason: String,
    },

    /// The toggle action reported that the application was not ready
    ToggleNotReady { trigger: Trigger, attempt: u32 },

    /// The toggle action failed
    ToggleFailed { trigger: Trigger, reason: String },

    /// The system slept and woke
    SleepObserved { slept_secs: Option<i64>, short: bool },

    /// A saved record was discarded
    RecordRejected { reason: String },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: tenure_util::now(),
            event,
        }
    }
}
