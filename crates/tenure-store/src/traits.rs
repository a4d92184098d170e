//! Store trait definitions

use tenure_api::PersistedRecord;

use crate::{AuditEvent, StoreResult};

/// Durable home of the single session record
pub trait StateStore: Send + Sync {
    /// Load the saved record. A missing or unreadable record is `Ok(None)`.
    fn load_record(&self) -> StoreResult<Option<PersistedRecord>>;

    /// Replace the saved record
    fn save_record(&self, record: &PersistedRecord) -> StoreResult<()>;

    /// Delete the saved record. Deleting nothing is not an error.
    fn clear_record(&self) -> StoreResult<()>;
}

/// Append-only audit trail
pub trait AuditLog: Send + Sync {
    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    /// Check if the log is healthy
    fn is_healthy(&self) -> bool;
}
