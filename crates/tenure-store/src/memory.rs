//! In-memory store implementations, for tests and dry runs

use std::sync::Mutex;
use tenure_api::PersistedRecord;

use crate::{AuditEvent, AuditLog, StateStore, StoreError, StoreResult};

/// Holds the session record in memory
#[derive(Default)]
pub struct MemoryStateStore {
    record: Mutex<Option<PersistedRecord>>,
    fail_writes: Mutex<bool>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a record already saved
    pub fn with_record(record: PersistedRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
            fail_writes: Mutex::new(false),
        }
    }

    /// Make subsequent saves and clears fail with an I/O error
    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_writes.lock() {
            *flag = fail;
        }
    }

    /// Current record without going through the trait
    pub fn snapshot(&self) -> Option<PersistedRecord> {
        self.record.lock().ok().and_then(|r| r.clone())
    }

    fn check_writable(&self) -> StoreResult<()> {
        let fail = *self.fail_writes.lock().map_err(|_| StoreError::Poisoned)?;
        if fail {
            return Err(StoreError::Io(std::io::Error::other("write refused")));
        }
        Ok(())
    }
}

impl StateStore for MemoryStateStore {
    fn load_record(&self) -> StoreResult<Option<PersistedRecord>> {
        let record = self.record.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(record.clone())
    }

    fn save_record(&self, record: &PersistedRecord) -> StoreResult<()> {
        self.check_writable()?;
        let mut slot = self.record.lock().map_err(|_| StoreError::Poisoned)?;
        *slot = Some(record.clone());
        Ok(())
    }

    fn clear_record(&self) -> StoreResult<()> {
        self.check_writable()?;
        let mut slot = self.record.lock().map_err(|_| StoreError::Poisoned)?;
        *slot = None;
        Ok(())
    }
}

/// Collects audit events in memory
#[derive(Default)]
pub struct MemoryAuditLog {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLog for MemoryAuditLog {
    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let mut events = self.events.lock().map_err(|_| StoreError::Poisoned)?;
        event.id = events.len() as i64 + 1;
        events.push(event);
        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let events = self.events.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(events.iter().rev().take(limit).cloned().collect())
    }

    fn is_healthy(&self) -> bool {
        self.events.lock().is_ok()
    }
}
