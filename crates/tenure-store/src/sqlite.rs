//! SQLite-backed audit log

use chrono::{DateTime, Local};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{AuditEvent, AuditEventType, AuditLog, StoreError, StoreResult};

/// SQLite-based audit log
pub struct SqliteAuditLog {
    conn: Mutex<Connection>,
}

impl SqliteAuditLog {
    /// Open or create an audit log at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let log = Self {
            conn: Mutex::new(conn),
        };
        log.init_schema()?;
        Ok(log)
    }

    /// Create an in-memory audit log (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let log = Self {
            conn: Mutex::new(conn),
        };
        log.init_schema()?;
        Ok(log)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Audit schema initialized");
        Ok(())
    }
}

impl AuditLog for SqliteAuditLog {
    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Local))
                .unwrap_or_else(|_| tenure_util::now());
            let event: AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Audit log lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenure_api::Trigger;
    use tenure_util::SessionId;

    #[test]
    fn test_in_memory_log() {
        let log = SqliteAuditLog::in_memory().unwrap();
        assert!(log.is_healthy());
    }

    #[test]
    fn test_audit_log() {
        let log = SqliteAuditLog::in_memory().unwrap();

        log.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))
            .unwrap();

        let session_id = SessionId::new();
        log.append_audit(AuditEvent::new(AuditEventType::SessionEnabled {
            session_id: session_id.clone(),
            trigger: Trigger::AppStarted,
            already_enabled: false,
        }))
        .unwrap();

        let events = log.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 2);
        match &events[0].event {
            AuditEventType::SessionEnabled {
                session_id: id,
                trigger,
                ..
            } => {
                assert_eq!(id, &session_id);
                assert_eq!(*trigger, Trigger::AppStarted);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(events[1].event, AuditEventType::ServiceStarted));
    }

    #[test]
    fn test_file_backed_log_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.db");

        {
            let log = SqliteAuditLog::open(&path).unwrap();
            log.append_audit(AuditEvent::new(AuditEventType::RecordRejected {
                reason: "expired".into(),
            }))
            .unwrap();
        }

        let log = SqliteAuditLog::open(&path).unwrap();
        let events = log.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 1);
    }
}
