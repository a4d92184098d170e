//! Persistence layer for tenured
//!
//! Provides:
//! - Session state file (single JSON record, last writer wins)
//! - Audit log (append-only, SQLite)
//! - In-memory implementations of both for tests

mod audit;
mod memory;
mod sqlite;
mod state_file;
mod traits;

pub use audit::*;
pub use memory::*;
pub use sqlite::*;
pub use state_file::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
