//! Shared types for tenured
//!
//! This crate defines the values exchanged between the renewal engine,
//! the host adapters and the presentation layer:
//! - Toggle action outcomes
//! - Application lifecycle and power-state events
//! - Status and notification payloads
//! - The versioned persisted session record

mod events;
mod types;

pub use events::*;
pub use types::*;

/// Current persisted record schema version
pub const RECORD_SCHEMA_VERSION: u32 = 1;
