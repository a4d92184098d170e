//! Shared utilities for tenured
//!
//! This crate provides:
//! - Clock types (boot-clock monotonic seconds, wall-clock epoch seconds)
//! - Remaining-time formatting for status display
//! - ID types (SessionId)
//! - Default paths for config and data directories

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
