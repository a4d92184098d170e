//! Session lifecycle and renewal scheduling engine for tenured
//!
//! This crate is the heart of tenured, containing:
//! - Expiry arithmetic (remaining time, validity, renewal delay)
//! - Debounce of re-entrant triggers
//! - Sleep classification
//! - Persisted record encoding and validation
//! - Restored-state evaluation
//! - The renewal state machine (Inactive -> AwaitingAction -> Active, plus Stale)
//!
//! Everything here is synchronous and takes the current time as an argument.

mod codec;
mod debounce;
mod engine;
mod events;
mod expiry;
mod restore;
mod session;
mod sleep;

pub use codec::*;
pub use debounce::*;
pub use engine::*;
pub use events::*;
pub use expiry::*;
pub use restore::*;
pub use session::*;
pub use sleep::*;
