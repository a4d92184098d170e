//! Host adapter trait interfaces for tenured
//!
//! This crate defines the interface between the renewal engine's service
//! loop and platform-specific implementations: the toggle action, the
//! application lifecycle and power-state watchers, and the presentation
//! sink. It contains no platform code itself.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
