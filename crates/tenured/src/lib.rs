//! tenured service internals
//!
//! The binary wires configuration, storage and the Linux host together;
//! the event loop and its single renewal timer live here so they can be
//! driven against a mock host in tests.

mod service;
mod timer;

pub use service::*;
pub use timer::*;
