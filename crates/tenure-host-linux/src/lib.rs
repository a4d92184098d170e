//! Linux host adapter for tenured
//!
//! Provides:
//! - The toggle action as an external command whose stdout reports the outcome
//! - Application lifecycle detection by scanning `/proc/<pid>/comm`
//! - Suspend/resume detection from the drift between the boot and monotonic clocks
//! - Desktop notifications through `notify-send`

mod adapter;
mod notify;
mod process;
mod suspend;
mod toggle;

pub use adapter::*;
pub use notify::*;
pub use process::*;
pub use suspend::*;
pub use toggle::*;
