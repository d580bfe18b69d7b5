//! Progress reporting during waits.
//!
//! The orchestrator only knows the [`ProgressReporter`] trait; this module
//! also ships the stock implementations used by the CLI.

mod events;
mod reporter;
mod table;

pub use events::LogReporter;
pub use reporter::{NoopReporter, ProgressContext, ProgressReporter, StatusTone, WaitReason};
pub use table::{paint_status, render_changes, render_resources, TableReporter};
