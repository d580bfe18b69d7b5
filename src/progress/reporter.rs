//! Progress reporter interface.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::cloudformation::{Change, Stack};
use crate::error::Result;

/// Why the orchestrator is currently polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaitReason {
    /// Waiting for a dead stack to be deleted before re-creating it.
    DeleteExisting,
    /// Waiting out an operation that was already running before we started.
    InProgressExisting,
    /// Waiting for the change set to be computed, then presenting it.
    Review,
    /// Waiting for our own change set to be applied.
    Executing,
}

impl WaitReason {
    /// Tag used in logs and JSON output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeleteExisting => "DELETE_EXISTING",
            Self::InProgressExisting => "IN_PROGRESS_EXISTING",
            Self::Review => "REVIEW",
            Self::Executing => "EXECUTING",
        }
    }
}

impl fmt::Display for WaitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a reporter gets on every tick.
#[derive(Debug, Clone, Copy)]
pub struct ProgressContext<'a> {
    /// Why we are waiting.
    pub reason: WaitReason,
    /// Name of the stack being deployed.
    pub stack_name: &'a str,
    /// Latest known snapshot; absent if the stack does not exist (yet or anymore).
    pub stack: Option<&'a Stack>,
    /// Proposed changes, only set while presenting the change set for review.
    pub changes: Option<&'a [Change]>,
}

impl<'a> ProgressContext<'a> {
    /// Context for a stack wait.
    #[must_use]
    pub const fn new(reason: WaitReason, stack_name: &'a str, stack: Option<&'a Stack>) -> Self {
        Self {
            reason,
            stack_name,
            stack,
            changes: None,
        }
    }

    /// Attaches proposed changes.
    #[must_use]
    pub const fn with_changes(mut self, changes: &'a [Change]) -> Self {
        self.changes = Some(changes);
        self
    }
}

/// Receives progress notifications while the orchestrator waits.
///
/// Both callbacks take `&mut self`: the orchestrator awaits each one before
/// the next poll, so a reporter never renders concurrently with itself.
#[async_trait]
pub trait ProgressReporter: Send {
    /// Called on every poll.
    async fn progress(&mut self, ctx: &ProgressContext<'_>) -> Result<()>;

    /// Called once when a wait ends.
    async fn complete(&mut self, ctx: &ProgressContext<'_>) -> Result<()>;
}

#[async_trait]
impl ProgressReporter for Box<dyn ProgressReporter> {
    async fn progress(&mut self, ctx: &ProgressContext<'_>) -> Result<()> {
        (**self).progress(ctx).await
    }

    async fn complete(&mut self, ctx: &ProgressContext<'_>) -> Result<()> {
        (**self).complete(ctx).await
    }
}

/// Reporter that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

#[async_trait]
impl ProgressReporter for NoopReporter {
    async fn progress(&mut self, _ctx: &ProgressContext<'_>) -> Result<()> {
        Ok(())
    }

    async fn complete(&mut self, _ctx: &ProgressContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Colour category of a stack or resource status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    /// Finished successfully.
    Good,
    /// Still moving.
    Pending,
    /// Failed or rolling back.
    Bad,
    /// Anything else.
    Neutral,
}

impl StatusTone {
    /// Classifies a status string.
    #[must_use]
    pub fn of(status: &str) -> Self {
        if status.contains("FAILED") || status.contains("ROLLBACK") {
            Self::Bad
        } else if status.ends_with("_IN_PROGRESS") {
            Self::Pending
        } else if status.ends_with("_COMPLETE") {
            Self::Good
        } else {
            Self::Neutral
        }
    }
}
