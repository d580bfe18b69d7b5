//! Classification of the remote stack before a deployment starts.

use crate::cloudformation::{Stack, COMPLETE_SUFFIX, IN_PROGRESS_SUFFIX};
use crate::error::DeployError;

/// What to do with the stack as it currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// No usable stack: create one.
    Fresh,
    /// Stack failed to create and can only be deleted: delete, then create.
    Dead,
    /// Stack is settled: update it.
    Existing,
    /// Stack is mid-operation: wait it out, then classify again.
    Busy,
}

/// Classifies a stack snapshot (`None` when the stack does not exist).
///
/// # Errors
///
/// Returns [`DeployError::InvalidPreUpdateStatus`] for statuses no deployment
/// can start from, such as `UPDATE_ROLLBACK_FAILED`.
pub fn classify(stack: Option<&Stack>) -> Result<Disposition, DeployError> {
    let Some(stack) = stack else {
        return Ok(Disposition::Fresh);
    };

    let status = stack.status.as_str();
    let disposition = match status {
        "REVIEW_IN_PROGRESS" | "DELETE_COMPLETE" => Disposition::Fresh,
        "CREATE_FAILED" | "ROLLBACK_COMPLETE" => Disposition::Dead,
        s if s.ends_with(COMPLETE_SUFFIX) => Disposition::Existing,
        s if s.ends_with(IN_PROGRESS_SUFFIX) => Disposition::Busy,
        _ => {
            return Err(DeployError::InvalidPreUpdateStatus {
                stack: Box::new(stack.clone()),
            });
        }
    };

    Ok(disposition)
}
