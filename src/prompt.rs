//! Confirmation prompts.
//!
//! The orchestrator asks exactly once, right before executing a change set.

use async_trait::async_trait;
use std::io::{BufRead, IsTerminal, Write};
use tracing::debug;

use crate::error::{Error, Result};

/// Asks the operator a yes/no question.
#[async_trait]
pub trait ConfirmPrompt: Send {
    /// Returns the operator's decision for `message`.
    async fn confirm(&mut self, message: &str) -> Result<bool>;
}

#[async_trait]
impl ConfirmPrompt for Box<dyn ConfirmPrompt> {
    async fn confirm(&mut self, message: &str) -> Result<bool> {
        (**self).confirm(message).await
    }
}

/// Always answers yes.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

#[async_trait]
impl ConfirmPrompt for AutoApprove {
    async fn confirm(&mut self, message: &str) -> Result<bool> {
        debug!("Auto-approving: {message}");
        Ok(true)
    }
}

/// Asks on stderr and reads the answer from stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

#[async_trait]
impl ConfirmPrompt for TerminalPrompt {
    async fn confirm(&mut self, message: &str) -> Result<bool> {
        let question = format!("{message} [y/N]: ");

        let answer = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
            let mut stderr = std::io::stderr();
            write!(stderr, "{question}")?;
            stderr.flush()?;

            let mut input = String::new();
            std::io::stdin().lock().read_line(&mut input)?;
            Ok(input)
        })
        .await
        .map_err(|e| Error::internal(format!("Prompt task failed: {e}")))??;

        Ok(is_yes(&answer))
    }
}

/// Adapts a synchronous closure.
#[derive(Debug, Clone, Copy)]
pub struct FnPrompt<F>(pub F);

#[async_trait]
impl<F> ConfirmPrompt for FnPrompt<F>
where
    F: FnMut(&str) -> bool + Send,
{
    async fn confirm(&mut self, message: &str) -> Result<bool> {
        Ok((self.0)(message))
    }
}

/// Picks the prompt to use for this process.
///
/// Without an interactive stdin there is nobody to ask, so the answer is yes.
#[must_use]
pub fn default_prompt(assume_yes: bool) -> Box<dyn ConfirmPrompt> {
    if assume_yes || !std::io::stdin().is_terminal() {
        Box::new(AutoApprove)
    } else {
        Box::new(TerminalPrompt)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
