//! Table progress reporter.
//!
//! Renders the stack's resources as a table on stderr, redrawing only when
//! something changed since the last tick.

use async_trait::async_trait;
use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::cloudformation::{Change, ChangeAction, StackClient, StackResource};
use crate::error::Result;

use super::reporter::{ProgressContext, ProgressReporter, StatusTone, WaitReason};

/// Resource row for table display.
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Resource")]
    logical_id: String,
    #[tabled(rename = "Type")]
    resource_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Change row for table display.
#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Resource")]
    logical_id: String,
    #[tabled(rename = "Type")]
    resource_type: String,
    #[tabled(rename = "Replacement")]
    replacement: String,
}

/// Reporter that draws resource tables on stderr.
#[derive(Debug)]
pub struct TableReporter<C> {
    /// Client used to fetch resources.
    client: C,
    /// Last table drawn, to avoid repeating identical frames.
    last_rendered: Option<String>,
}

impl<C: StackClient> TableReporter<C> {
    /// Creates a new table reporter.
    #[must_use]
    pub const fn new(client: C) -> Self {
        Self {
            client,
            last_rendered: None,
        }
    }

    async fn draw_resources(&mut self, ctx: &ProgressContext<'_>) -> Result<()> {
        let Some(stack) = ctx.stack else {
            return Ok(());
        };

        let resources = self.client.describe_stack_resources(&stack.stack_id).await?;
        let frame = format!(
            "\n{} {} ({})\n{}",
            ctx.reason.as_str().dimmed(),
            ctx.stack_name.bold(),
            paint_status(&stack.status),
            render_resources(&resources)
        );

        if self.last_rendered.as_deref() != Some(frame.as_str()) {
            eprintln!("{frame}");
            self.last_rendered = Some(frame);
        }
        Ok(())
    }
}

#[async_trait]
impl<C: StackClient> ProgressReporter for TableReporter<C> {
    async fn progress(&mut self, ctx: &ProgressContext<'_>) -> Result<()> {
        if ctx.reason == WaitReason::Review {
            return Ok(());
        }
        self.draw_resources(ctx).await
    }

    async fn complete(&mut self, ctx: &ProgressContext<'_>) -> Result<()> {
        if ctx.reason == WaitReason::Review {
            if let Some(changes) = ctx.changes {
                eprintln!("\n{}", render_changes(ctx.stack_name, changes));
            }
            return Ok(());
        }

        self.draw_resources(ctx).await?;
        self.last_rendered = None;

        let status = ctx
            .stack
            .map_or_else(|| "DELETED".dimmed().to_string(), |s| paint_status(&s.status));
        eprintln!("{} {} {status}", "▸".bold(), ctx.stack_name);
        Ok(())
    }
}

/// Renders resources as a table.
#[must_use]
pub fn render_resources(resources: &[StackResource]) -> String {
    if resources.is_empty() {
        return String::from("   No resources yet.\n");
    }

    let rows: Vec<ResourceRow> = resources
        .iter()
        .map(|r| ResourceRow {
            logical_id: r.logical_id.clone(),
            resource_type: r.resource_type.clone(),
            status: paint_status(&r.status),
            reason: truncate(r.status_reason.as_deref().unwrap_or(""), 60),
        })
        .collect();

    let mut output = Table::new(rows).to_string();
    output.push('\n');
    output
}

/// Renders proposed changes as a table with a summary line.
#[must_use]
pub fn render_changes(stack_name: &str, changes: &[Change]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Change set for {}", stack_name.bold());

    let rows: Vec<ChangeRow> = changes
        .iter()
        .map(|c| ChangeRow {
            action: paint_action(&c.action),
            logical_id: c.logical_id.clone(),
            resource_type: c.resource_type.clone(),
            replacement: c.replacement.clone().unwrap_or_default(),
        })
        .collect();

    output.push_str(&Table::new(rows).to_string());
    output.push('\n');

    let count = |action: &ChangeAction| changes.iter().filter(|c| &c.action == action).count();
    let _ = writeln!(
        output,
        "Changes: {} to add, {} to modify, {} to remove",
        count(&ChangeAction::Add).to_string().green(),
        count(&ChangeAction::Modify).to_string().yellow(),
        count(&ChangeAction::Remove).to_string().red()
    );
    output
}

/// Colours a stack or resource status by its tone.
#[must_use]
pub fn paint_status(status: &str) -> String {
    match StatusTone::of(status) {
        StatusTone::Good => status.green().to_string(),
        StatusTone::Pending => status.yellow().to_string(),
        StatusTone::Bad => status.red().to_string(),
        StatusTone::Neutral => status.to_string(),
    }
}

fn paint_action(action: &ChangeAction) -> String {
    match action {
        ChangeAction::Add => "+add".green().to_string(),
        ChangeAction::Modify => "~modify".yellow().to_string(),
        ChangeAction::Remove => "-remove".red().to_string(),
        other => other.to_string().dimmed().to_string(),
    }
}

/// Truncates a string to a maximum number of characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
