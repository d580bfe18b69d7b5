//! Output formatting for CLI commands.
//!
//! This module renders command results as text or JSON. Nothing here writes
//! to the terminal; callers decide where the strings go.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::cloudformation::{Stack, StackOutput};
use crate::config::{DeployConfig, ValidationResult};
use crate::deploy::DeployOutcome;
use crate::progress::paint_status;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Stack output row for table display.
#[derive(Tabled)]
struct OutputRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the result of a deployment.
    #[must_use]
    pub fn format_outcome(&self, stack_name: &str, outcome: &DeployOutcome) -> String {
        match self.format {
            OutputFormat::Json => to_json(&OutcomeJson {
                stack: stack_name,
                outcome,
            }),
            OutputFormat::Text => Self::format_outcome_text(stack_name, outcome),
        }
    }

    fn format_outcome_text(stack_name: &str, outcome: &DeployOutcome) -> String {
        match outcome {
            DeployOutcome::Deployed { operation, outputs } => {
                let mut output = format!(
                    "{} {operation} of stack {stack_name} complete\n",
                    "✓".green()
                );
                output.push_str(&Self::format_outputs_text(outputs));
                output
            }
            DeployOutcome::NoChanges => {
                format!("{} Stack {stack_name} is up to date\n", "✓".green())
            }
            DeployOutcome::Rejected => {
                format!("{} Deployment of {stack_name} cancelled\n", "✗".yellow())
            }
        }
    }

    /// Formats the stack's current status; `None` means it does not exist.
    #[must_use]
    pub fn format_status(&self, stack_name: &str, stack: Option<&Stack>) -> String {
        match self.format {
            OutputFormat::Json => to_json(&StatusJson {
                stack: stack_name,
                exists: stack.is_some(),
                details: stack,
            }),
            OutputFormat::Text => {
                let Some(stack) = stack else {
                    return format!("Stack {stack_name} does not exist\n");
                };

                let mut output = String::new();
                let _ = writeln!(output, "\nStack: {}", stack.stack_name);
                let _ = writeln!(output, "   ID: {}", stack.stack_id);
                let _ = writeln!(output, "   Status: {}", paint_status(&stack.status));
                if let Some(reason) = &stack.status_reason {
                    let _ = writeln!(output, "   Reason: {reason}");
                }
                output.push_str(&Self::format_outputs_text(&stack.outputs));
                output
            }
        }
    }

    fn format_outputs_text(outputs: &[StackOutput]) -> String {
        if outputs.is_empty() {
            return String::new();
        }

        let rows: Vec<OutputRow> = outputs
            .iter()
            .map(|o| OutputRow {
                key: o.key.clone(),
                value: o.value.clone(),
                description: o.description.clone().unwrap_or_default(),
            })
            .collect();

        format!("\nOutputs:\n{}\n", Table::new(rows))
    }

    /// Formats a configuration summary and validation findings.
    #[must_use]
    pub fn format_validation(
        &self,
        config: &DeployConfig,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => to_json(&ValidationJson {
                valid: result.is_valid(),
                stack: &config.stack.name,
                template: config.stack.template.display().to_string(),
                region: config.stack.region.as_deref(),
                parameters: config.parameters.len(),
                tags: config.tags.len(),
                warnings: &result.warnings,
            }),
            OutputFormat::Text => {
                let mut output = format!("{} Configuration is valid\n", "✓".green());

                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                let stack = &config.stack;
                output.push_str("\nConfiguration summary:\n");
                let _ = writeln!(output, "   Stack: {}", stack.name);
                let _ = writeln!(output, "   Template: {}", stack.template.display());
                let _ = writeln!(
                    output,
                    "   Region: {}",
                    stack.region.as_deref().unwrap_or("(from AWS config)")
                );
                if !stack.capabilities.is_empty() {
                    let names: Vec<&str> = stack.capabilities.iter().map(|c| c.as_str()).collect();
                    let _ = writeln!(output, "   Capabilities: {}", names.join(", "));
                }
                let _ = writeln!(output, "   Parameters: {}", config.parameters.len());
                let _ = writeln!(output, "   Tags: {}", config.tags.len());
                output
            }
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

// JSON serialization helpers

#[derive(Serialize)]
struct OutcomeJson<'a> {
    stack: &'a str,
    #[serde(flatten)]
    outcome: &'a DeployOutcome,
}

#[derive(Serialize)]
struct StatusJson<'a> {
    stack: &'a str,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Stack>,
}

#[derive(Serialize)]
struct ValidationJson<'a> {
    valid: bool,
    stack: &'a str,
    template: String,
    region: Option<&'a str>,
    parameters: usize,
    tags: usize,
    warnings: &'a [String],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloudformation::StackOperation;

    fn stack() -> Stack {
        Stack {
            stack_id: String::from("arn:aws:cloudformation:eu-west-1:1:stack/app/1"),
            stack_name: String::from("app"),
            status: String::from("UPDATE_COMPLETE"),
            status_reason: None,
            outputs: vec![StackOutput {
                key: String::from("ApiUrl"),
                value: String::from("https://api.example.com"),
                description: None,
            }],
        }
    }

    #[test]
    fn test_outcome_json() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let json = formatter.format_outcome(
            "app",
            &DeployOutcome::Deployed {
                operation: StackOperation::Update,
                outputs: stack().outputs,
            },
        );

        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["stack"], "app");
        assert_eq!(value["result"], "deployed");
        assert_eq!(value["operation"], "UPDATE");
        assert_eq!(value["outputs"][0]["key"], "ApiUrl");
    }

    #[test]
    fn test_no_changes_text() {
        let formatter = OutputFormatter::new(OutputFormat::Text);
        let text = formatter.format_outcome("app", &DeployOutcome::NoChanges);
        assert!(text.contains("up to date"));
    }

    #[test]
    fn test_status_text_lists_outputs() {
        let formatter = OutputFormatter::new(OutputFormat::Text);
        let text = formatter.format_status("app", Some(&stack()));
        assert!(text.contains("UPDATE_COMPLETE"));
        assert!(text.contains("ApiUrl"));
    }

    #[test]
    fn test_missing_stack_status() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let value: serde_json::Value =
            serde_json::from_str(&formatter.format_status("app", None)).expect("valid json");
        assert_eq!(value["exists"], false);
        assert!(value.get("details").is_none());
    }
}
