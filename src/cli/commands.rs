//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::cloudformation::Capability;
use crate::config::DeployConfig;
use crate::error::{ConfigError, Result};

/// stackdeploy - Review-before-apply `CloudFormation` deployments.
#[derive(Parser, Debug)]
#[command(name = "stackdeploy")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "STACKDEPLOY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Log format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    /// AWS region, overriding the configuration file.
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// AWS shared-config profile.
    #[arg(long, global = true, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a change set, review it and execute it.
    Deploy {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,

        /// How to show progress while waiting.
        #[arg(long, default_value = "table")]
        progress: ProgressStyle,

        /// Values overriding the configuration file.
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Show the stack's current status and outputs.
    Status {
        /// Values overriding the configuration file.
        #[command(flatten)]
        overrides: Overrides,
    },

    /// Validate the deployment configuration and template.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,

        /// Values overriding the configuration file.
        #[command(flatten)]
        overrides: Overrides,
    },
}

/// Command-line values that take precedence over the configuration file.
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Stack name.
    #[arg(long)]
    pub stack_name: Option<String>,

    /// Template file.
    #[arg(long)]
    pub template_file: Option<PathBuf>,

    /// Template parameter as KEY=VALUE (repeatable).
    #[arg(long = "parameter", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub parameters: Vec<(String, String)>,

    /// Capability to acknowledge (repeatable).
    #[arg(long = "capability", value_name = "CAPABILITY")]
    pub capabilities: Vec<Capability>,

    /// Stack tag as KEY=VALUE (repeatable).
    #[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub tags: Vec<(String, String)>,
}

impl Overrides {
    /// Applies the overrides (and the global `--region`) to `config`.
    ///
    /// Capabilities given on the command line replace the file's list;
    /// parameters and tags are merged key by key.
    pub fn apply(&self, config: &mut DeployConfig, region: Option<&str>) {
        if let Some(name) = &self.stack_name {
            config.stack.name.clone_from(name);
        }

        if let Some(template) = &self.template_file {
            config.stack.template.clone_from(template);
        }

        if let Some(region) = region {
            config.stack.region = Some(region.to_string());
        }

        if !self.capabilities.is_empty() {
            config.stack.capabilities.clone_from(&self.capabilities);
        }

        for (key, value) in &self.parameters {
            config.parameters.set(key, value);
        }

        for (key, value) in &self.tags {
            config.tags.set(key, value);
        }
    }
}

/// Splits `KEY=VALUE` at the first `=`. The value may be empty.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidKeyValue`] if there is no `=` or the key is empty.
pub fn parse_key_value(input: &str) -> Result<(String, String)> {
    match input.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(ConfigError::InvalidKeyValue {
            input: input.to_string(),
        }
        .into()),
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable log lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Progress display options for `deploy`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ProgressStyle {
    /// Redraw a resource table.
    #[default]
    Table,
    /// Log stack events as they arrive.
    Log,
    /// No progress output.
    None,
}
