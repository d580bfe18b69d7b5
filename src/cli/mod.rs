//! CLI module for stackdeploy.
//!
//! This module provides the command-line interface for deploying
//! `CloudFormation` stacks through change sets.

mod commands;
mod output;

pub use commands::{
    parse_key_value, Cli, Commands, LogFormat, OutputFormat, Overrides, ProgressStyle,
};
pub use output::OutputFormatter;
