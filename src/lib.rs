// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # stackdeploy
//!
//! Review-before-apply deployments of AWS `CloudFormation` stacks, driven by
//! change sets.
//!
//! ## Overview
//!
//! A deployment never touches the stack directly. It:
//!
//! - Inspects the existing stack and decides between CREATE and UPDATE
//! - Waits out operations already in progress
//! - Deletes stacks left behind by a failed creation
//! - Creates a change set and shows what it would do
//! - Asks for confirmation, then executes it and waits for the result
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing and validation
//! - [`cloudformation`]: Stack client capability and its AWS SDK implementation
//! - [`deploy`]: Stack classification and the deployment orchestrator
//! - [`progress`]: Progress reporters used while waiting
//! - [`prompt`]: Confirmation prompts
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! stack:
//!   name: orders-api
//!   template: template.yaml
//!   capabilities: [CAPABILITY_IAM]
//! parameters:
//!   Environment: prod
//! tags:
//!   team: platform
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod cloudformation;
pub mod config;
pub mod deploy;
pub mod error;
pub mod progress;
pub mod prompt;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use cloudformation::{CloudFormationClient, StackClient};
pub use config::{ConfigParser, ConfigValidator, DeployConfig};
pub use deploy::{DeployOutcome, DeployRequest, DeploySettings, Deployer};
pub use error::{DeployError, Error, Result};
pub use progress::{ProgressContext, ProgressReporter, WaitReason};
pub use prompt::ConfirmPrompt;
