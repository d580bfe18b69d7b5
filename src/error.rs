//! Error types for stackdeploy.
//!
//! The [`DeployError`] family is the typed "deployment error" category: the
//! stack or change set ended up somewhere the orchestrator cannot continue
//! from. Everything else (configuration, remote service, IO) is a generic
//! failure and is surfaced to the caller unchanged.

use std::path::PathBuf;
use thiserror::Error;

use crate::cloudformation::{Stack, StackOperation};

/// The main error type for stackdeploy.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote stack service errors.
    #[error("CloudFormation error: {0}")]
    Remote(#[from] RemoteError),

    /// Typed deployment errors.
    #[error("Deployment error: {0}")]
    Deploy(#[from] DeployError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The template file could not be read.
    #[error("Failed to read template {path}: {message}")]
    TemplateUnreadable {
        /// Path to the template.
        path: PathBuf,
        /// Description of the read failure.
        message: String,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// A `KEY=VALUE` argument could not be split.
    #[error("Invalid key/value pair '{input}': expected KEY=VALUE")]
    InvalidKeyValue {
        /// The offending input.
        input: String,
    },

    /// Unknown capability name.
    #[error("Unknown capability: {name}")]
    UnknownCapability {
        /// The capability as written.
        name: String,
    },
}

/// Errors returned by the remote stack service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// A service call failed.
    #[error("{operation} failed: {message}")]
    ServiceCall {
        /// Name of the remote operation.
        operation: &'static str,
        /// Error code reported by the service, if any.
        code: Option<String>,
        /// Error message.
        message: String,
    },

    /// The service answered without a field the caller relies on.
    #[error("{operation} returned an incomplete response: missing {field}")]
    IncompleteResponse {
        /// Name of the remote operation.
        operation: &'static str,
        /// The missing field.
        field: &'static str,
    },
}

/// Typed deployment failures.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The stack exists in a status deployments cannot start from.
    #[error("Stack {} is in status {} which is not valid for starting a deployment", stack.stack_name, stack.status)]
    InvalidPreUpdateStatus {
        /// Snapshot of the offending stack.
        stack: Box<Stack>,
    },

    /// A wait finished with a status other than the operation's terminal status.
    #[error("{operation} finished with status {} (expected {})", status_of(stack.as_deref()), operation.complete_status())]
    InvalidCompletionStatus {
        /// Operation that was being waited on.
        operation: StackOperation,
        /// Final snapshot, absent if the stack no longer exists.
        stack: Option<Box<Stack>>,
    },

    /// The change set was created but cannot be executed.
    #[error("Change set is not executable (status {status}, execution status {execution_status}): {reason}")]
    ChangeSetNotExecutable {
        /// Change-set creation status.
        status: String,
        /// Change-set execution status.
        execution_status: String,
        /// Status reason reported by the service.
        reason: String,
    },
}

fn status_of(stack: Option<&Stack>) -> &str {
    stack.map_or("<absent>", |s| s.status.as_str())
}

/// Result type alias for stackdeploy operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true for the typed deployment category.
    #[must_use]
    pub const fn is_deployment_error(&self) -> bool {
        matches!(self, Self::Deploy(_))
    }

    /// Process exit code: 2 when the stack ended in a bad state, 1 otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        if self.is_deployment_error() { 2 } else { 1 }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl RemoteError {
    /// Creates a service call error.
    #[must_use]
    pub fn service(
        operation: &'static str,
        code: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ServiceCall {
            operation,
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(status: &str) -> Stack {
        Stack {
            stack_id: String::from("arn:aws:cloudformation:eu-west-1:1:stack/app/1"),
            stack_name: String::from("app"),
            status: status.to_string(),
            status_reason: None,
            outputs: vec![],
        }
    }

    #[test]
    fn test_completion_error_message_names_expected_status() {
        let err = DeployError::InvalidCompletionStatus {
            operation: StackOperation::Update,
            stack: Some(Box::new(stack("UPDATE_ROLLBACK_COMPLETE"))),
        };
        let message = err.to_string();
        assert!(message.contains("UPDATE_ROLLBACK_COMPLETE"));
        assert!(message.contains("UPDATE_COMPLETE"));
    }

    #[test]
    fn test_completion_error_with_absent_stack() {
        let err = DeployError::InvalidCompletionStatus {
            operation: StackOperation::Create,
            stack: None,
        };
        assert!(err.to_string().contains("<absent>"));
    }

    #[test]
    fn test_deployment_category() {
        let deploy: Error = DeployError::InvalidPreUpdateStatus {
            stack: Box::new(stack("UPDATE_ROLLBACK_FAILED")),
        }
        .into();
        assert!(deploy.is_deployment_error());

        let remote: Error = RemoteError::service("DescribeStacks", None, "denied").into();
        assert!(!remote.is_deployment_error());
    }

    #[test]
    fn test_exit_codes() {
        let deploy: Error = DeployError::InvalidCompletionStatus {
            operation: StackOperation::Update,
            stack: None,
        }
        .into();
        assert_eq!(deploy.exit_code(), 2);

        let config: Error = ConfigError::validation("bad name", "stack.name").into();
        assert_eq!(config.exit_code(), 1);
        assert_eq!(Error::internal("boom").exit_code(), 1);
    }
}
