//! Configuration validation for deployment files.
//!
//! Catches mistakes the service would otherwise reject only after a change
//! set has been requested.

use crate::cloudformation::Capability;
use crate::error::{ConfigError, Error, Result};
use tracing::debug;

use super::spec::{DeployConfig, KeyValueList};

/// Longest stack name the service accepts.
pub const MAX_STACK_NAME_LEN: usize = 128;

/// Largest template body that can be sent inline.
pub const MAX_TEMPLATE_BODY_BYTES: usize = 51_200;

/// Most tags a stack can carry.
pub const MAX_TAGS: usize = 50;

/// Longest change-set prefix that still leaves room for the timestamp.
pub const MAX_CHANGE_SET_PREFIX_LEN: usize = 100;

/// Validator for deployment configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a deployment configuration and, if given, its template body.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any check fails.
    pub fn validate(
        &self,
        config: &DeployConfig,
        template_body: Option<&str>,
    ) -> Result<ValidationResult> {
        let result = self.check(config, template_body);

        if let Some(first_error) = result.errors.first() {
            return Err(Error::Config(ConfigError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )));
        }

        debug!("Configuration validation passed");
        Ok(result)
    }

    /// Runs every check and collects all findings.
    #[must_use]
    pub fn check(&self, config: &DeployConfig, template_body: Option<&str>) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_stack(config, &mut result);
        Self::validate_parameters(&config.parameters, &mut result);
        Self::validate_tags(&config.tags, &mut result);

        if let Some(body) = template_body {
            Self::validate_template(body, &config.stack.capabilities, &mut result);
        }

        result
    }

    fn validate_stack(config: &DeployConfig, result: &mut ValidationResult) {
        let stack = &config.stack;

        if stack.name.is_empty() {
            result.error("stack.name", "Stack name cannot be empty");
        } else if stack.name.len() > MAX_STACK_NAME_LEN {
            result.error(
                "stack.name",
                format!("Stack name exceeds {MAX_STACK_NAME_LEN} characters"),
            );
        } else if !is_valid_stack_name(&stack.name) {
            result.error(
                "stack.name",
                format!(
                    "Stack name '{}' is invalid. Must start with a letter and contain only letters, digits and hyphens.",
                    stack.name
                ),
            );
        }

        if stack.template.as_os_str().is_empty() {
            result.error("stack.template", "Template path cannot be empty");
        }

        if let Some(region) = &stack.region
            && region.trim().is_empty()
        {
            result.error("stack.region", "Region cannot be empty when set");
        }

        if let Some(prefix) = &stack.change_set_prefix {
            if !is_valid_stack_name(prefix) {
                result.error(
                    "stack.change_set_prefix",
                    format!("Change-set prefix '{prefix}' is invalid"),
                );
            } else if prefix.len() > MAX_CHANGE_SET_PREFIX_LEN {
                result.error(
                    "stack.change_set_prefix",
                    format!("Change-set prefix exceeds {MAX_CHANGE_SET_PREFIX_LEN} characters"),
                );
            }
        }
    }

    fn validate_parameters(parameters: &KeyValueList, result: &mut ValidationResult) {
        for kv in parameters.iter() {
            if kv.key.is_empty() || !kv.key.chars().all(|c| c.is_ascii_alphanumeric()) {
                result.error(
                    format!("parameters.{}", kv.key),
                    "Parameter keys must be alphanumeric",
                );
            }
        }
    }

    fn validate_tags(tags: &KeyValueList, result: &mut ValidationResult) {
        if tags.len() > MAX_TAGS {
            result.error("tags", format!("At most {MAX_TAGS} tags are allowed"));
        }

        for kv in tags.iter() {
            if kv.key.trim().is_empty() {
                result.error("tags", "Tag keys cannot be empty");
            } else if kv.key.starts_with("aws:") {
                result.error(
                    format!("tags.{}", kv.key),
                    "Tag keys starting with 'aws:' are reserved",
                );
            }
        }
    }

    fn validate_template(body: &str, capabilities: &[Capability], result: &mut ValidationResult) {
        if body.trim().is_empty() {
            result.error("stack.template", "Template is empty");
        } else if body.len() > MAX_TEMPLATE_BODY_BYTES {
            result.error(
                "stack.template",
                format!(
                    "Template is {} bytes; inline templates are limited to {MAX_TEMPLATE_BODY_BYTES}",
                    body.len()
                ),
            );
        }

        let acknowledges_iam = capabilities
            .iter()
            .any(|c| matches!(c, Capability::Iam | Capability::NamedIam));
        if body.contains("AWS::IAM::") && !acknowledges_iam {
            result
                .warnings
                .push(String::from("Template declares IAM resources but no IAM capability is set"));
        }

        let acknowledges_macros = capabilities.contains(&Capability::AutoExpand);
        if (body.contains("Transform") || body.contains("AWS::Serverless"))
            && !acknowledges_macros
        {
            result.warnings.push(String::from(
                "Template appears to use transforms but CAPABILITY_AUTO_EXPAND is not set",
            ));
        }
    }
}

/// Returns true for names matching `[A-Za-z][-A-Za-z0-9]*`.
fn is_valid_stack_name(name: &str) -> bool {
    let mut chars = name.chars();

    let Some(first) = chars.next() else {
        return false;
    };

    first.is_ascii_alphabetic() && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

impl ValidationResult {
    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
