//! Configuration module for stackdeploy.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `stackdeploy.yaml`
//! - Environment and `.env` overrides
//! - Loading the referenced template
//! - Validation of configuration values

mod parser;
mod spec;
mod validator;

pub use parser::{
    find_config_file, ConfigParser, DEFAULT_CONFIG_FILES, ENV_REGION, ENV_STACK_NAME,
    ENV_TEMPLATE,
};
pub use spec::{DeployConfig, KeyValue, KeyValueList, StackConfig};
pub use validator::{
    ConfigValidator, ValidationError, ValidationResult, MAX_STACK_NAME_LEN, MAX_TAGS,
    MAX_TEMPLATE_BODY_BYTES,
};
