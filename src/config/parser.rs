//! Configuration parser for loading deployment files and templates.
//!
//! Precedence, lowest to highest: the YAML file, `.env`, process
//! environment, then command-line flags (applied by the caller).

use crate::error::{ConfigError, Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::DeployConfig;

/// Overrides `stack.name`.
pub const ENV_STACK_NAME: &str = "STACKDEPLOY_STACK_NAME";

/// Overrides `stack.region`.
pub const ENV_REGION: &str = "STACKDEPLOY_REGION";

/// Overrides `stack.template`.
pub const ENV_TEMPLATE: &str = "STACKDEPLOY_TEMPLATE";

/// Configuration parser for loading deployment configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Creates a parser whose base path is the directory of `config_path`.
    #[must_use]
    pub fn for_file(config_path: &Path) -> Self {
        match config_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => Self::new().with_base_path(dir),
            _ => Self::new(),
        }
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<DeployConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(Error::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<DeployConfig> {
        debug!("Parsing YAML configuration");

        let config: DeployConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            Error::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Parsed configuration for stack: {}", config.stack.name);
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<DeployConfig> {
        let mut config = self.load_file(path)?;
        Self::apply_env_overrides(&mut config, |name| std::env::var(name).ok());
        Ok(config)
    }

    /// Applies environment overrides, reading variables through `lookup`.
    pub fn apply_env_overrides(
        config: &mut DeployConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) {
        if let Some(name) = lookup(ENV_STACK_NAME) {
            debug!("Overriding stack.name from environment");
            config.stack.name = name;
        }

        if let Some(region) = lookup(ENV_REGION) {
            debug!("Overriding stack.region from environment");
            config.stack.region = Some(region);
        }

        if let Some(template) = lookup(ENV_TEMPLATE) {
            debug!("Overriding stack.template from environment");
            config.stack.template = PathBuf::from(template);
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                Error::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Resolves a template path against the base path.
    #[must_use]
    pub fn resolve(&self, template: &Path) -> PathBuf {
        match &self.base_path {
            Some(base) if template.is_relative() => base.join(template),
            _ => template.to_path_buf(),
        }
    }

    /// Reads the template body referenced by the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::TemplateUnreadable`] if the file cannot be read.
    pub fn load_template(&self, config: &DeployConfig) -> Result<String> {
        let path = self.resolve(&config.stack.template);
        debug!("Reading template from: {}", path.display());

        std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(ConfigError::TemplateUnreadable {
                path,
                message: e.to_string(),
            })
        })
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["stackdeploy.yaml", "stackdeploy.yml", "deploy.yaml"];

/// Finds the configuration file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(Error::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}
