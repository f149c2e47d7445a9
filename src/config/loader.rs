//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::PolicyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading and policy updates.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for the schema.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config parsed but failed semantic validation.
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

impl ConfigError {
    /// Validation errors carried by this error, if any.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            ConfigError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

impl From<Vec<ValidationError>> for ConfigError {
    fn from(errors: Vec<ValidationError>) -> Self {
        ConfigError::Validation(errors)
    }
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<PolicyConfig, ConfigError> {
    let config: PolicyConfig = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<PolicyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}
