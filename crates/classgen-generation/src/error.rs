//! Error types for class generation

use thiserror::Error;

use crate::templates::TemplateError;

/// Errors that can occur while loading inputs and generating classes
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Template loading, composition or rendering failed
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Schema file is not valid JSON for a class spec
    #[error("Invalid JSON schema: {0}")]
    SchemaJson(#[from] serde_json::Error),

    /// Schema file is not valid YAML for a class spec
    #[error("Invalid YAML schema: {0}")]
    SchemaYaml(#[from] serde_yaml::Error),

    /// Schema file extension is not recognised
    #[error("Unsupported schema format: {0}")]
    UnsupportedSchemaFormat(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration loaded but failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for generation operations
pub type Result<T> = std::result::Result<T, GenerationError>;
