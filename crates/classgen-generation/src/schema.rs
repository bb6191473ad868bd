//! Loading class specs from serialized schema files

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{GenerationError, Result};
use crate::models::ClassSpec;

/// Serialization format of a schema file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    /// `.json`
    Json,
    /// `.yaml` or `.yml`
    Yaml,
}

impl SchemaFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(SchemaFormat::Json),
            Some("yaml") | Some("yml") => Ok(SchemaFormat::Yaml),
            _ => Err(GenerationError::UnsupportedSchemaFormat(path.display().to_string())),
        }
    }
}

/// Parse a class spec from text
pub fn parse_spec(content: &str, format: SchemaFormat) -> Result<ClassSpec> {
    let spec: ClassSpec = match format {
        SchemaFormat::Json => serde_json::from_str(content)?,
        SchemaFormat::Yaml => serde_yaml::from_str(content)?,
    };
    Ok(spec)
}

/// Read and parse a class spec file
pub fn load_spec(path: &Path) -> Result<ClassSpec> {
    let format = SchemaFormat::from_path(path)?;
    let content = fs::read_to_string(path)?;
    let spec = parse_spec(&content, format)?;
    debug!(
        path = %path.display(),
        class = %spec.name,
        kind = %spec.kind,
        methods = spec.methods.len(),
        "Loaded class spec"
    );
    Ok(spec)
}
