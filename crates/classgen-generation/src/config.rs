//! Generator configuration
//!
//! Loaded from an optional TOML, YAML or JSON file and `CLASSGEN_*`
//! environment variables. Nested keys use a double underscore, e.g.
//! `CLASSGEN_TEMPLATES__STRUCT_TEMPLATE=my_struct`.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GenerationError, Result};
use crate::models::ClassKind;
use crate::naming::DEFAULT_WRAP_WIDTH;
use crate::templates::WhitespaceOptions;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "CLASSGEN";

/// What to do when the output file already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Replace the existing file
    #[default]
    Overwrite,
    /// Leave the existing file untouched
    Skip,
}

/// Leaf template used for each class kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateNames {
    /// Leaf template for structs
    pub struct_template: String,
    /// Leaf template for enums
    pub enum_template: String,
    /// Leaf template for functions
    pub function_template: String,
}

impl Default for TemplateNames {
    fn default() -> Self {
        Self {
            struct_template: "struct_template".to_string(),
            enum_template: "enum_template".to_string(),
            function_template: "function_template".to_string(),
        }
    }
}

impl TemplateNames {
    /// Leaf template for a class kind
    pub fn for_kind(&self, kind: ClassKind) -> &str {
        match kind {
            ClassKind::Struct => &self.struct_template,
            ClassKind::Enum => &self.enum_template,
            ClassKind::Function => &self.function_template,
        }
    }
}

/// Generator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Directory whose `.tmpl` files override the shipped templates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
    /// Directory generated files are written to
    pub output_dir: PathBuf,
    /// Width budget for wrapped `@param` descriptions
    pub wrap_width: usize,
    /// Remove the newline after statement tags
    pub trim_blocks: bool,
    /// Strip indentation before statement tags
    pub lstrip_blocks: bool,
    /// Existing output file handling
    pub overwrite: OverwritePolicy,
    /// Leaf template per class kind
    pub templates: TemplateNames,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            templates_dir: None,
            output_dir: PathBuf::from("."),
            wrap_width: DEFAULT_WRAP_WIDTH,
            trim_blocks: true,
            lstrip_blocks: true,
            overwrite: OverwritePolicy::default(),
            templates: TemplateNames::default(),
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from an optional file plus the environment
    ///
    /// An explicitly given file must exist. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: GeneratorConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        debug!(?config, "Loaded generator configuration");
        Ok(config)
    }

    /// Check values that deserialize but cannot work
    pub fn validate(&self) -> Result<()> {
        if self.wrap_width == 0 {
            return Err(GenerationError::InvalidConfig(
                "wrap_width must be greater than 0".to_string(),
            ));
        }
        let names = [
            ("templates.struct_template", &self.templates.struct_template),
            ("templates.enum_template", &self.templates.enum_template),
            ("templates.function_template", &self.templates.function_template),
        ];
        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(GenerationError::InvalidConfig(format!("{} must not be empty", field)));
            }
        }
        Ok(())
    }

    /// Whitespace handling for template parsing
    pub fn whitespace(&self) -> WhitespaceOptions {
        WhitespaceOptions {
            trim_blocks: self.trim_blocks,
            lstrip_blocks: self.lstrip_blocks,
        }
    }

    /// Render as TOML
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
