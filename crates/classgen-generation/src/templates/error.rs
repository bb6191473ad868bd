//! Error types for template loading, composition and rendering

use thiserror::Error;

/// Errors raised by the template layer
///
/// `MissingBlock`, `Resolution` and `Render` are the only kinds a render call
/// can produce. The remaining variants surface while templates are loaded.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A block declared `required` has no definition in any layer of the chain
    #[error("Missing block `{block}` in template chain ending at `{template}`")]
    MissingBlock {
        /// Most specific template of the chain
        template: String,
        /// Name of the undefined block
        block: String,
    },

    /// Extension cycle, unknown template or unresolvable `super()` reference
    #[error("Resolution error in template `{template}`{}: {message}", fmt_block(.block))]
    Resolution {
        /// Template where resolution failed
        template: String,
        /// Block being resolved, if any
        block: Option<String>,
        /// What went wrong
        message: String,
    },

    /// Undefined variable, incompatible filter input or invalid method spec
    #[error(
        "Render error for class `{class}` in template `{template}`{}: `{variable}`: {message}",
        fmt_block(.block)
    )]
    Render {
        /// Name of the class being rendered
        class: String,
        /// Most specific template of the chain
        template: String,
        /// Block being rendered, if the failure happened inside one
        block: Option<String>,
        /// Offending variable, expression or schema field
        variable: String,
        /// What went wrong
        message: String,
    },

    /// Invalid template syntax
    #[error("Invalid template syntax in `{template}` at line {line}: {message}")]
    InvalidSyntax {
        /// Template being parsed
        template: String,
        /// Line number where the syntax error occurred
        line: usize,
        /// Error message describing the syntax issue
        message: String,
    },

    /// Template set failed a load-time check
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Template not found in the template set
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// IO error while reading template files
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

fn fmt_block(block: &Option<String>) -> String {
    match block {
        Some(name) => format!(", block `{}`", name),
        None => String::new(),
    }
}

impl TemplateError {
    /// Shorthand for a resolution failure
    pub fn resolution(
        template: impl Into<String>,
        block: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        TemplateError::Resolution {
            template: template.into(),
            block: block.map(str::to_string),
            message: message.into(),
        }
    }

    /// Name of the block the error points at, if any
    pub fn block(&self) -> Option<&str> {
        match self {
            TemplateError::MissingBlock { block, .. } => Some(block),
            TemplateError::Resolution { block, .. } | TemplateError::Render { block, .. } => {
                block.as_deref()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_message_names_block_and_variable() {
        let err = TemplateError::Render {
            class: "SoftButton".to_string(),
            template: "struct_template".to_string(),
            block: Some("body".to_string()),
            variable: "e.colour".to_string(),
            message: "undefined variable".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("SoftButton"));
        assert!(message.contains("block `body`"));
        assert!(message.contains("e.colour"));
        assert_eq!(err.block(), Some("body"));
    }

    #[test]
    fn test_resolution_error_without_block() {
        let err = TemplateError::resolution("a", None, "extension cycle: a -> b -> a");
        assert_eq!(
            err.to_string(),
            "Resolution error in template `a`: extension cycle: a -> b -> a"
        );
        assert_eq!(err.block(), None);
    }
}
