//! Template engine module for class generation
//!
//! Provides template parsing, block inheritance, rendering and loading.

pub mod composer;
pub mod engine;
pub mod error;
pub mod expr;
pub mod filters;
pub mod loader;
pub mod parser;
pub mod validation;

// Re-export public API
pub use composer::{compose, ResolvedBlock, ResolvedTemplate, TemplateChain, TemplateSource};
pub use engine::TemplateEngine;
pub use error::TemplateError;
pub use expr::{EvalError, Expr};
pub use filters::{CaseTransform, FilterError};
pub use loader::{TemplateLoader, TemplateSet};
pub use parser::{Block, Template, TemplateElement, TemplateParser, WhitespaceOptions};
pub use validation::ValidationEngine;
