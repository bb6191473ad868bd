#![warn(missing_docs)]

//! Class source generation for classgen
//!
//! Renders complete class source text from a declarative [`ClassSpec`]:
//! block-inheriting templates are composed into a single resolved template,
//! accessor pairs are planned with a fixed decision table and the result is
//! rendered against a JSON view of the class spec.
//!
//! ```no_run
//! use classgen_generation::{ClassEmitter, ClassKind, ClassSpec, MethodSpec};
//!
//! let mut spec = ClassSpec::new("SoftButton", ClassKind::Struct);
//! spec.extends = "RpcStruct".to_string();
//! spec.methods.push(MethodSpec::derive(
//!     "text",
//!     "String".parse().unwrap(),
//!     &["The button label".to_string()],
//!     None,
//!     102,
//! ));
//!
//! let emitter = ClassEmitter::builtin().unwrap();
//! let source = emitter.emit(&spec).unwrap();
//! assert!(source.contains("setText (text)"));
//! ```

pub mod config;
pub mod emitter;
pub mod error;
pub mod models;
pub mod naming;
pub mod schema;
pub mod templates;

// Re-export public API
pub use crate::config::{GeneratorConfig, OverwritePolicy, TemplateNames};
pub use emitter::{ClassEmitter, EnumTable};
pub use error::{GenerationError, Result};
pub use models::{
    AccessorPlan, ClassKind, ClassSpec, ImportSpec, MethodSpec, ParamSpec, ParamValue, PlanError,
    ReadAccessor, ScalarKind, Storage, ValueType,
};
pub use schema::{load_spec, parse_spec, SchemaFormat};
pub use templates::{
    compose, ResolvedTemplate, TemplateChain, TemplateEngine, TemplateError, TemplateLoader,
    TemplateSet, ValidationEngine, WhitespaceOptions,
};
