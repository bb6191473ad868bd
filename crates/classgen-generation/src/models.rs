//! Data models for class generation

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::naming;

/// Kind of class a spec describes; selects the template chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    /// Data structure with accessor pairs
    #[default]
    Struct,
    /// Enumeration with a frozen value map
    Enum,
    /// Request, response or notification message
    Function,
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassKind::Struct => write!(f, "struct"),
            ClassKind::Enum => write!(f, "enum"),
            ClassKind::Function => write!(f, "function"),
        }
    }
}

/// Declarative description of one generated class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSpec {
    /// Class name
    pub name: String,
    /// Kind of class
    #[serde(default)]
    pub kind: ClassKind,
    /// Class description, may be empty
    #[serde(default)]
    pub description: String,
    /// Parent type identifier, empty when the class extends nothing
    #[serde(default)]
    pub extends: String,
    /// Import statements emitted before the class
    #[serde(default)]
    pub imports: Vec<ImportSpec>,
    /// Parameter constants, in emission order
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    /// Accessor pairs, in emission order
    #[serde(default)]
    pub methods: Vec<MethodSpec>,
    /// Hand-written code fragments inserted verbatim into the class body
    #[serde(default)]
    pub scripts: Vec<String>,
    /// Function identifier used by the function layout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_id: Option<String>,
}

impl ClassSpec {
    /// Create an empty spec of the given kind
    pub fn new(name: impl Into<String>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            extends: String::new(),
            imports: Vec::new(),
            params: Vec::new(),
            methods: Vec::new(),
            scripts: Vec::new(),
            function_id: None,
        }
    }

    /// Re-wrap method descriptions to `wrap_width`
    ///
    /// Each description is joined, cleaned and wrapped again with the width
    /// reduced by the method's type and parameter name. Enum entry
    /// descriptions keep [`naming::ENTRY_WRAP_WIDTH`]. Call after
    /// [`ClassSpec::resolve_param_name_collisions`], since the parameter name
    /// affects the width.
    pub fn rewrap_descriptions(&mut self, wrap_width: usize) {
        for method in &mut self.methods {
            if method.description.is_empty() {
                continue;
            }
            let text = naming::clean_description(&[method.description.join(" ")]);
            method.description = naming::wrap_description(
                &text,
                wrap_width,
                &method.value_type.to_string(),
                &method.param_name,
            );
        }
    }

    /// Rename accessor parameters that derive to the same name
    ///
    /// Every method whose `param_name` is shared with another method falls
    /// back to its origin name.
    pub fn resolve_param_name_collisions(&mut self) {
        let names: Vec<String> = self.methods.iter().map(|m| m.param_name.clone()).collect();
        for method in &mut self.methods {
            let shared = names.iter().filter(|name| **name == method.param_name).count() > 1;
            if shared && !method.origin.is_empty() {
                debug!(
                    class = %self.name,
                    param = %method.param_name,
                    origin = %method.origin,
                    "Parameter name collision, using origin name"
                );
                method.param_name = method.origin.clone();
            }
        }
    }
}

/// Import statement: `import { what } from 'wherefrom';`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSpec {
    /// Imported symbol
    pub what: String,
    /// Module path
    pub wherefrom: String,
}

/// Named parameter constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Symbolic constant name
    pub key: String,
    /// Constant value
    pub value: ParamValue,
    /// Doc lines for enum entry getters, possibly empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub description: Vec<String>,
}

impl ParamSpec {
    /// Parameter constant without a description
    pub fn new(key: impl Into<String>, value: ParamValue) -> Self {
        Self {
            key: key.into(),
            value,
            description: Vec::new(),
        }
    }

    /// Parameter whose value is the quoted schema name: `KEY_TEXT = 'text'`
    pub fn named(origin: &str) -> Self {
        Self::new(naming::constant_key(origin), ParamValue::Text(origin.to_string()))
    }

    /// Attach description lines, cleaned and wrapped to the entry width
    pub fn with_description(mut self, description: &[String]) -> Self {
        self.description = naming::wrap(
            &naming::clean_description(description),
            naming::ENTRY_WRAP_WIDTH,
        );
        self
    }
}

/// Value of a parameter constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Numeric literal, emitted as is
    Number(serde_json::Number),
    /// Text literal, emitted in single quotes
    Text(String),
    /// Raw expression emitted verbatim: `{"ref": "OtherEnum.VALUE"}`
    Reference {
        /// Expression text
        #[serde(rename = "ref")]
        reference: String,
    },
}

impl ParamValue {
    /// Source literal for this value
    pub fn literal(&self) -> String {
        match self {
            ParamValue::Number(n) => js_number(n),
            ParamValue::Text(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            ParamValue::Reference { reference } => reference.clone(),
        }
    }

    /// Value as compared by `valueForString`: the unquoted text form
    pub fn as_lookup_string(&self) -> String {
        match self {
            ParamValue::Number(n) => js_number(n),
            ParamValue::Text(s) => s.clone(),
            ParamValue::Reference { reference } => reference.clone(),
        }
    }

    /// Type tag for doc comments
    pub fn type_tag(&self) -> &'static str {
        match self {
            ParamValue::Number(_) => "Number",
            ParamValue::Text(_) => "String",
            ParamValue::Reference { .. } => "Object",
        }
    }
}

/// Number text as JavaScript's `String(n)` prints it: `2.0` -> `2`
fn js_number(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => {
            if f == 0.0 {
                "0".to_string()
            } else {
                format!("{:.0}", f)
            }
        }
        _ => n.to_string(),
    }
}

/// Scalar value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// Text
    String,
    /// Integer or floating point number
    Number,
    /// Boolean flag
    Boolean,
}

/// Type of a generated accessor's value
///
/// Serialized as its type tag: `String`, `Number`, `Boolean`, `Array<T>` or a
/// named type such as `Image`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ValueType {
    /// Built-in scalar
    Scalar(ScalarKind),
    /// Homogeneous array
    Array(Box<ValueType>),
    /// Struct or enum defined elsewhere
    Named(String),
}

impl ValueType {
    /// Whether this is the given scalar kind
    pub fn is_scalar(&self, kind: ScalarKind) -> bool {
        matches!(self, ValueType::Scalar(k) if *k == kind)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Scalar(ScalarKind::String) => write!(f, "String"),
            ValueType::Scalar(ScalarKind::Number) => write!(f, "Number"),
            ValueType::Scalar(ScalarKind::Boolean) => write!(f, "Boolean"),
            ValueType::Array(element) => write!(f, "Array<{}>", element),
            ValueType::Named(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        for prefix in ["Array<", "List<"] {
            if let Some(inner) = s.strip_prefix(prefix) {
                let inner = inner
                    .strip_suffix('>')
                    .ok_or_else(|| format!("unterminated array type `{}`", s))?;
                return Ok(ValueType::Array(Box::new(inner.parse()?)));
            }
        }
        match s {
            "String" => Ok(ValueType::Scalar(ScalarKind::String)),
            "Number" | "Integer" | "Float" | "Double" => Ok(ValueType::Scalar(ScalarKind::Number)),
            "Boolean" => Ok(ValueType::Scalar(ScalarKind::Boolean)),
            name if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') => {
                Ok(ValueType::Named(name.to_string()))
            }
            other => Err(format!("invalid type `{}`", other)),
        }
    }
}

impl TryFrom<String> for ValueType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ValueType> for String {
    fn from(value: ValueType) -> Self {
        value.to_string()
    }
}

/// One generated setter/getter pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSpec {
    /// Parameter constant key the accessors read and write
    pub key: String,
    /// Accessor argument name
    pub param_name: String,
    /// Value type
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Suffix of the `set`/`get` method names
    pub method_title: String,
    /// Doc comment lines
    #[serde(default)]
    pub description: Vec<String>,
    /// Foreign type stored under the key, if any
    #[serde(default)]
    pub external: Option<String>,
    /// Schema parameter name the method was derived from
    #[serde(default)]
    pub origin: String,
}

impl MethodSpec {
    /// Derive a method from a schema parameter name
    ///
    /// # Arguments
    /// * `origin` - Parameter name as written in the schema, e.g. `fullAppID`
    /// * `value_type` - Value type
    /// * `description` - Raw description lines; cleaned and wrapped
    /// * `external` - Foreign type stored under the key
    /// * `wrap_width` - Width budget for description lines
    pub fn derive(
        origin: &str,
        value_type: ValueType,
        description: &[String],
        external: Option<String>,
        wrap_width: usize,
    ) -> Self {
        let param_name = naming::param_name(origin);
        let description = naming::wrap_description(
            &naming::clean_description(description),
            wrap_width,
            &value_type.to_string(),
            &param_name,
        );
        Self {
            key: naming::constant_key(origin),
            param_name,
            value_type,
            method_title: naming::method_title(origin),
            description,
            external,
            origin: origin.to_string(),
        }
    }

    /// Decide how the accessor pair validates, stores and reads its value
    pub fn plan(&self) -> Result<AccessorPlan, PlanError> {
        AccessorPlan::decide(&self.value_type, self.external.as_deref())
    }
}

/// Where the setter stores the value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// `setParameter(KEY, value)`
    Parameter,
    /// `setValue(KEY, value)` for foreign objects
    Object,
}

/// How the getter reads the value back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadAccessor {
    /// `getParameter(KEY)`
    Parameter,
    /// `getObject(Type, KEY)`
    Object(String),
}

/// Accessor decision for one method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorPlan {
    /// Setter storage
    pub storage: Storage,
    /// Type the setter validates against, if any
    pub validate: Option<String>,
    /// Getter accessor
    pub read: ReadAccessor,
}

/// Method spec the decision table cannot handle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// `external` is present but empty
    #[error("external type is empty")]
    EmptyExternal,
    /// Named type without a foreign type to validate against
    #[error("named type `{0}` requires an external type")]
    UnresolvedNamedType(String),
}

impl PlanError {
    /// Method field the error is about
    pub fn field(&self) -> &'static str {
        match self {
            PlanError::EmptyExternal => "external",
            PlanError::UnresolvedNamedType(_) => "type",
        }
    }
}

impl AccessorPlan {
    /// Evaluate the decision table; the first matching row wins
    ///
    /// | type              | external | storage   | validation     |
    /// |-------------------|----------|-----------|----------------|
    /// | Number, Boolean   | any      | parameter | none           |
    /// | `Array<T>`        | any      | parameter | none           |
    /// | any               | `F`      | object    | `F`            |
    /// | String            | none     | parameter | `String`       |
    ///
    /// Reads go through `getObject(F, ..)` whenever `external` is set.
    pub fn decide(value_type: &ValueType, external: Option<&str>) -> Result<Self, PlanError> {
        if external == Some("") {
            return Err(PlanError::EmptyExternal);
        }
        let read = match external {
            Some(foreign) => ReadAccessor::Object(foreign.to_string()),
            None => ReadAccessor::Parameter,
        };

        match (value_type, external) {
            (ValueType::Scalar(ScalarKind::Number | ScalarKind::Boolean), _) | (ValueType::Array(_), _) => {
                Ok(Self {
                    storage: Storage::Parameter,
                    validate: None,
                    read,
                })
            }
            (ValueType::Scalar(ScalarKind::String) | ValueType::Named(_), Some(foreign)) => Ok(Self {
                storage: Storage::Object,
                validate: Some(foreign.to_string()),
                read,
            }),
            (ValueType::Scalar(ScalarKind::String), None) => Ok(Self {
                storage: Storage::Parameter,
                validate: Some("String".to_string()),
                read,
            }),
            (ValueType::Named(name), None) => Err(PlanError::UnresolvedNamedType(name.clone())),
        }
    }
}
