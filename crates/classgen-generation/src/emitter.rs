//! Class emitter
//!
//! Turns a [`ClassSpec`] into the JSON context the templates expect, runs the
//! accessor decision table for every method and renders the resolved chain.
//! The emitter only holds the immutable template set, so one instance can be
//! shared across threads and render many classes concurrently.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::TemplateNames;
use crate::models::{ClassKind, ClassSpec, ImportSpec, MethodSpec, ReadAccessor, Storage};
use crate::naming;
use crate::templates::{TemplateChain, TemplateEngine, TemplateError, TemplateSet};

/// Renders class specs against a shared template set
#[derive(Debug, Clone)]
pub struct ClassEmitter {
    templates: Arc<TemplateSet>,
    names: TemplateNames,
}

impl ClassEmitter {
    /// Create an emitter over a template set with the default leaf names
    pub fn new(templates: Arc<TemplateSet>) -> Self {
        Self {
            templates,
            names: TemplateNames::default(),
        }
    }

    /// Create an emitter over the templates shipped with the crate
    pub fn builtin() -> Result<Self, TemplateError> {
        Ok(Self::new(Arc::new(TemplateSet::builtin()?)))
    }

    /// Use other leaf templates per class kind
    pub fn with_template_names(mut self, names: TemplateNames) -> Self {
        self.names = names;
        self
    }

    /// Shared template set
    pub fn templates(&self) -> &Arc<TemplateSet> {
        &self.templates
    }

    /// Chain used for a class kind, built from the configured leaf
    pub fn chain_for(&self, kind: ClassKind) -> Result<TemplateChain, TemplateError> {
        self.templates.chain_for(self.names.for_kind(kind))
    }

    /// Render a class with the chain configured for its kind
    pub fn emit(&self, spec: &ClassSpec) -> Result<String, TemplateError> {
        let chain = self.chain_for(spec.kind)?;
        self.render(spec, &chain)
    }

    /// Render a class through an explicit template chain
    ///
    /// Pure: no file system access. Fails with `MissingBlock`, `Resolution`
    /// or `Render`; on failure no text is returned.
    pub fn render(&self, spec: &ClassSpec, chain: &TemplateChain) -> Result<String, TemplateError> {
        let resolved = self.templates.resolve(chain)?;
        let context = build_context(spec, chain)?;

        if spec.kind == ClassKind::Enum {
            let table = EnumTable::from_spec(spec);
            for (key, value) in table.duplicates() {
                warn!(
                    class = %spec.name,
                    key = %key,
                    value = %value,
                    "Duplicate enum value, valueForString returns the first declared key"
                );
            }
        }

        let output = TemplateEngine::new(&resolved).render(&spec.name, &context)?;
        debug!(class = %spec.name, chain = %chain, bytes = output.len(), "Rendered class");
        Ok(output)
    }
}

#[derive(Serialize)]
struct ClassContext<'a> {
    name: &'a str,
    kind: ClassKind,
    description: &'a str,
    extends: &'a str,
    func: &'a str,
    imports: &'a [ImportSpec],
    scripts: &'a [String],
    params: Vec<ParamContext>,
    methods: Vec<MethodContext<'a>>,
}

#[derive(Serialize)]
struct ParamContext {
    key: String,
    value: String,
    raw: String,
    #[serde(rename = "type")]
    type_tag: &'static str,
    description: Vec<String>,
}

#[derive(Serialize)]
struct MethodContext<'a> {
    key: &'a str,
    param_name: &'a str,
    #[serde(rename = "type")]
    value_type: String,
    method_title: &'a str,
    description: &'a [String],
    external: Option<&'a str>,
    origin: &'a str,
    validate_type: Option<String>,
    object_keyed: bool,
    read_type: Option<String>,
}

fn method_context<'a>(
    spec: &ClassSpec,
    chain: &TemplateChain,
    index: usize,
    method: &'a MethodSpec,
) -> Result<MethodContext<'a>, TemplateError> {
    let plan = method.plan().map_err(|err| TemplateError::Render {
        class: spec.name.clone(),
        template: chain.leaf().to_string(),
        block: None,
        variable: format!("methods[{}].{}", index, err.field()),
        message: err.to_string(),
    })?;

    Ok(MethodContext {
        key: &method.key,
        param_name: &method.param_name,
        value_type: method.value_type.to_string(),
        method_title: &method.method_title,
        description: &method.description,
        external: method.external.as_deref(),
        origin: &method.origin,
        validate_type: plan.validate,
        object_keyed: plan.storage == Storage::Object,
        read_type: match plan.read {
            ReadAccessor::Object(foreign) => Some(foreign),
            ReadAccessor::Parameter => None,
        },
    })
}

/// Template context for a class spec
fn build_context(spec: &ClassSpec, chain: &TemplateChain) -> Result<Map<String, Value>, TemplateError> {
    let methods = spec
        .methods
        .iter()
        .enumerate()
        .map(|(index, method)| method_context(spec, chain, index, method))
        .collect::<Result<Vec<_>, _>>()?;

    let params = spec
        .params
        .iter()
        .map(|param| ParamContext {
            key: param.key.clone(),
            value: param.value.literal(),
            raw: param.value.as_lookup_string(),
            type_tag: param.value.type_tag(),
            description: param.description.clone(),
        })
        .collect();

    let context = ClassContext {
        name: &spec.name,
        kind: spec.kind,
        description: &spec.description,
        extends: &spec.extends,
        func: spec
            .function_id
            .as_deref()
            .unwrap_or_else(|| naming::strip_id_suffix(&spec.name)),
        imports: &spec.imports,
        scripts: &spec.scripts,
        params,
        methods,
    };

    match serde_json::to_value(&context) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(context_error(spec, chain, "context is not a mapping".to_string())),
        Err(err) => Err(context_error(spec, chain, err.to_string())),
    }
}

fn context_error(spec: &ClassSpec, chain: &TemplateChain, message: String) -> TemplateError {
    TemplateError::Render {
        class: spec.name.clone(),
        template: chain.leaf().to_string(),
        block: None,
        variable: "context".to_string(),
        message,
    }
}

/// Reverse lookup table of an enum class
///
/// Mirrors the emitted `valueForString`: entries are scanned in declaration
/// order and compared by their string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumTable {
    entries: Vec<(String, String)>,
}

impl EnumTable {
    /// Build the table from an enum spec's params
    pub fn from_spec(spec: &ClassSpec) -> Self {
        Self {
            entries: spec
                .params
                .iter()
                .map(|param| (param.key.clone(), param.value.as_lookup_string()))
                .collect(),
        }
    }

    /// Keys in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Key of the first entry whose value's string form equals `value`
    pub fn value_for_string(&self, value: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, candidate)| candidate == value)
            .map(|(key, _)| key.as_str())
    }

    /// Entries shadowed by an earlier key with the same value, as `(key, value)`
    pub fn duplicates(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(i, (_, value))| self.entries[..*i].iter().any(|(_, earlier)| earlier == value))
            .map(|(_, (key, value))| (key.as_str(), value.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ParamSpec, ParamValue};

    fn enum_spec() -> ClassSpec {
        let mut spec = ClassSpec::new("Light", ClassKind::Enum);
        spec.extends = "Enum".to_string();
        spec.params = vec![
            ParamSpec::new("FOO", ParamValue::Number(1.into())),
            ParamSpec::new("BAR", ParamValue::Number(2.into())),
            ParamSpec::new("BAZ", ParamValue::Text("2".to_string())),
        ];
        spec
    }

    #[test]
    fn test_enum_table_lookup() {
        let table = EnumTable::from_spec(&enum_spec());
        assert_eq!(table.value_for_string("2"), Some("BAR"));
        assert_eq!(table.value_for_string("1"), Some("FOO"));
        assert_eq!(table.value_for_string("3"), None);
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["FOO", "BAR", "BAZ"]);
    }

    #[test]
    fn test_enum_table_duplicates() {
        let table = EnumTable::from_spec(&enum_spec());
        assert_eq!(table.duplicates(), vec![("BAZ", "2")]);
    }

    #[test]
    fn test_context_fields() {
        let mut spec = ClassSpec::new("RegisterAppInterface", ClassKind::Function);
        spec.methods.push(MethodSpec::derive(
            "appIcon",
            "Image".parse().unwrap(),
            &[],
            Some("Image".to_string()),
            102,
        ));
        let chain = TemplateChain::new("base_template");
        let context = build_context(&spec, &chain).unwrap();

        assert_eq!(context["func"], "RegisterAppInterface");
        assert_eq!(context["methods"][0]["validate_type"], "Image");
        assert_eq!(context["methods"][0]["object_keyed"], true);
        assert_eq!(context["methods"][0]["read_type"], "Image");
        assert_eq!(context["methods"][0]["type"], "Image");
    }

    #[test]
    fn test_function_id_default_strips_id_suffix() {
        let mut spec = ClassSpec::new("OnAppID", ClassKind::Function);
        let chain = TemplateChain::new("base_template");
        assert_eq!(build_context(&spec, &chain).unwrap()["func"], "OnApp");

        spec.function_id = Some("OnAppInterfaceUnregistered".to_string());
        assert_eq!(
            build_context(&spec, &chain).unwrap()["func"],
            "OnAppInterfaceUnregistered"
        );
    }

    #[test]
    fn test_decision_table_failure_names_method_field() {
        let mut spec = ClassSpec::new("Broken", ClassKind::Struct);
        spec.methods.push(MethodSpec::derive("text", "String".parse().unwrap(), &[], None, 102));
        spec.methods.push(MethodSpec::derive("icon", "Image".parse().unwrap(), &[], None, 102));

        let err = build_context(&spec, &TemplateChain::new("base_template")).unwrap_err();
        match err {
            TemplateError::Render { class, variable, .. } => {
                assert_eq!(class, "Broken");
                assert_eq!(variable, "methods[1].type");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
