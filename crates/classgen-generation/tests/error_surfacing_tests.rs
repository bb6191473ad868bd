//! Integration tests for render-time error reporting
//! Errors name the template, block and variable and never return partial text

use classgen_generation::{
    ClassEmitter, ClassKind, ClassSpec, TemplateChain, TemplateEngine, TemplateError, TemplateLoader,
    TemplateSet,
};
use serde_json::{json, Map, Value};

fn set(templates: &[(&str, &str)]) -> TemplateSet {
    let mut loader = TemplateLoader::default();
    for (name, content) in templates {
        loader.add_template(name, content).unwrap();
    }
    loader.build()
}

fn context(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Test that a required block absent from every layer is reported by name
#[test]
fn test_missing_required_block() {
    let templates = set(&[
        ("base", "{% block head %}h{% endblock %}{% block body required %}{% endblock %}"),
        ("child", "{% extends \"base\" %}{% block head %}H{% endblock %}"),
    ]);

    let err = templates.resolve(&templates.chain_for("child").unwrap()).unwrap_err();
    match err {
        TemplateError::MissingBlock { template, block } => {
            assert_eq!(template, "child");
            assert_eq!(block, "body");
        }
        other => panic!("expected missing block, got {:?}", other),
    }
}

/// Test that the shipped accessor layout requires a constructor
#[test]
fn test_builtin_layout_without_constructor() {
    let emitter = ClassEmitter::builtin().unwrap();
    let chain = TemplateChain::new("base_template").with_override("base_struct_function");
    let spec = ClassSpec::new("Orphan", ClassKind::Struct);

    let err = emitter.render(&spec, &chain).unwrap_err();
    assert!(matches!(
        err,
        TemplateError::MissingBlock { ref block, .. } if block == "constructor"
    ));
    assert_eq!(err.block(), Some("constructor"));
}

/// Test that an undefined variable fails with the block and variable name
#[test]
fn test_undefined_variable() {
    let templates = set(&[(
        "base",
        "start\n{% block body %}before {{ missing }} after{% endblock %}\nend",
    )]);
    let resolved = templates.resolve(&TemplateChain::new("base")).unwrap();

    let err = TemplateEngine::new(&resolved)
        .render("Widget", &Map::new())
        .unwrap_err();
    match &err {
        TemplateError::Render {
            class,
            template,
            block,
            variable,
            ..
        } => {
            assert_eq!(class, "Widget");
            assert_eq!(template, "base");
            assert_eq!(block.as_deref(), Some("body"));
            assert_eq!(variable, "missing");
        }
        other => panic!("expected render error, got {:?}", other),
    }

    let message = err.to_string();
    assert!(message.contains("Widget"));
    assert!(message.contains("body"));
    assert!(message.contains("missing"));
}

/// Test that undefined attributes of loop variables are reported
#[test]
fn test_undefined_attribute_in_loop() {
    let templates = set(&[(
        "base",
        "{% block body %}{% for m in methods %}{{ m.key }}{{ m.title }}{% endfor %}{% endblock %}",
    )]);
    let resolved = templates.resolve(&TemplateChain::new("base")).unwrap();
    let ctx = context(json!({"methods": [{"key": "A"}]}));

    let err = TemplateEngine::new(&resolved).render("Widget", &ctx).unwrap_err();
    assert!(matches!(
        err,
        TemplateError::Render { ref variable, .. } if variable.contains("title")
    ));
}

/// Test that a filter applied to the wrong type is a render error
#[test]
fn test_filter_type_mismatch() {
    let templates = set(&[("base", "{% block body %}{{ count|title }}{% endblock %}")]);
    let resolved = templates.resolve(&TemplateChain::new("base")).unwrap();
    let ctx = context(json!({"count": 3}));

    let err = TemplateEngine::new(&resolved).render("Widget", &ctx).unwrap_err();
    assert!(matches!(err, TemplateError::Render { ref block, .. } if block.as_deref() == Some("body")));
}

/// Test that an explicit default suppresses the undefined error
#[test]
fn test_default_filter_and_defined_test() {
    let templates = set(&[(
        "base",
        "{{ missing|default(\"none\") }}/{% if missing is defined %}yes{% else %}no{% endif %}",
    )]);
    let resolved = templates.resolve(&TemplateChain::new("base")).unwrap();

    let output = TemplateEngine::new(&resolved).render("Widget", &Map::new()).unwrap();
    assert_eq!(output, "none/no");
}

/// Test that resolution errors name the offending template
#[test]
fn test_resolution_errors() {
    let templates = set(&[
        ("a", "{% extends \"b\" %}"),
        ("b", "{% extends \"a\" %}"),
        ("orphan", "{% extends \"nowhere\" %}"),
        ("base", "{% block body %}x{% endblock %}"),
        ("lonely", "{% extends \"base\" %}{% block other %}{{ super() }}{% endblock %}"),
    ]);

    let err = templates.chain_for("a").unwrap_err();
    assert!(matches!(err, TemplateError::Resolution { ref message, .. } if message.contains("cycle")));

    let err = templates.chain_for("orphan").unwrap_err();
    assert!(matches!(err, TemplateError::Resolution { ref message, .. } if message.contains("nowhere")));

    let err = templates
        .resolve(&TemplateChain::new("base").with_override("base"))
        .unwrap_err();
    assert!(matches!(err, TemplateError::Resolution { .. }));

    let err = templates
        .resolve(&TemplateChain::new("base").with_override("lonely"))
        .unwrap_err();
    match err {
        TemplateError::Resolution { template, block, .. } => {
            assert_eq!(template, "lonely");
            assert_eq!(block.as_deref(), Some("other"));
        }
        other => panic!("expected resolution error, got {:?}", other),
    }
}
