//! Concurrent rendering against one shared template set
//! Outputs rendered in parallel must match sequential rendering exactly

use std::sync::Arc;

use classgen_generation::{
    ClassEmitter, ClassKind, ClassSpec, MethodSpec, ParamSpec, ParamValue, TemplateSet,
};

fn struct_spec() -> ClassSpec {
    let mut spec = ClassSpec::new("Image", ClassKind::Struct);
    spec.extends = "RpcStruct".to_string();
    for (origin, value_type, external) in [
        ("value", "String", None),
        ("imageType", "ImageType", Some("ImageType")),
        ("isTemplate", "Boolean", None),
    ] {
        spec.params.push(ParamSpec::named(origin));
        spec.methods.push(MethodSpec::derive(
            origin,
            value_type.parse().unwrap(),
            &[format!("Description of {}", origin)],
            external.map(str::to_string),
            102,
        ));
    }
    spec.scripts.push("reset () {\n    return this;\n}".to_string());
    spec
}

fn enum_spec() -> ClassSpec {
    let mut spec = ClassSpec::new("ImageType", ClassKind::Enum);
    spec.extends = "Enum".to_string();
    spec.params = ["STATIC", "DYNAMIC"]
        .iter()
        .map(|key| ParamSpec::new(*key, ParamValue::Text(key.to_string())))
        .collect();
    spec
}

/// Test that rendering two classes concurrently matches sequential output
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rendering_matches_sequential() {
    let emitter = ClassEmitter::new(Arc::new(TemplateSet::builtin().unwrap()));
    let specs = [struct_spec(), enum_spec()];

    let sequential: Vec<String> = specs.iter().map(|spec| emitter.emit(spec).unwrap()).collect();

    let mut handles = Vec::new();
    for round in 0..16 {
        for (index, spec) in specs.iter().enumerate() {
            let emitter = emitter.clone();
            let spec = spec.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                (round, index, emitter.emit(&spec).unwrap())
            }));
        }
    }

    for handle in handles {
        let (round, index, output) = handle.await.unwrap();
        assert_eq!(output, sequential[index], "round {} class {} diverged", round, index);
    }
}

/// Test that the shared template set is not copied per emitter
#[test]
fn test_emitters_share_template_set() {
    let templates = Arc::new(TemplateSet::builtin().unwrap());
    let first = ClassEmitter::new(Arc::clone(&templates));
    let second = first.clone();

    assert!(Arc::ptr_eq(first.templates(), &templates));
    assert!(Arc::ptr_eq(second.templates(), &templates));
}

/// Test that emitter and template set can cross thread boundaries
#[test]
fn test_emitter_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ClassEmitter>();
    assert_send_sync::<TemplateSet>();
}
