//! Integration tests for verbatim script injection

use classgen_generation::{ClassEmitter, ClassKind, ClassSpec, MethodSpec};

const FULL_APP_ID: &str = "
        /**
         * @param {String} fullAppId
         * @return {RegisterAppInterface}
         */
        setFullAppId (fullAppId) {
            this.validateType(String, fullAppId);
            if (fullAppId !== null) {
                this._setAppId(fullAppId.toLowerCase());
            }
            return this;
        }
";

fn register_app_interface(scripts: Vec<String>) -> ClassSpec {
    let mut spec = ClassSpec::new("RegisterAppInterface", ClassKind::Function);
    spec.extends = "RpcRequest".to_string();
    spec.scripts = scripts;
    spec.methods.push(MethodSpec::derive(
        "appName",
        "String".parse().unwrap(),
        &[],
        None,
        102,
    ));
    spec
}

/// Test that scripts are re-based to the class body indentation
#[test]
fn test_script_is_reindented() {
    let spec = register_app_interface(vec![FULL_APP_ID.to_string()]);
    let output = ClassEmitter::builtin().unwrap().emit(&spec).unwrap();

    let expected = "
    /**
     * @param {String} fullAppId
     * @return {RegisterAppInterface}
     */
    setFullAppId (fullAppId) {
        this.validateType(String, fullAppId);
        if (fullAppId !== null) {
            this._setAppId(fullAppId.toLowerCase());
        }
        return this;
    }
";
    assert!(output.contains(expected));
}

/// Test that scripts keep their order and precede every generated accessor
#[test]
fn test_scripts_precede_accessors_in_order() {
    let spec = register_app_interface(vec![
        "firstScript () {}".to_string(),
        "secondScript () {}".to_string(),
    ]);
    let output = ClassEmitter::builtin().unwrap().emit(&spec).unwrap();

    let constructor = output.find("constructor (store)").unwrap();
    let first = output.find("    firstScript () {}\n").unwrap();
    let second = output.find("    secondScript () {}\n").unwrap();
    let accessor = output.find("setAppName (name)").unwrap();

    assert!(constructor < first);
    assert!(first < second);
    assert!(second < accessor);
}

/// Test that script content is emitted without interpretation
#[test]
fn test_script_content_is_opaque() {
    let script = "weird () {\n    return '{{ not a tag }}' + `${x}`;\n}";
    let spec = register_app_interface(vec![script.to_string()]);
    let output = ClassEmitter::builtin().unwrap().emit(&spec).unwrap();

    assert!(output.contains("    weird () {\n        return '{{ not a tag }}' + `${x}`;\n    }\n"));
}

/// Test that blank lines inside a script are not padded
#[test]
fn test_script_blank_lines_stay_empty() {
    let script = "a () {}\n\nb () {}";
    let spec = register_app_interface(vec![script.to_string()]);
    let output = ClassEmitter::builtin().unwrap().emit(&spec).unwrap();

    assert!(output.contains("    a () {}\n\n    b () {}\n"));
}

/// Test that non-ASCII indentation is stripped on character boundaries
#[test]
fn test_script_with_unicode_indentation() {
    let script = " foo() {\n\u{00A0}bar();\n }";
    let spec = register_app_interface(vec![script.to_string()]);
    let output = ClassEmitter::builtin().unwrap().emit(&spec).unwrap();

    assert!(output.contains("    foo() {\n    bar();\n    }\n"));
}

/// Test that trailing whitespace inside a script survives injection
#[test]
fn test_script_trailing_whitespace_is_kept() {
    let script = "banner () {\n    return `line  \n  next`;\n}";
    let spec = register_app_interface(vec![script.to_string()]);
    let output = ClassEmitter::builtin().unwrap().emit(&spec).unwrap();

    assert!(output.contains("        return `line  \n      next`;\n"));
}
