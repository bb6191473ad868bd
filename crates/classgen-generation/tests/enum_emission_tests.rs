//! Integration tests for enum emission and reverse lookup

use classgen_generation::{ClassEmitter, ClassKind, ClassSpec, EnumTable, ParamSpec, ParamValue};

fn param(key: &str, value: ParamValue) -> ParamSpec {
    ParamSpec::new(key, value)
}

fn foo_bar() -> ClassSpec {
    let mut spec = ClassSpec::new("Light", ClassKind::Enum);
    spec.extends = "Enum".to_string();
    spec.params = vec![
        param("FOO", ParamValue::Number(1.into())),
        param("BAR", ParamValue::Number(2.into())),
    ];
    spec
}

fn described_foo_bar() -> ClassSpec {
    let mut spec = foo_bar();
    spec.params[0] = param("FOO", ParamValue::Number(1.into()))
        .with_description(&["The first   light mode".to_string()]);
    spec
}

/// Test the complete output for a two-entry enum
#[test]
fn test_enum_full_output() {
    let expected = "\
/* Generated by classgen. Do not edit. */

/**
 * @typedef {Enum} Light
 * @property {Object} _MAP
 */
class Light extends Enum {
    /**
     * @constructor
     */
    constructor () {
        super();
    }

    /**
     * The first light mode
     * @return {Number}
     */
    static get FOO () {
        return Light._MAP.FOO;
    }

    /**
     * @return {Number}
     */
    static get BAR () {
        return Light._MAP.BAR;
    }

    /**
     * Get the key whose value matches, in declaration order
     * @param {String} value
     * @return {null|String} - Returns null if no enum value matches
     */
    static valueForString (value) {
        for (const key in Light._MAP) {
            if (String(Light._MAP[key]) === value) {
                return key;
            }
        }
        return null;
    }
}

Light._MAP = Object.freeze({
    'FOO': 1,
    'BAR': 2,
});

export { Light };
";
    let output = ClassEmitter::builtin().unwrap().emit(&described_foo_bar()).unwrap();
    assert_eq!(output, expected);
}

/// Test that text values are quoted and references emitted verbatim
#[test]
fn test_enum_value_literals() {
    let mut spec = ClassSpec::new("FileType", ClassKind::Enum);
    spec.extends = "Enum".to_string();
    spec.description = "Enumeration listing possible file types".to_string();
    spec.params = vec![
        param("GRAPHIC_BMP", ParamValue::Text("GRAPHIC_BMP".to_string())),
        param(
            "AUDIO_MP3",
            ParamValue::Reference {
                reference: "AudioType.MP3".to_string(),
            },
        ),
    ];

    let output = ClassEmitter::builtin().unwrap().emit(&spec).unwrap();
    assert!(output.contains("/**\n * Enumeration listing possible file types\n * @typedef {Enum} FileType\n"));
    assert!(output.contains("    'GRAPHIC_BMP': 'GRAPHIC_BMP',\n    'AUDIO_MP3': AudioType.MP3,\n"));
    assert!(output.contains("     * @return {String}\n     */\n    static get GRAPHIC_BMP () {"));
    assert!(output.contains("     * @return {Object}\n     */\n    static get AUDIO_MP3 () {"));
}

/// Test reverse lookup on the literal text form of a value
#[test]
fn test_value_for_string() {
    let table = EnumTable::from_spec(&foo_bar());
    assert_eq!(table.value_for_string("2"), Some("BAR"));
    assert_eq!(table.value_for_string("1"), Some("FOO"));
    assert_eq!(table.value_for_string("BAR"), None);
    assert_eq!(table.value_for_string(""), None);
}

/// Test the duplicate value policy: the first declared key wins
///
/// The generated `valueForString` iterates `_MAP` in insertion order, which
/// holds as long as keys are not integer-like.
#[test]
fn test_duplicate_values_first_declared_wins() {
    let mut spec = foo_bar();
    spec.params.push(param("ALSO_BAR", ParamValue::Text("2".to_string())));

    let table = EnumTable::from_spec(&spec);
    assert_eq!(table.value_for_string("2"), Some("BAR"));
    assert_eq!(table.duplicates(), vec![("ALSO_BAR", "2")]);

    let output = ClassEmitter::builtin().unwrap().emit(&spec).unwrap();
    let bar = output.find("'BAR': 2,").unwrap();
    let also_bar = output.find("'ALSO_BAR': '2',").unwrap();
    assert!(bar < also_bar);
}

/// Test an enum without entries
#[test]
fn test_empty_enum() {
    let mut spec = ClassSpec::new("Empty", ClassKind::Enum);
    spec.extends = "Enum".to_string();

    let output = ClassEmitter::builtin().unwrap().emit(&spec).unwrap();
    assert!(output.contains("Empty._MAP = Object.freeze({\n});\n"));
    assert!(!output.contains("static get"));
    assert_eq!(EnumTable::from_spec(&spec).value_for_string("1"), None);
}

/// Test that a whole-number float is emitted and looked up as an integer
#[test]
fn test_whole_float_value_matches_emitted_lookup() {
    let mut spec = ClassSpec::new("Version", ClassKind::Enum);
    spec.extends = "Enum".to_string();
    let value: ParamValue = serde_json::from_str("2.0").unwrap();
    spec.params = vec![param("FOO", value)];

    let output = ClassEmitter::builtin().unwrap().emit(&spec).unwrap();
    assert!(output.contains("    'FOO': 2,\n"));
    assert_eq!(EnumTable::from_spec(&spec).value_for_string("2"), Some("FOO"));
    assert_eq!(EnumTable::from_spec(&spec).value_for_string("2.0"), None);
}

/// Test that long entry descriptions wrap onto several doc lines
#[test]
fn test_entry_description_wraps() {
    let words = vec!["word"; 30].join(" ");
    let entry = param("FOO", ParamValue::Number(1.into())).with_description(&[words]);
    assert_eq!(entry.description.len(), 2);
    assert!(entry.description.iter().all(|line| line.len() <= 113));

    let mut spec = foo_bar();
    spec.params[0] = entry.clone();
    let output = ClassEmitter::builtin().unwrap().emit(&spec).unwrap();
    let doc = format!(
        "    /**\n     * {}\n     * {}\n     * @return {{Number}}\n",
        entry.description[0], entry.description[1]
    );
    assert!(output.contains(&doc));
}

/// Test that entry descriptions load from a schema document
#[test]
fn test_entry_description_from_json() {
    let entry: ParamSpec =
        serde_json::from_str(r#"{"key": "ON", "value": "ON", "description": ["Light is on"]}"#).unwrap();
    assert_eq!(entry.description, vec!["Light is on"]);

    let bare: ParamSpec = serde_json::from_str(r#"{"key": "OFF", "value": "OFF"}"#).unwrap();
    assert!(bare.description.is_empty());
}
