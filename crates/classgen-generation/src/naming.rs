//! Naming helpers for generated identifiers and doc text
//!
//! Derives parameter keys, accessor parameter names and method titles from a
//! schema parameter name, and cleans and wraps description text.

use std::sync::OnceLock;

use regex::Regex;

/// Default width budget for `@param` description lines
pub const DEFAULT_WRAP_WIDTH: usize = 102;

/// Width for enum entry description lines
pub const ENTRY_WRAP_WIDTH: usize = 113;

fn upper_constant_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[A-Z_\d]+$").expect("Invalid regex"))
}

fn word_boundary_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"([a-z]|[A-Z]{2,})([A-Z]|\d$)").expect("Invalid regex"))
}

fn last_word_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^\w*([A-Z][a-z]\w*|[A-Z]{2,})$").expect("Invalid regex"))
}

fn id_suffix_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^\w+[a-z]+([A-Z]{2,})?ID$").expect("Invalid regex"))
}

fn description_noise_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    // Whitespace runs, newlines and trailing `[@TODO ...]` notes
    REGEX.get_or_init(|| Regex::new(r"(\s{2,}|\n|\[@TODO.+)").expect("Invalid regex"))
}

/// Upper-snake constant name: `fullAppID` -> `FULL_APP_ID`
///
/// Names that already look like constants are returned unchanged.
pub fn constant_key(name: &str) -> String {
    if upper_constant_regex().is_match(name) {
        return name.to_string();
    }
    word_boundary_regex()
        .replace_all(name, "${1}_${2}")
        .to_uppercase()
}

/// Accessor parameter name: the last word of a camel-case name, lower-cased
///
/// `fullAppID` -> `id`, `isHighlighted` -> `highlighted`, `text` -> `text`.
/// All-caps names are kept whole: `URL` -> `url`.
pub fn param_name(name: &str) -> String {
    if upper_constant_regex().is_match(name) {
        return name.to_lowercase();
    }
    last_word_regex().replace(name, "${1}").to_lowercase()
}

/// Method title: first character upper-cased, the rest preserved
pub fn method_title(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Drop a trailing `ID` from mixed-case names: `appID` -> `app`
pub fn strip_id_suffix(name: &str) -> &str {
    if id_suffix_regex().is_match(name) {
        &name[..name.len() - 2]
    } else {
        name
    }
}

/// Join description lines and collapse whitespace and `[@TODO ...]` notes
pub fn clean_description<S: AsRef<str>>(lines: &[S]) -> String {
    let joined: String = lines.iter().map(|line| AsRef::<str>::as_ref(line)).collect();
    description_noise_regex()
        .replace_all(&joined, " ")
        .trim()
        .to_string()
}

/// Greedy word wrap; words longer than `width` are split
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let current_len = current.chars().count();

        if !current.is_empty() && current_len + 1 + word_len <= width {
            current.push(' ');
            current.push_str(word);
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        let chars: Vec<char> = word.chars().collect();
        let mut chunks = chars.chunks(width).peekable();
        while let Some(chunk) = chunks.next() {
            let chunk: String = chunk.iter().collect();
            if chunks.peek().is_some() {
                lines.push(chunk);
            } else {
                current = chunk;
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Wrap a cleaned description for an `@param` line
///
/// The width shrinks by the length of the type tag and parameter name that
/// precede the description on the first line.
pub fn wrap_description(text: &str, base_width: usize, type_tag: &str, param_name: &str) -> Vec<String> {
    let width = base_width
        .saturating_sub(type_tag.chars().count())
        .saturating_sub(param_name.chars().count());
    wrap(text, width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_key() {
        assert_eq!(constant_key("fullAppID"), "FULL_APP_ID");
        assert_eq!(constant_key("softButtonID"), "SOFT_BUTTON_ID");
        assert_eq!(constant_key("text"), "TEXT");
        assert_eq!(constant_key("syncMsgVersion"), "SYNC_MSG_VERSION");
        assert_eq!(constant_key("line2"), "LINE_2");
        assert_eq!(constant_key("KEY_NAME"), "KEY_NAME");
    }

    #[test]
    fn test_param_name() {
        assert_eq!(param_name("fullAppId"), "id");
        assert_eq!(param_name("isHighlighted"), "highlighted");
        assert_eq!(param_name("text"), "text");
        assert_eq!(param_name("appHMIType"), "type");
        assert_eq!(param_name("URL"), "url");
        assert_eq!(param_name("fullAppID"), "id");
    }

    #[test]
    fn test_method_title_is_idempotent() {
        assert_eq!(method_title("fullAppID"), "FullAppID");
        assert_eq!(method_title(&method_title("fullAppID")), "FullAppID");
        assert_eq!(method_title(""), "");
    }

    #[test]
    fn test_strip_id_suffix() {
        assert_eq!(strip_id_suffix("appID"), "app");
        assert_eq!(strip_id_suffix("fullAppID"), "fullApp");
        assert_eq!(strip_id_suffix("ID"), "ID");
        assert_eq!(strip_id_suffix("RegisterAppInterface"), "RegisterAppInterface");
    }

    #[test]
    fn test_clean_description() {
        let lines = ["The text  shown\non the button ", "[@TODO remove]"];
        assert_eq!(clean_description(&lines), "The text shown on the button");
        assert_eq!(clean_description::<&str>(&[]), "");
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("aa bb cc", 5), vec!["aa bb", "cc"]);
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert!(wrap("   ", 10).is_empty());
    }

    #[test]
    fn test_wrap_description_width() {
        let text = "one two three four";
        // 20 - 6 - 4 leaves 10 columns
        assert_eq!(wrap_description(text, 20, "String", "text"), vec!["one two", "three four"]);
    }
}
