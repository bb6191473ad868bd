//! Filter library and case transformation

use serde_json::Value;
use thiserror::Error;

use crate::naming;
use crate::templates::expr::{display, kind_of};

/// Names of every filter known to the renderer
pub const FILTERS: &[&str] = &[
    "length", "format", "indent", "title", "upper", "lower", "pascal", "camel", "snake", "kebab",
    "dedent", "join", "trim", "default", "constant",
];

/// Failure while applying a filter
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    /// Filter name is not registered
    #[error("unknown filter `{0}`")]
    Unknown(String),

    /// Filter applied to a value of the wrong kind
    #[error("filter `{filter}` expects {expected}, got {found}")]
    InvalidInput {
        /// Filter name
        filter: &'static str,
        /// Accepted input kind
        expected: &'static str,
        /// Actual input kind
        found: &'static str,
    },

    /// Bad filter argument
    #[error("filter `{filter}`: {message}")]
    InvalidArgument {
        /// Filter name
        filter: &'static str,
        /// What is wrong with the argument
        message: String,
    },
}

/// Represents a case transformation for identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseTransform {
    /// PascalCase (e.g., SoftButton)
    PascalCase,
    /// camelCase (e.g., softButton)
    CamelCase,
    /// snake_case (e.g., soft_button)
    SnakeCase,
    /// kebab-case (e.g., soft-button)
    KebabCase,
    /// UPPERCASE
    UpperCase,
    /// lowercase
    LowerCase,
}

impl CaseTransform {
    /// Apply case transformation to a string
    pub fn apply(&self, input: &str) -> String {
        use heck::{ToKebabCase, ToLowerCamelCase, ToPascalCase, ToSnakeCase};

        match self {
            CaseTransform::PascalCase => input.to_pascal_case(),
            CaseTransform::CamelCase => input.to_lower_camel_case(),
            CaseTransform::SnakeCase => input.to_snake_case(),
            CaseTransform::KebabCase => input.to_kebab_case(),
            CaseTransform::UpperCase => input.to_uppercase(),
            CaseTransform::LowerCase => input.to_lowercase(),
        }
    }

    fn from_filter(name: &str) -> Option<Self> {
        match name {
            "pascal" => Some(CaseTransform::PascalCase),
            "camel" => Some(CaseTransform::CamelCase),
            "snake" => Some(CaseTransform::SnakeCase),
            "kebab" => Some(CaseTransform::KebabCase),
            "upper" => Some(CaseTransform::UpperCase),
            "lower" => Some(CaseTransform::LowerCase),
            _ => None,
        }
    }
}

/// Whether `name` is a registered filter
pub fn is_known(name: &str) -> bool {
    FILTERS.contains(&name)
}

/// Apply the filter `name` to `input`
pub fn apply(name: &str, input: Value, args: &[Value]) -> Result<Value, FilterError> {
    if let Some(transform) = CaseTransform::from_filter(name) {
        let text = expect_str(filter_name(name), &input)?;
        return Ok(Value::String(transform.apply(text)));
    }

    match name {
        "length" => length(&input),
        "format" => format(&input, args),
        "indent" => indent(&input, args),
        "title" => Ok(Value::String(naming::method_title(expect_str("title", &input)?))),
        "dedent" => Ok(Value::String(dedent(expect_str("dedent", &input)?))),
        "trim" => Ok(Value::String(expect_str("trim", &input)?.trim().to_string())),
        "join" => join(&input, args),
        "default" => Ok(match input {
            Value::Null => args.first().cloned().unwrap_or_else(|| Value::String(String::new())),
            other => other,
        }),
        "constant" => Ok(Value::String(naming::constant_key(expect_str("constant", &input)?))),
        other => Err(FilterError::Unknown(other.to_string())),
    }
}

/// Static name for error reporting
fn filter_name(name: &str) -> &'static str {
    FILTERS.iter().find(|f| **f == name).copied().unwrap_or("filter")
}

fn expect_str<'a>(filter: &'static str, input: &'a Value) -> Result<&'a str, FilterError> {
    input.as_str().ok_or(FilterError::InvalidInput {
        filter,
        expected: "a string",
        found: kind_of(input),
    })
}

fn length(input: &Value) -> Result<Value, FilterError> {
    let len = match input {
        Value::String(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        other => {
            return Err(FilterError::InvalidInput {
                filter: "length",
                expected: "a string or sequence",
                found: kind_of(other),
            })
        }
    };
    Ok(Value::from(len))
}

/// printf-style `%s` substitution
fn format(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let pattern = expect_str("format", input)?;
    let mut output = String::with_capacity(pattern.len());
    let mut remaining = args.iter();
    let mut chars = pattern.chars();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            output.push(ch);
            continue;
        }
        match chars.next() {
            Some('%') => output.push('%'),
            Some('s') => {
                let arg = remaining.next().ok_or_else(|| FilterError::InvalidArgument {
                    filter: "format",
                    message: "not enough arguments for format string".to_string(),
                })?;
                let text = display(arg).map_err(|message| FilterError::InvalidArgument {
                    filter: "format",
                    message,
                })?;
                output.push_str(&text);
            }
            other => {
                return Err(FilterError::InvalidArgument {
                    filter: "format",
                    message: format!("unsupported conversion `%{}`", other.unwrap_or(' ')),
                })
            }
        }
    }

    if remaining.next().is_some() {
        return Err(FilterError::InvalidArgument {
            filter: "format",
            message: "not all arguments converted".to_string(),
        });
    }
    Ok(Value::String(output))
}

/// Pad lines by `width` spaces; the first line only when `first` is true
fn indent(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let text = expect_str("indent", input)?;
    let padding = match args.first() {
        None => " ".repeat(4),
        Some(Value::Number(n)) => {
            let width = n.as_u64().ok_or_else(|| FilterError::InvalidArgument {
                filter: "indent",
                message: format!("width must be a non-negative integer, got {}", n),
            })?;
            " ".repeat(width as usize)
        }
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(FilterError::InvalidArgument {
                filter: "indent",
                message: format!("width must be a number, got {}", kind_of(other)),
            })
        }
    };
    let first = match args.get(1) {
        None => false,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            return Err(FilterError::InvalidArgument {
                filter: "indent",
                message: format!("`first` must be a boolean, got {}", kind_of(other)),
            })
        }
    };

    let lines: Vec<String> = text
        .split('\n')
        .enumerate()
        .map(|(i, line)| {
            if line.trim().is_empty() || (i == 0 && !first) {
                line.to_string()
            } else {
                format!("{}{}", padding, line)
            }
        })
        .collect();
    Ok(Value::String(lines.join("\n")))
}

/// Re-base text so that its first non-blank line starts at column zero
///
/// Lines indented less than the first line lose only the whitespace they have.
/// Leading and trailing blank lines are dropped.
pub fn dedent(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let Some(start) = lines.iter().position(|line| !line.trim().is_empty()) else {
        return String::new();
    };
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .unwrap_or(start);
    let base = leading_whitespace(lines[start]);

    lines[start..=end]
        .iter()
        .map(|line| &line[strip_offset(line, base)..])
        .collect::<Vec<_>>()
        .join("\n")
}

/// Number of leading whitespace characters
fn leading_whitespace(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Byte offset just past at most `limit` leading whitespace characters
fn strip_offset(line: &str, limit: usize) -> usize {
    line.char_indices()
        .take_while(|(_, c)| c.is_whitespace())
        .take(limit)
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8())
}

fn join(input: &Value, args: &[Value]) -> Result<Value, FilterError> {
    let Value::Array(items) = input else {
        return Err(FilterError::InvalidInput {
            filter: "join",
            expected: "a sequence",
            found: kind_of(input),
        });
    };
    let separator = match args.first() {
        None => "",
        Some(Value::String(s)) => s.as_str(),
        Some(other) => {
            return Err(FilterError::InvalidArgument {
                filter: "join",
                message: format!("separator must be a string, got {}", kind_of(other)),
            })
        }
    };
    let parts = items
        .iter()
        .map(display)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|message| FilterError::InvalidArgument {
            filter: "join",
            message,
        })?;
    Ok(Value::String(parts.join(separator)))
}
