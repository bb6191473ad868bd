//! Expressions used inside `{{ }}` and statement tags
//!
//! Supports literals, dotted lookups, indexing, filter pipelines, `is` tests,
//! comparisons, boolean operators, `+ - ~` arithmetic and the inline
//! `a if cond else b` form. Values are `serde_json::Value`.

use serde_json::{Number, Value};

use crate::templates::filters::{self, FilterError};

/// Parsed expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// String, number, boolean or none literal
    Literal(Value),
    /// List literal: `[a, b]`
    List(Vec<Expr>),
    /// Variable reference
    Var(String),
    /// Attribute access: `e.type`
    Attr(Box<Expr>, String),
    /// Subscript: `e["type"]`, `items[0]`
    Index(Box<Expr>, Box<Expr>),
    /// Filter application: `value|name(args)`
    Filter {
        /// Filtered value
        expr: Box<Expr>,
        /// Filter name
        name: String,
        /// Positional arguments
        args: Vec<Expr>,
    },
    /// `is` test: `value is [not] name`
    Test {
        /// Tested value
        expr: Box<Expr>,
        /// Test name
        name: String,
        /// Whether the test was written `is not`
        negated: bool,
    },
    /// Prefix operator
    Unary(UnaryOp, Box<Expr>),
    /// Infix operator
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `then if condition else otherwise`
    Conditional {
        /// Value when the condition holds
        then: Box<Expr>,
        /// Condition
        condition: Box<Expr>,
        /// Value otherwise
        otherwise: Box<Expr>,
    },
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `not`
    Not,
    /// `-`
    Neg,
}

/// Infix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `or`
    Or,
    /// `and`
    And,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `in`
    In,
    /// `not in`
    NotIn,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `~`
    Concat,
}

const TESTS: &[&str] = &[
    "defined",
    "undefined",
    "none",
    "string",
    "number",
    "sequence",
    "mapping",
];

/// Variable lookup used while evaluating expressions
pub trait Scope {
    /// Look up a top-level variable
    fn lookup(&self, name: &str) -> Option<&Value>;
}

impl Scope for serde_json::Map<String, Value> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

/// Expression evaluation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// Reference to a variable or attribute that does not exist
    Undefined(String),
    /// Filter failure
    Filter {
        /// Expression the filter was applied to
        variable: String,
        /// Failure detail
        message: String,
    },
    /// Operator applied to values of the wrong type
    Type {
        /// Offending expression
        variable: String,
        /// Failure detail
        message: String,
    },
}

impl EvalError {
    /// Offending variable or expression
    pub fn variable(&self) -> &str {
        match self {
            EvalError::Undefined(variable)
            | EvalError::Filter { variable, .. }
            | EvalError::Type { variable, .. } => variable,
        }
    }

    /// Human readable failure detail
    pub fn message(&self) -> String {
        match self {
            EvalError::Undefined(_) => "undefined variable".to_string(),
            EvalError::Filter { message, .. } | EvalError::Type { message, .. } => message.clone(),
        }
    }
}

impl Expr {
    /// Parse an expression from source text
    pub fn parse(source: &str) -> Result<Expr, String> {
        let tokens = tokenize(source)?;
        let mut parser = ExprParser { tokens, position: 0 };
        let expr = parser.parse_expression()?;
        match parser.peek() {
            Tok::End => Ok(expr),
            other => Err(format!("unexpected {} in `{}`", other.describe(), source.trim())),
        }
    }

    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Expr::Var(name) => name.clone(),
            Expr::Attr(base, attr) => format!("{}.{}", base.describe(), attr),
            Expr::Index(base, index) => format!("{}[{}]", base.describe(), index.describe()),
            Expr::Filter { expr, .. } | Expr::Test { expr, .. } => expr.describe(),
            Expr::Literal(Value::String(s)) => format!("{:?}", s),
            Expr::Literal(value) => value.to_string(),
            _ => "expression".to_string(),
        }
    }

    /// Filter names referenced anywhere in the expression
    pub fn filter_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_filters(&mut names);
        names
    }

    fn collect_filters<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Filter { expr, name, args } => {
                names.push(name);
                expr.collect_filters(names);
                args.iter().for_each(|arg| arg.collect_filters(names));
            }
            Expr::List(items) => items.iter().for_each(|item| item.collect_filters(names)),
            Expr::Attr(base, _) => base.collect_filters(names),
            Expr::Index(base, index) => {
                base.collect_filters(names);
                index.collect_filters(names);
            }
            Expr::Test { expr, .. } | Expr::Unary(_, expr) => expr.collect_filters(names),
            Expr::Binary(_, left, right) => {
                left.collect_filters(names);
                right.collect_filters(names);
            }
            Expr::Conditional {
                then,
                condition,
                otherwise,
            } => {
                then.collect_filters(names);
                condition.collect_filters(names);
                otherwise.collect_filters(names);
            }
            Expr::Literal(_) | Expr::Var(_) => {}
        }
    }

    /// Evaluate the expression against a scope
    pub fn eval(&self, scope: &dyn Scope) -> Result<Value, EvalError> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::List(items) => items
                .iter()
                .map(|item| item.eval(scope))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expr::Var(_) | Expr::Attr(..) | Expr::Index(..) => self
                .eval_optional(scope)?
                .ok_or_else(|| EvalError::Undefined(self.describe())),
            Expr::Filter { expr, name, args } => {
                let input = if name == "default" {
                    expr.eval_optional(scope)?.unwrap_or(Value::Null)
                } else {
                    expr.eval(scope)?
                };
                let args = args
                    .iter()
                    .map(|arg| arg.eval(scope))
                    .collect::<Result<Vec<_>, _>>()?;
                filters::apply(name, input, &args).map_err(|e| filter_error(expr, e))
            }
            Expr::Test {
                expr,
                name,
                negated,
            } => {
                let value = expr.eval_optional(scope)?;
                let outcome = match (name.as_str(), &value) {
                    ("defined", v) => v.is_some(),
                    ("undefined", v) => v.is_none(),
                    ("none", v) => matches!(v, Some(Value::Null)),
                    ("string", v) => matches!(v, Some(Value::String(_))),
                    ("number", v) => matches!(v, Some(Value::Number(_))),
                    ("sequence", v) => matches!(v, Some(Value::Array(_))),
                    ("mapping", v) => matches!(v, Some(Value::Object(_))),
                    (other, _) => {
                        return Err(EvalError::Type {
                            variable: expr.describe(),
                            message: format!("unknown test `{}`", other),
                        })
                    }
                };
                Ok(Value::Bool(outcome != *negated))
            }
            Expr::Unary(UnaryOp::Not, expr) => Ok(Value::Bool(!is_truthy(&expr.eval(scope)?))),
            Expr::Unary(UnaryOp::Neg, expr) => match expr.eval(scope)? {
                Value::Number(n) => Ok(negate(&n)),
                other => Err(type_error(expr, format!("cannot negate {}", kind_of(&other)))),
            },
            Expr::Binary(BinaryOp::Or, left, right) => {
                let value = left.eval(scope)?;
                if is_truthy(&value) {
                    Ok(value)
                } else {
                    right.eval(scope)
                }
            }
            Expr::Binary(BinaryOp::And, left, right) => {
                let value = left.eval(scope)?;
                if is_truthy(&value) {
                    right.eval(scope)
                } else {
                    Ok(value)
                }
            }
            Expr::Binary(op, left, right) => {
                let l = left.eval(scope)?;
                let r = right.eval(scope)?;
                binary(*op, &l, &r).map_err(|message| EvalError::Type {
                    variable: left.describe(),
                    message,
                })
            }
            Expr::Conditional {
                then,
                condition,
                otherwise,
            } => {
                if is_truthy(&condition.eval(scope)?) {
                    then.eval(scope)
                } else {
                    otherwise.eval(scope)
                }
            }
        }
    }

    /// Evaluate a lookup, yielding `None` when the variable or attribute is missing
    fn eval_optional(&self, scope: &dyn Scope) -> Result<Option<Value>, EvalError> {
        match self {
            Expr::Var(name) => Ok(scope.lookup(name).cloned()),
            Expr::Attr(base, attr) => Ok(match base.eval_optional(scope)? {
                Some(Value::Object(map)) => map.get(attr).cloned(),
                _ => None,
            }),
            Expr::Index(base, index) => {
                let Some(container) = base.eval_optional(scope)? else {
                    return Ok(None);
                };
                let index = index.eval(scope)?;
                Ok(match (&container, &index) {
                    (Value::Array(items), Value::Number(n)) => n.as_i64().and_then(|i| {
                        let i = if i < 0 { items.len() as i64 + i } else { i };
                        usize::try_from(i).ok().and_then(|i| items.get(i).cloned())
                    }),
                    (Value::Object(map), Value::String(key)) => map.get(key).cloned(),
                    _ => None,
                })
            }
            other => other.eval(scope).map(Some),
        }
    }
}

fn filter_error(expr: &Expr, error: FilterError) -> EvalError {
    EvalError::Filter {
        variable: expr.describe(),
        message: error.to_string(),
    }
}

fn type_error(expr: &Expr, message: String) -> EvalError {
    EvalError::Type {
        variable: expr.describe(),
        message,
    }
}

/// Truthiness used by `if`, `and`, `or` and `not`
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Text form of a value when printed into the output
pub fn display(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!("cannot print {}", kind_of(other))),
    }
}

/// Name of a value's kind for error messages
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "none",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

fn negate(n: &Number) -> Value {
    match n.as_i64() {
        Some(i) => Value::from(-i),
        None => float(-n.as_f64().unwrap_or(0.0)),
    }
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, String> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(left, right))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(left, right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (left, right) {
                (Value::Number(a), Value::Number(b)) => a
                    .as_f64()
                    .zip(b.as_f64())
                    .and_then(|(a, b)| a.partial_cmp(&b)),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => None,
            }
            .ok_or_else(|| {
                format!("cannot compare {} with {}", kind_of(left), kind_of(right))
            })?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinaryOp::In | BinaryOp::NotIn => {
            let found = match right {
                Value::String(haystack) => match left {
                    Value::String(needle) => haystack.contains(needle.as_str()),
                    other => {
                        return Err(format!("cannot search a string for {}", kind_of(other)))
                    }
                },
                Value::Array(items) => items.iter().any(|item| values_equal(item, left)),
                Value::Object(map) => match left {
                    Value::String(key) => map.contains_key(key),
                    _ => false,
                },
                other => return Err(format!("cannot search in {}", kind_of(other))),
            };
            Ok(Value::Bool(found == (op == BinaryOp::In)))
        }
        BinaryOp::Add => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(match (a.as_i64(), b.as_i64()) {
                (Some(a), Some(b)) => a
                    .checked_add(b)
                    .map(Value::from)
                    .ok_or_else(|| "integer overflow".to_string())?,
                _ => float(a.as_f64().unwrap_or(0.0) + b.as_f64().unwrap_or(0.0)),
            }),
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            (Value::Array(a), Value::Array(b)) => {
                Ok(Value::Array(a.iter().chain(b.iter()).cloned().collect()))
            }
            _ => Err(format!("cannot add {} and {}", kind_of(left), kind_of(right))),
        },
        BinaryOp::Sub => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(match (a.as_i64(), b.as_i64()) {
                (Some(a), Some(b)) => a
                    .checked_sub(b)
                    .map(Value::from)
                    .ok_or_else(|| "integer overflow".to_string())?,
                _ => float(a.as_f64().unwrap_or(0.0) - b.as_f64().unwrap_or(0.0)),
            }),
            _ => Err(format!("cannot subtract {} from {}", kind_of(right), kind_of(left))),
        },
        BinaryOp::Concat => Ok(Value::String(format!("{}{}", display(left)?, display(right)?))),
        BinaryOp::Or | BinaryOp::And => unreachable!("short-circuit operators are evaluated lazily"),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Punct(&'static str),
    End,
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::Ident(name) => format!("`{}`", name),
            Tok::Str(s) => format!("string {:?}", s),
            Tok::Int(i) => format!("number {}", i),
            Tok::Float(f) => format!("number {}", f),
            Tok::Punct(p) => format!("`{}`", p),
            Tok::End => "end of expression".to_string(),
        }
    }
}

const PUNCTUATION: &[&str] = &[
    "==", "!=", "<=", ">=", "<", ">", "+", "-", "~", "|", ".", ",", "(", ")", "[", "]",
];

fn tokenize(source: &str) -> Result<Vec<Tok>, String> {
    let mut tokens = Vec::new();
    let bytes = source.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let ch = bytes[i] as char;
        if ch.is_ascii_whitespace() {
            i += 1;
        } else if ch == '"' || ch == '\'' {
            let (literal, next) = read_string(source, i)?;
            tokens.push(Tok::Str(literal));
            i = next;
        } else if ch.is_ascii_digit() {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                // Stop before attribute access on a number, e.g. `1.foo` is not supported
                if bytes[i] == b'.' && !bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
                    break;
                }
                i += 1;
            }
            let text = &source[start..i];
            if text.contains('.') {
                let value = text
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number `{}`", text))?;
                tokens.push(Tok::Float(value));
            } else {
                let value = text
                    .parse::<i64>()
                    .map_err(|_| format!("invalid number `{}`", text))?;
                tokens.push(Tok::Int(value));
            }
        } else if ch.is_ascii_alphabetic() || ch == '_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push(Tok::Ident(source[start..i].to_string()));
        } else if let Some(punct) = PUNCTUATION.iter().find(|p| source[i..].starts_with(**p)) {
            tokens.push(Tok::Punct(*punct));
            i += punct.len();
        } else {
            let ch = source[i..].chars().next().unwrap_or(ch);
            return Err(format!("unexpected character `{}`", ch));
        }
    }

    tokens.push(Tok::End);
    Ok(tokens)
}

/// Read a quoted string starting at `start`, returning the literal and the next offset
fn read_string(source: &str, start: usize) -> Result<(String, usize), String> {
    let mut chars = source[start..].char_indices();
    let quote = chars.next().map(|(_, c)| c).unwrap_or('"');
    let mut literal = String::new();

    while let Some((offset, ch)) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some((_, 'n')) => literal.push('\n'),
                Some((_, 't')) => literal.push('\t'),
                Some((_, escaped)) => literal.push(escaped),
                None => break,
            },
            c if c == quote => return Ok((literal, start + offset + c.len_utf8())),
            c => literal.push(c),
        }
    }

    Err("unterminated string literal".to_string())
}

struct ExprParser {
    tokens: Vec<Tok>,
    position: usize,
}

impl ExprParser {
    fn peek(&self) -> &Tok {
        self.tokens.get(self.position).unwrap_or(&Tok::End)
    }

    fn peek_ahead(&self, offset: usize) -> &Tok {
        self.tokens.get(self.position + offset).unwrap_or(&Tok::End)
    }

    fn advance(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        tok
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Tok::Ident(name) if name == keyword)
    }

    fn is_punct(&self, punct: &str) -> bool {
        matches!(self.peek(), Tok::Punct(p) if *p == punct)
    }

    fn expect_punct(&mut self, punct: &str) -> Result<(), String> {
        if self.is_punct(punct) {
            self.advance();
            Ok(())
        } else {
            Err(format!("expected `{}`, found {}", punct, self.peek().describe()))
        }
    }

    fn expect_ident(&mut self) -> Result<String, String> {
        match self.advance() {
            Tok::Ident(name) => Ok(name),
            other => Err(format!("expected a name, found {}", other.describe())),
        }
    }

    fn parse_expression(&mut self) -> Result<Expr, String> {
        let then = self.parse_or()?;
        if !self.is_keyword("if") {
            return Ok(then);
        }
        self.advance();
        let condition = self.parse_or()?;
        if !self.is_keyword("else") {
            return Err("inline `if` requires an `else` branch".to_string());
        }
        self.advance();
        let otherwise = self.parse_expression()?;
        Ok(Expr::Conditional {
            then: Box::new(then),
            condition: Box::new(condition),
            otherwise: Box::new(otherwise),
        })
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.is_keyword("or") {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_not()?;
        while self.is_keyword("and") {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, String> {
        if self.is_keyword("not") {
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(operand)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_additive()?;
        loop {
            let next = self.peek().clone();
            let op = match &next {
                Tok::Punct("==") => BinaryOp::Eq,
                Tok::Punct("!=") => BinaryOp::Ne,
                Tok::Punct("<") => BinaryOp::Lt,
                Tok::Punct("<=") => BinaryOp::Le,
                Tok::Punct(">") => BinaryOp::Gt,
                Tok::Punct(">=") => BinaryOp::Ge,
                Tok::Ident(name) if name == "in" => BinaryOp::In,
                Tok::Ident(name)
                    if name == "not" && matches!(self.peek_ahead(1), Tok::Ident(n) if n == "in") =>
                {
                    self.advance();
                    BinaryOp::NotIn
                }
                Tok::Ident(name) if name == "is" => {
                    self.advance();
                    let negated = self.is_keyword("not");
                    if negated {
                        self.advance();
                    }
                    let name = self.expect_ident()?;
                    if !TESTS.contains(&name.as_str()) {
                        return Err(format!("unknown test `{}`", name));
                    }
                    left = Expr::Test {
                        expr: Box::new(left),
                        name,
                        negated,
                    };
                    continue;
                }
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Tok::Punct("+") => BinaryOp::Add,
                Tok::Punct("-") => BinaryOp::Sub,
                Tok::Punct("~") => BinaryOp::Concat,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if self.is_punct("-") {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(operand)));
        }
        self.parse_filtered()
    }

    fn parse_filtered(&mut self) -> Result<Expr, String> {
        let mut expr = self.parse_postfix()?;
        while self.is_punct("|") {
            self.advance();
            let name = self.expect_ident()?;
            let args = if self.is_punct("(") {
                self.advance();
                self.parse_arguments(")")?
            } else {
                Vec::new()
            };
            expr = Expr::Filter {
                expr: Box::new(expr),
                name,
                args,
            };
        }
        Ok(expr)
    }

    fn parse_postfix(&mut self) -> Result<Expr, String> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.is_punct(".") {
                self.advance();
                let attr = match self.advance() {
                    Tok::Ident(name) => name,
                    Tok::Int(i) => i.to_string(),
                    other => return Err(format!("expected attribute, found {}", other.describe())),
                };
                expr = match attr.parse::<i64>() {
                    Ok(i) => Expr::Index(Box::new(expr), Box::new(Expr::Literal(Value::from(i)))),
                    Err(_) => Expr::Attr(Box::new(expr), attr),
                };
            } else if self.is_punct("[") {
                self.advance();
                let index = self.parse_expression()?;
                self.expect_punct("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Tok::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Tok::Int(i) => Ok(Expr::Literal(Value::from(i))),
            Tok::Float(f) => Ok(Expr::Literal(float(f))),
            Tok::Ident(name) => Ok(match name.as_str() {
                "true" | "True" => Expr::Literal(Value::Bool(true)),
                "false" | "False" => Expr::Literal(Value::Bool(false)),
                "none" | "None" => Expr::Literal(Value::Null),
                _ => Expr::Var(name),
            }),
            Tok::Punct("(") => {
                let expr = self.parse_expression()?;
                self.expect_punct(")")?;
                Ok(expr)
            }
            Tok::Punct("[") => Ok(Expr::List(self.parse_arguments("]")?)),
            other => Err(format!("unexpected {}", other.describe())),
        }
    }

    /// Parse a comma separated list up to and including `close`
    fn parse_arguments(&mut self, close: &str) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();
        if self.is_punct(close) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if self.is_punct(",") {
                self.advance();
                continue;
            }
            self.expect_punct(close)?;
            return Ok(args);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scope() -> serde_json::Map<String, Value> {
        match json!({
            "name": "SoftButton",
            "methods": [
                {"type": "String", "param_name": "text", "external": null},
                {"type": "Array<Image>", "param_name": "images", "external": "Image"}
            ],
            "count": 3
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn eval(source: &str) -> Result<Value, EvalError> {
        Expr::parse(source).unwrap().eval(&scope())
    }

    #[test]
    fn test_attribute_and_index_lookup() {
        assert_eq!(eval("methods[1].param_name").unwrap(), json!("images"));
        assert_eq!(eval("methods.0.type").unwrap(), json!("String"));
        assert_eq!(eval("methods[-1].external").unwrap(), json!("Image"));
    }

    #[test]
    fn test_filter_arithmetic_precedence() {
        let value = eval("methods[0].type|length + methods[0].param_name|length + 12").unwrap();
        assert_eq!(value, json!(22));
    }

    #[test]
    fn test_boolean_operators_and_membership() {
        let source = r#"methods[1].type != "Number" and "Array" in methods[1].type"#;
        assert_eq!(eval(source).unwrap(), json!(true));
        assert_eq!(eval(r#""Array" not in methods[0].type"#).unwrap(), json!(true));
        assert_eq!(eval("not count").unwrap(), json!(false));
    }

    #[test]
    fn test_inline_conditional() {
        let source = r#"methods[0].external if methods[0].external else "String""#;
        assert_eq!(eval(source).unwrap(), json!("String"));
        let source = r#"methods[1].external if methods[1].external else "String""#;
        assert_eq!(eval(source).unwrap(), json!("Image"));
    }

    #[test]
    fn test_is_defined_does_not_raise() {
        assert_eq!(eval("missing is defined").unwrap(), json!(false));
        assert_eq!(eval("name is not defined").unwrap(), json!(false));
        assert_eq!(eval("methods[0].external is none").unwrap(), json!(true));
    }

    #[test]
    fn test_undefined_variable_is_an_error() {
        let err = eval("methods[0].colour").unwrap_err();
        assert_eq!(err, EvalError::Undefined("methods[0].colour".to_string()));
    }

    #[test]
    fn test_default_filter_accepts_undefined() {
        assert_eq!(eval(r#"missing|default("x")"#).unwrap(), json!("x"));
    }

    #[test]
    fn test_type_errors_name_the_expression() {
        let err = eval("name - 1").unwrap_err();
        assert_eq!(err.variable(), "name");
    }

    #[test]
    fn test_parse_errors() {
        assert!(Expr::parse("a if b").is_err());
        assert!(Expr::parse("a is shiny").is_err());
        assert!(Expr::parse("\"open").is_err());
        assert!(Expr::parse("a b").is_err());
    }

    #[test]
    fn test_filter_names_are_collected() {
        let expr = Expr::parse(r#"s|dedent|indent(4, true) ~ t|title"#).unwrap();
        assert_eq!(expr.filter_names(), vec!["indent", "dedent", "title"]);
    }
}
