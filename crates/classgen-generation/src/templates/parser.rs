//! Template syntax parser
//!
//! Parses the Jinja-style subset used by the class templates:
//! `{{ expr }}` output, `{% stmt %}` statements, `{# comment #}`, the
//! `-`/`+` whitespace markers and `{% raw %}` sections. Statements are
//! `extends`, `block`, `for`, `if`/`elif`/`else`, and `set`.
//!
//! Parsing happens in two passes. The lexer splits the source into text and
//! tags and applies whitespace control; the parser then builds the element
//! tree and collects block definitions.

use crate::templates::error::TemplateError;
use crate::templates::expr::Expr;
use crate::templates::filters;

/// Represents a parsed template element
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateElement {
    /// Plain text content
    Text(String),
    /// Expression output: `{{ expr }}`
    Output(Expr),
    /// `{{ super() }}` inside a block body
    Super,
    /// Conditional: `{% if %}` with optional `elif` branches and `else`
    Conditional {
        /// Condition and body of the `if` and every `elif`
        branches: Vec<(Expr, Vec<TemplateElement>)>,
        /// Body of the `else` branch
        otherwise: Vec<TemplateElement>,
    },
    /// Loop: `{% for target in iterable %}`
    Loop {
        /// Loop variable name
        target: String,
        /// Sequence to iterate over
        iterable: Expr,
        /// Loop body
        content: Vec<TemplateElement>,
    },
    /// Assignment: `{% set name = expr %}`
    Set {
        /// Variable name
        name: String,
        /// Assigned value
        value: Expr,
    },
    /// Slot where the resolved body of the named block is rendered
    Block(String),
}

/// Named block definition
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Block name
    pub name: String,
    /// Declared with `{% block name required %}`
    pub required: bool,
    /// Body elements
    pub body: Vec<TemplateElement>,
}

/// Parsed template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Template identifier
    pub name: String,
    /// Template named by `{% extends %}`, if any
    pub parent: Option<String>,
    /// Top-level elements; blocks appear as [`TemplateElement::Block`] slots
    pub layout: Vec<TemplateElement>,
    /// Block definitions in the order their opening tags appear
    pub blocks: Vec<Block>,
}

impl Template {
    /// Look up a block definition by name
    pub fn block(&self, name: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.name == name)
    }

    /// Whether this template is the root of its chain
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// Whitespace handling applied while lexing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhitespaceOptions {
    /// Remove the first newline after a statement or comment tag
    pub trim_blocks: bool,
    /// Strip spaces and tabs from the start of a line up to a statement or comment tag
    pub lstrip_blocks: bool,
}

impl Default for WhitespaceOptions {
    fn default() -> Self {
        Self {
            trim_blocks: true,
            lstrip_blocks: true,
        }
    }
}

/// Template parser
#[derive(Debug, Clone, Default)]
pub struct TemplateParser {
    options: WhitespaceOptions,
}

impl TemplateParser {
    /// Create a parser with the given whitespace handling
    pub fn new(options: WhitespaceOptions) -> Self {
        Self { options }
    }

    /// Parse template content
    ///
    /// # Arguments
    /// * `name` - Template identifier used in error messages
    /// * `content` - Template source
    ///
    /// # Returns
    /// Parsed template or `InvalidSyntax` carrying the line number
    pub fn parse(&self, name: &str, content: &str) -> Result<Template, TemplateError> {
        let pieces = split_pieces(name, content)?;
        let tokens = apply_whitespace(pieces, self.options);
        let mut parser = Parser {
            template: name,
            tokens,
            position: 0,
            parent: None,
            blocks: Vec::new(),
            block_depth: 0,
        };
        let layout = parser.parse_top_level()?;

        Ok(Template {
            name: name.to_string(),
            parent: parser.parent,
            layout,
            blocks: parser.blocks,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Output,
    Statement,
    Comment,
}

#[derive(Debug)]
struct Tag {
    kind: TagKind,
    inner: String,
    line: usize,
    trim_left: bool,
    keep_left: bool,
    trim_right: bool,
    keep_right: bool,
}

#[derive(Debug)]
enum Piece {
    Text(String),
    Tag(Tag),
}

#[derive(Debug)]
enum Token {
    Text(String),
    Output { source: String, line: usize },
    Statement { source: String, line: usize },
}

fn syntax_error(template: &str, line: usize, message: impl Into<String>) -> TemplateError {
    TemplateError::InvalidSyntax {
        template: template.to_string(),
        line,
        message: message.into(),
    }
}

fn next_tag_start(source: &str, from: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    (from..bytes.len().saturating_sub(1))
        .find(|&i| bytes[i] == b'{' && matches!(bytes[i + 1], b'{' | b'%' | b'#'))
}

/// Find `close` from `from`, skipping quoted strings when `quoted` is set
fn find_close(source: &str, from: usize, close: &str, quoted: bool) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = from;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => {
                i += 2;
                continue;
            }
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if quoted && (b == b'"' || b == b'\'') => quote = Some(b),
            None if bytes[i..].starts_with(close.as_bytes()) => return Some(i),
            None => {}
        }
        i += 1;
    }
    None
}

/// Locate `{% endraw %}` from `from`: returns (tag start, tag end, trim_left, trim_right)
fn find_endraw(source: &str, from: usize) -> Option<(usize, usize, bool, bool)> {
    let mut search = from;
    while let Some(offset) = source[search..].find("{%") {
        let start = search + offset;
        let mut rest = &source[start + 2..];
        let trim_left = rest.starts_with('-');
        rest = rest.strip_prefix(['-', '+']).unwrap_or(rest).trim_start();
        if let Some(after) = rest.strip_prefix("endraw") {
            let after = after.trim_start();
            let trim_right = after.starts_with('-');
            let after = after.strip_prefix(['-', '+']).unwrap_or(after);
            if after.starts_with("%}") {
                let end = source.len() - after.len() + 2;
                return Some((start, end, trim_left, trim_right));
            }
        }
        search = start + 2;
    }
    None
}

fn split_pieces(template: &str, source: &str) -> Result<Vec<Piece>, TemplateError> {
    let mut pieces = Vec::new();
    let mut position = 0;
    let mut line = 1;

    while let Some(start) = next_tag_start(source, position) {
        let text = &source[position..start];
        line += text.matches('\n').count();
        if !text.is_empty() {
            pieces.push(Piece::Text(text.to_string()));
        }

        let (kind, close) = match source.as_bytes()[start + 1] {
            b'{' => (TagKind::Output, "}}"),
            b'%' => (TagKind::Statement, "%}"),
            _ => (TagKind::Comment, "#}"),
        };
        let mut inner_start = start + 2;
        let trim_left = source[inner_start..].starts_with('-');
        let keep_left = source[inner_start..].starts_with('+');
        if trim_left || keep_left {
            inner_start += 1;
        }

        let end = find_close(source, inner_start, close, kind != TagKind::Comment)
            .ok_or_else(|| syntax_error(template, line, format!("unclosed tag, expected `{}`", close)))?;
        let mut inner_end = end;
        let trim_right = inner_end > inner_start && source[..inner_end].ends_with('-');
        let keep_right = inner_end > inner_start && source[..inner_end].ends_with('+');
        if trim_right || keep_right {
            inner_end -= 1;
        }

        let inner = source[inner_start..inner_end].trim().to_string();
        let tag_line = line;
        line += source[start..end].matches('\n').count();
        position = end + close.len();

        if kind == TagKind::Statement && inner == "endraw" {
            return Err(syntax_error(template, tag_line, "`endraw` without `raw`"));
        }

        if kind == TagKind::Statement && inner == "raw" {
            let (raw_end_start, raw_end, end_trim_left, end_trim_right) =
                find_endraw(source, position)
                    .ok_or_else(|| syntax_error(template, tag_line, "unclosed `raw` section"))?;
            pieces.push(Piece::Tag(Tag {
                kind: TagKind::Comment,
                inner,
                line: tag_line,
                trim_left,
                keep_left,
                trim_right,
                keep_right,
            }));
            let body = &source[position..raw_end_start];
            if !body.is_empty() {
                pieces.push(Piece::Text(body.to_string()));
            }
            line += source[position..raw_end].matches('\n').count();
            pieces.push(Piece::Tag(Tag {
                kind: TagKind::Comment,
                inner: "endraw".to_string(),
                line,
                trim_left: end_trim_left,
                keep_left: false,
                trim_right: end_trim_right,
                keep_right: false,
            }));
            position = raw_end;
            continue;
        }

        pieces.push(Piece::Tag(Tag {
            kind,
            inner,
            line: tag_line,
            trim_left,
            keep_left,
            trim_right,
            keep_right,
        }));
    }

    if position < source.len() {
        pieces.push(Piece::Text(source[position..].to_string()));
    }
    Ok(pieces)
}

fn apply_whitespace(pieces: Vec<Piece>, options: WhitespaceOptions) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(pieces.len());

    for (i, piece) in pieces.iter().enumerate() {
        match piece {
            Piece::Text(raw) => {
                let prev = i.checked_sub(1).and_then(|j| match &pieces[j] {
                    Piece::Tag(tag) => Some(tag),
                    Piece::Text(_) => None,
                });
                let next = match pieces.get(i + 1) {
                    Some(Piece::Tag(tag)) => Some(tag),
                    _ => None,
                };

                let mut text = raw.as_str();
                let mut at_line_start = i == 0;

                if let Some(prev) = prev {
                    if prev.trim_right {
                        text = text.trim_start();
                    } else if options.trim_blocks && prev.kind != TagKind::Output && !prev.keep_right {
                        if let Some(rest) = text.strip_prefix("\r\n").or_else(|| text.strip_prefix('\n')) {
                            text = rest;
                            at_line_start = true;
                        }
                    }
                }

                if let Some(next) = next {
                    if next.trim_left {
                        text = text.trim_end();
                    } else if options.lstrip_blocks && next.kind != TagKind::Output && !next.keep_left {
                        let tail_start = match text.rfind('\n') {
                            Some(newline) => Some(newline + 1),
                            None if at_line_start => Some(0),
                            None => None,
                        };
                        if let Some(tail_start) = tail_start {
                            if text[tail_start..].chars().all(|c| c == ' ' || c == '\t') {
                                text = &text[..tail_start];
                            }
                        }
                    }
                }

                if !text.is_empty() {
                    tokens.push(Token::Text(text.to_string()));
                }
            }
            Piece::Tag(tag) => match tag.kind {
                TagKind::Output => tokens.push(Token::Output {
                    source: tag.inner.clone(),
                    line: tag.line,
                }),
                TagKind::Statement => tokens.push(Token::Statement {
                    source: tag.inner.clone(),
                    line: tag.line,
                }),
                TagKind::Comment => {}
            },
        }
    }

    tokens
}

/// Statement that closed a nested element list
struct End {
    keyword: String,
    rest: String,
    line: usize,
}

struct Parser<'a> {
    template: &'a str,
    tokens: Vec<Token>,
    position: usize,
    parent: Option<String>,
    blocks: Vec<Block>,
    block_depth: usize,
}

fn split_statement(source: &str) -> (&str, &str) {
    match source.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (source, ""),
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl<'a> Parser<'a> {
    fn error(&self, line: usize, message: impl Into<String>) -> TemplateError {
        syntax_error(self.template, line, message)
    }

    fn expression(&self, source: &str, line: usize) -> Result<Expr, TemplateError> {
        let expr = Expr::parse(source).map_err(|message| self.error(line, message))?;
        if let Some(unknown) = expr.filter_names().into_iter().find(|name| !filters::is_known(name)) {
            return Err(self.error(line, format!("unknown filter `{}`", unknown)));
        }
        Ok(expr)
    }

    fn parse_top_level(&mut self) -> Result<Vec<TemplateElement>, TemplateError> {
        let (elements, end) = self.parse_elements(&[])?;
        match end {
            Some(end) => Err(self.error(end.line, format!("unexpected `{}`", end.keyword))),
            None => Ok(elements),
        }
    }

    /// Parse elements until a statement whose keyword is in `ends`, or end of input
    fn parse_elements(
        &mut self,
        ends: &[&str],
    ) -> Result<(Vec<TemplateElement>, Option<End>), TemplateError> {
        let mut elements = Vec::new();

        while self.position < self.tokens.len() {
            let token = std::mem::replace(&mut self.tokens[self.position], Token::Text(String::new()));
            self.position += 1;

            match token {
                Token::Text(text) => elements.push(TemplateElement::Text(text)),
                Token::Output { source, line } => {
                    if source == "super()" {
                        if self.block_depth == 0 {
                            return Err(self.error(line, "`super()` used outside of a block"));
                        }
                        elements.push(TemplateElement::Super);
                    } else {
                        elements.push(TemplateElement::Output(self.expression(&source, line)?));
                    }
                }
                Token::Statement { source, line } => {
                    let (keyword, rest) = split_statement(&source);
                    if ends.contains(&keyword) {
                        return Ok((
                            elements,
                            Some(End {
                                keyword: keyword.to_string(),
                                rest: rest.to_string(),
                                line,
                            }),
                        ));
                    }
                    if let Some(element) = self.parse_statement(keyword, rest, line, ends.is_empty())? {
                        elements.push(element);
                    }
                }
            }
        }

        Ok((elements, None))
    }

    fn parse_statement(
        &mut self,
        keyword: &str,
        rest: &str,
        line: usize,
        top_level: bool,
    ) -> Result<Option<TemplateElement>, TemplateError> {
        match keyword {
            "extends" => {
                if !top_level || self.block_depth > 0 {
                    return Err(self.error(line, "`extends` must appear at the top level"));
                }
                if self.parent.is_some() {
                    return Err(self.error(line, "template extends more than one parent"));
                }
                let parent = rest.trim_matches(|c| c == '"' || c == '\'');
                if parent.is_empty() {
                    return Err(self.error(line, "`extends` requires a template name"));
                }
                self.parent = Some(parent.to_string());
                Ok(None)
            }
            "block" => self.parse_block(rest, line).map(Some),
            "for" => {
                let (target, iterable) = rest
                    .split_once(" in ")
                    .ok_or_else(|| self.error(line, "expected `for <name> in <expr>`"))?;
                let target = target.trim();
                if !is_identifier(target) {
                    return Err(self.error(line, format!("invalid loop variable `{}`", target)));
                }
                let iterable = self.expression(iterable, line)?;
                let (content, end) = self.parse_elements(&["endfor"])?;
                self.expect_end(end, "endfor", line)?;
                Ok(Some(TemplateElement::Loop {
                    target: target.to_string(),
                    iterable,
                    content,
                }))
            }
            "if" => {
                let mut branches = Vec::new();
                let mut condition = self.expression(rest, line)?;
                loop {
                    let (body, end) = self.parse_elements(&["elif", "else", "endif"])?;
                    let end = end.ok_or_else(|| self.error(line, "unclosed `if`, expected `endif`"))?;
                    branches.push((condition, body));
                    match end.keyword.as_str() {
                        "elif" => condition = self.expression(&end.rest, end.line)?,
                        "else" => {
                            let (otherwise, close) = self.parse_elements(&["endif"])?;
                            self.expect_end(close, "endif", line)?;
                            return Ok(Some(TemplateElement::Conditional { branches, otherwise }));
                        }
                        _ => {
                            return Ok(Some(TemplateElement::Conditional {
                                branches,
                                otherwise: Vec::new(),
                            }))
                        }
                    }
                }
            }
            "set" => {
                let (name, value) = rest
                    .split_once('=')
                    .ok_or_else(|| self.error(line, "expected `set <name> = <expr>`"))?;
                let name = name.trim();
                if !is_identifier(name) {
                    return Err(self.error(line, format!("invalid variable name `{}`", name)));
                }
                Ok(Some(TemplateElement::Set {
                    name: name.to_string(),
                    value: self.expression(value, line)?,
                }))
            }
            "endblock" | "endfor" | "endif" | "elif" | "else" => {
                Err(self.error(line, format!("unexpected `{}`", keyword)))
            }
            other => Err(self.error(line, format!("unknown statement `{}`", other))),
        }
    }

    fn parse_block(&mut self, rest: &str, line: usize) -> Result<TemplateElement, TemplateError> {
        let mut words = rest.split_whitespace();
        let name = words
            .next()
            .filter(|name| is_identifier(name))
            .ok_or_else(|| self.error(line, "expected `block <name>`"))?
            .to_string();
        let required = match words.next() {
            None => false,
            Some("required") => true,
            Some(other) => {
                return Err(self.error(line, format!("unexpected `{}` after block name", other)))
            }
        };
        if self.blocks.iter().any(|block| block.name == name) {
            return Err(self.error(line, format!("block `{}` defined twice", name)));
        }

        let index = self.blocks.len();
        self.blocks.push(Block {
            name: name.clone(),
            required,
            body: Vec::new(),
        });

        self.block_depth += 1;
        let (body, end) = self.parse_elements(&["endblock"])?;
        self.block_depth -= 1;

        let end = end.ok_or_else(|| self.error(line, format!("unclosed block `{}`", name)))?;
        if !end.rest.is_empty() && end.rest != name {
            return Err(self.error(
                end.line,
                format!("`endblock {}` closes block `{}`", end.rest, name),
            ));
        }
        self.blocks[index].body = body;
        Ok(TemplateElement::Block(name))
    }

    fn expect_end(&self, end: Option<End>, keyword: &str, opened: usize) -> Result<(), TemplateError> {
        match end {
            Some(end) if end.keyword == keyword => Ok(()),
            _ => Err(self.error(opened, format!("unclosed statement, expected `{}`", keyword))),
        }
    }
}
