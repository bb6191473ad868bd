//! Template engine for rendering resolved templates
//!
//! Walks the root layout of a [`ResolvedTemplate`], expanding block slots with
//! their resolved bodies and evaluating output, conditionals, loops and `set`
//! assignments against a JSON context. Output is buffered; an error discards
//! everything rendered so far.

use serde_json::{Map, Value};

use crate::templates::composer::ResolvedTemplate;
use crate::templates::error::TemplateError;
use crate::templates::expr::{display, is_truthy, kind_of, EvalError, Expr, Scope};
use crate::templates::parser::TemplateElement;

/// Template engine bound to one resolved template
#[derive(Debug, Clone, Copy)]
pub struct TemplateEngine<'t> {
    template: &'t ResolvedTemplate,
}

impl<'t> TemplateEngine<'t> {
    /// Create an engine for a resolved template
    pub fn new(template: &'t ResolvedTemplate) -> Self {
        Self { template }
    }

    /// Render the template with the provided context
    ///
    /// # Arguments
    /// * `class_name` - Name of the class being rendered, reported in errors
    /// * `context` - Top-level variables
    ///
    /// # Returns
    /// Rendered content or a `Render`/`Resolution` error
    pub fn render(&self, class_name: &str, context: &Map<String, Value>) -> Result<String, TemplateError> {
        let mut state = RenderState {
            template: self.template,
            class_name,
            scope: RenderScope {
                globals: context,
                frames: vec![Map::new()],
            },
            blocks: Vec::new(),
        };
        let mut output = String::new();
        state.render_elements(self.template.layout(), &mut output)?;
        Ok(output)
    }
}

struct RenderScope<'c> {
    globals: &'c Map<String, Value>,
    frames: Vec<Map<String, Value>>,
}

impl Scope for RenderScope<'_> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .or_else(|| self.globals.get(name))
    }
}

struct RenderState<'t, 'c> {
    template: &'t ResolvedTemplate,
    class_name: &'c str,
    scope: RenderScope<'c>,
    /// Blocks currently being rendered, outermost first
    blocks: Vec<&'t str>,
}

impl<'t> RenderState<'t, '_> {
    fn render_error(&self, variable: impl Into<String>, message: impl Into<String>) -> TemplateError {
        TemplateError::Render {
            class: self.class_name.to_string(),
            template: self.template.name().to_string(),
            block: self.blocks.last().map(|block| block.to_string()),
            variable: variable.into(),
            message: message.into(),
        }
    }

    fn eval(&self, expr: &Expr) -> Result<Value, TemplateError> {
        expr.eval(&self.scope)
            .map_err(|e: EvalError| self.render_error(e.variable(), e.message()))
    }

    fn render_elements(
        &mut self,
        elements: &'t [TemplateElement],
        output: &mut String,
    ) -> Result<(), TemplateError> {
        for element in elements {
            self.render_element(element, output)?;
        }
        Ok(())
    }

    fn render_element(
        &mut self,
        element: &'t TemplateElement,
        output: &mut String,
    ) -> Result<(), TemplateError> {
        match element {
            TemplateElement::Text(text) => output.push_str(text),
            TemplateElement::Output(expr) => {
                let value = self.eval(expr)?;
                let text = display(&value).map_err(|message| self.render_error(expr.describe(), message))?;
                output.push_str(&text);
            }
            TemplateElement::Super => {
                let block = self.blocks.last().copied();
                return Err(TemplateError::resolution(
                    self.template.name(),
                    block,
                    "unexpanded `super()`",
                ));
            }
            TemplateElement::Conditional {
                branches,
                otherwise,
            } => {
                for (condition, body) in branches {
                    if is_truthy(&self.eval(condition)?) {
                        return self.render_elements(body, output);
                    }
                }
                self.render_elements(otherwise, output)?;
            }
            TemplateElement::Loop {
                target,
                iterable,
                content,
            } => {
                let items = match self.eval(iterable)? {
                    Value::Array(items) => items,
                    other => {
                        return Err(self.render_error(
                            iterable.describe(),
                            format!("cannot iterate over {}", kind_of(&other)),
                        ))
                    }
                };
                let length = items.len();
                for (index, item) in items.into_iter().enumerate() {
                    let mut frame = Map::new();
                    frame.insert(target.clone(), item);
                    frame.insert("loop".to_string(), loop_info(index, length));
                    self.scope.frames.push(frame);
                    let rendered = self.render_elements(content, output);
                    self.scope.frames.pop();
                    rendered?;
                }
            }
            TemplateElement::Set { name, value } => {
                let value = self.eval(value)?;
                if let Some(frame) = self.scope.frames.last_mut() {
                    frame.insert(name.clone(), value);
                }
            }
            TemplateElement::Block(name) => {
                if self.blocks.contains(&name.as_str()) {
                    return Err(TemplateError::resolution(
                        self.template.name(),
                        Some(name.as_str()),
                        "block is rendered inside itself",
                    ));
                }
                let template = self.template;
                let Some(block) = template.block(name) else {
                    return Ok(());
                };
                self.blocks.push(name);
                self.scope.frames.push(Map::new());
                let rendered = self.render_elements(&block.body, output);
                self.scope.frames.pop();
                self.blocks.pop();
                rendered?;
            }
        }
        Ok(())
    }
}

fn loop_info(index: usize, length: usize) -> Value {
    let mut info = Map::new();
    info.insert("index".to_string(), Value::from(index + 1));
    info.insert("index0".to_string(), Value::from(index));
    info.insert("first".to_string(), Value::Bool(index == 0));
    info.insert("last".to_string(), Value::Bool(index + 1 == length));
    info.insert("length".to_string(), Value::from(length));
    Value::Object(info)
}
