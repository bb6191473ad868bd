//! Template composition with block inheritance
//!
//! A [`TemplateChain`] lists a root template followed by the templates that
//! override its blocks, most specific last. Composing the chain yields a
//! [`ResolvedTemplate`]: the root layout plus one body per block, taken from
//! the most specific layer that defines it, with every `{{ super() }}` already
//! replaced by the next less specific definition.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::templates::error::TemplateError;
use crate::templates::parser::{Template, TemplateElement};

/// Lookup of parsed templates by name
pub trait TemplateSource {
    /// Get a parsed template by name
    fn template(&self, name: &str) -> Option<&Template>;
}

impl TemplateSource for HashMap<String, Template> {
    fn template(&self, name: &str) -> Option<&Template> {
        self.get(name)
    }
}

/// Ordered list of templates to compose, least specific first
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateChain {
    base: String,
    overrides: Vec<String>,
}

impl TemplateChain {
    /// Start a chain at a root template
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            overrides: Vec::new(),
        }
    }

    /// Add a more specific layer on top of the chain
    pub fn with_override(mut self, name: impl Into<String>) -> Self {
        self.overrides.push(name.into());
        self
    }

    /// Root template name
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Overriding layers, least specific first
    pub fn overrides(&self) -> &[String] {
        &self.overrides
    }

    /// Most specific template of the chain
    pub fn leaf(&self) -> &str {
        self.overrides.last().unwrap_or(&self.base)
    }

    /// All layer names, base first
    pub fn layers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.base.as_str()).chain(self.overrides.iter().map(String::as_str))
    }
}

impl fmt::Display for TemplateChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layers: Vec<&str> = self.layers().collect();
        write!(f, "{}", layers.join(" -> "))
    }
}

/// Block body after inheritance has been applied
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBlock {
    /// Block name
    pub name: String,
    /// Template whose definition was selected
    pub defined_in: String,
    /// Body with `super()` calls expanded
    pub body: Vec<TemplateElement>,
}

/// Fully composed template, ready to render
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTemplate {
    chain: TemplateChain,
    layout: Vec<TemplateElement>,
    blocks: Vec<ResolvedBlock>,
}

impl ResolvedTemplate {
    /// Chain this template was composed from
    pub fn chain(&self) -> &TemplateChain {
        &self.chain
    }

    /// Name of the most specific layer
    pub fn name(&self) -> &str {
        self.chain.leaf()
    }

    /// Top-level elements of the root template
    pub fn layout(&self) -> &[TemplateElement] {
        &self.layout
    }

    /// Resolved blocks: root declaration order, then blocks only overrides introduce
    pub fn blocks(&self) -> &[ResolvedBlock] {
        &self.blocks
    }

    /// Look up a resolved block
    pub fn block(&self, name: &str) -> Option<&ResolvedBlock> {
        self.blocks.iter().find(|block| block.name == name)
    }
}

/// Compose a chain of templates into a [`ResolvedTemplate`]
pub fn compose(
    source: &dyn TemplateSource,
    chain: &TemplateChain,
) -> Result<ResolvedTemplate, TemplateError> {
    let layers = collect_layers(source, chain)?;
    let base = layers[0];

    for layer in &layers[1..] {
        if layer.layout.iter().any(is_content) {
            debug!(
                template = %layer.name,
                "Ignoring content outside of blocks in overriding template"
            );
        }
    }

    let mut names: Vec<&str> = Vec::new();
    for layer in &layers {
        for block in &layer.blocks {
            if !names.contains(&block.name.as_str()) {
                names.push(&block.name);
            }
        }
    }

    let mut resolver = BlockResolver {
        layers: &layers,
        memo: HashMap::new(),
    };
    let mut blocks = Vec::with_capacity(names.len());

    for name in names {
        let selected = layers
            .iter()
            .rposition(|layer| layer.block(name).is_some_and(|block| !block.required))
            .ok_or_else(|| TemplateError::MissingBlock {
                template: chain.leaf().to_string(),
                block: name.to_string(),
            })?;
        let body = resolver.resolve(selected, name)?;
        blocks.push(ResolvedBlock {
            name: name.to_string(),
            defined_in: layers[selected].name.clone(),
            body,
        });
    }

    debug!(chain = %chain, blocks = blocks.len(), "Resolved template chain");

    Ok(ResolvedTemplate {
        chain: chain.clone(),
        layout: base.layout.clone(),
        blocks,
    })
}

fn collect_layers<'s>(
    source: &'s dyn TemplateSource,
    chain: &TemplateChain,
) -> Result<Vec<&'s Template>, TemplateError> {
    let mut layers: Vec<&Template> = Vec::new();

    for name in chain.layers() {
        if layers.iter().any(|layer| layer.name == name) {
            return Err(TemplateError::resolution(
                name,
                None,
                format!("extension cycle: {}", chain),
            ));
        }
        let template = source
            .template(name)
            .ok_or_else(|| TemplateError::resolution(name, None, "unknown template"))?;
        layers.push(template);
    }

    if let Some(parent) = &layers[0].parent {
        return Err(TemplateError::resolution(
            chain.base(),
            None,
            format!("base of a chain must be a root template, but it extends `{}`", parent),
        ));
    }
    Ok(layers)
}

fn is_content(element: &TemplateElement) -> bool {
    match element {
        TemplateElement::Text(text) => !text.trim().is_empty(),
        TemplateElement::Block(_) => false,
        _ => true,
    }
}

struct BlockResolver<'a, 's> {
    layers: &'a [&'s Template],
    memo: HashMap<(usize, String), Vec<TemplateElement>>,
}

impl BlockResolver<'_, '_> {
    /// Body of `name` as defined at `layer`, with `super()` expanded
    fn resolve(&mut self, layer: usize, name: &str) -> Result<Vec<TemplateElement>, TemplateError> {
        if let Some(body) = self.memo.get(&(layer, name.to_string())) {
            return Ok(body.clone());
        }

        let template = self.layers[layer];
        let block = template.block(name).ok_or_else(|| {
            TemplateError::resolution(&template.name, Some(name), "block is not defined here")
        })?;
        let body = self.expand(layer, name, &block.body)?;

        self.memo.insert((layer, name.to_string()), body.clone());
        Ok(body)
    }

    fn expand(
        &mut self,
        layer: usize,
        name: &str,
        elements: &[TemplateElement],
    ) -> Result<Vec<TemplateElement>, TemplateError> {
        let mut expanded = Vec::with_capacity(elements.len());

        for element in elements {
            match element {
                TemplateElement::Super => {
                    let parent = self.layers[..layer]
                        .iter()
                        .rposition(|template| template.block(name).is_some())
                        .ok_or_else(|| {
                            TemplateError::resolution(
                                &self.layers[layer].name,
                                Some(name),
                                "`super()` has no less specific definition to refer to",
                            )
                        })?;
                    expanded.extend(self.resolve(parent, name)?);
                }
                TemplateElement::Conditional {
                    branches,
                    otherwise,
                } => {
                    let mut resolved_branches = Vec::with_capacity(branches.len());
                    for (condition, body) in branches {
                        resolved_branches.push((condition.clone(), self.expand(layer, name, body)?));
                    }
                    expanded.push(TemplateElement::Conditional {
                        branches: resolved_branches,
                        otherwise: self.expand(layer, name, otherwise)?,
                    });
                }
                TemplateElement::Loop {
                    target,
                    iterable,
                    content,
                } => expanded.push(TemplateElement::Loop {
                    target: target.clone(),
                    iterable: iterable.clone(),
                    content: self.expand(layer, name, content)?,
                }),
                other => expanded.push(other.clone()),
            }
        }

        Ok(expanded)
    }
}
