//! Template validation engine
//!
//! Load-time checks over a [`TemplateSet`]: statement nesting depth, parent
//! references, and that every leaf template composes into a complete chain.

use tracing::debug;

use crate::templates::composer::TemplateChain;
use crate::templates::error::TemplateError;
use crate::templates::loader::TemplateSet;
use crate::templates::parser::{Template, TemplateElement, TemplateParser};

/// Maximum statement nesting inside a template
const MAX_NESTING_DEPTH: usize = 10;

/// Template validation engine
pub struct ValidationEngine;

impl ValidationEngine {
    /// Validate template syntax
    ///
    /// # Arguments
    /// * `name` - Template id used in error messages
    /// * `content` - Template content to validate
    ///
    /// # Returns
    /// Ok if valid, Err with line number if invalid
    pub fn validate_template_syntax(name: &str, content: &str) -> Result<(), TemplateError> {
        let template = TemplateParser::default().parse(name, content)?;
        Self::validate_template(&template)
    }

    /// Validate a single parsed template
    pub fn validate_template(template: &Template) -> Result<(), TemplateError> {
        Self::validate_block_nesting(&template.name, &template.layout)?;
        for block in &template.blocks {
            Self::validate_block_nesting(&template.name, &block.body)?;
        }
        Ok(())
    }

    /// Validate template block nesting
    ///
    /// # Arguments
    /// * `template` - Template id used in error messages
    /// * `elements` - Template elements to validate
    ///
    /// # Returns
    /// Ok if nesting is valid, Err if issues found
    pub fn validate_block_nesting(template: &str, elements: &[TemplateElement]) -> Result<(), TemplateError> {
        Self::validate_nesting_recursive(template, elements, 0)
    }

    fn validate_nesting_recursive(
        template: &str,
        elements: &[TemplateElement],
        depth: usize,
    ) -> Result<(), TemplateError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(TemplateError::ValidationFailed(format!(
                "Template `{}` nests statements too deep (max {} levels)",
                template, MAX_NESTING_DEPTH
            )));
        }

        for element in elements {
            match element {
                TemplateElement::Conditional {
                    branches,
                    otherwise,
                } => {
                    for (_, body) in branches {
                        Self::validate_nesting_recursive(template, body, depth + 1)?;
                    }
                    Self::validate_nesting_recursive(template, otherwise, depth + 1)?;
                }
                TemplateElement::Loop { content, .. } => {
                    Self::validate_nesting_recursive(template, content, depth + 1)?;
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Validate a whole template set
    ///
    /// Every template must pass [`ValidationEngine::validate_template`], and
    /// the chain ending at every leaf template must compose.
    ///
    /// # Returns
    /// The chains of all leaf templates
    pub fn validate_set(set: &TemplateSet) -> Result<Vec<TemplateChain>, TemplateError> {
        for template in set.iter() {
            Self::validate_template(template)?;
        }

        let mut chains = Vec::new();
        for leaf in set.leaves() {
            let chain = set.chain_for(leaf)?;
            set.resolve(&chain)?;
            debug!(chain = %chain, "Validated template chain");
            chains.push(chain);
        }
        Ok(chains)
    }
}
