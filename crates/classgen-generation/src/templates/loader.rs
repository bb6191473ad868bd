//! Template loading from files and directories
//!
//! Templates are `.tmpl` files; the template id is the file name without the
//! `.tmpl` suffix and the target language extension, so
//! `struct_template.js.tmpl` becomes `struct_template`. The shipped templates
//! are embedded in the crate and can be overridden from a directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::templates::composer::{compose, ResolvedTemplate, TemplateChain, TemplateSource};
use crate::templates::error::TemplateError;
use crate::templates::parser::{Template, TemplateParser, WhitespaceOptions};

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("base_template", include_str!("../../templates/base_template.js.tmpl")),
    (
        "base_struct_function",
        include_str!("../../templates/base_struct_function.js.tmpl"),
    ),
    ("struct_template", include_str!("../../templates/struct_template.js.tmpl")),
    ("function_template", include_str!("../../templates/function_template.js.tmpl")),
    ("enum_template", include_str!("../../templates/enum_template.js.tmpl")),
];

/// Immutable set of parsed templates keyed by id
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: BTreeMap<String, Template>,
}

impl TemplateSet {
    /// Parse the templates shipped with the crate
    pub fn builtin() -> Result<Self, TemplateError> {
        Ok(TemplateLoader::default().with_builtin()?.build())
    }

    /// Get a template by id
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    /// Template ids in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Iterate over all templates
    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    /// Number of templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Build the chain ending at `leaf` by following `extends` declarations
    pub fn chain_for(&self, leaf: &str) -> Result<TemplateChain, TemplateError> {
        let mut current = self
            .get(leaf)
            .ok_or_else(|| TemplateError::resolution(leaf, None, "unknown template"))?;
        let mut lineage = vec![current.name.as_str()];

        while let Some(parent) = &current.parent {
            if lineage.contains(&parent.as_str()) {
                lineage.push(parent);
                lineage.reverse();
                return Err(TemplateError::resolution(
                    leaf,
                    None,
                    format!("extension cycle: {}", lineage.join(" -> ")),
                ));
            }
            current = self.get(parent).ok_or_else(|| {
                TemplateError::resolution(
                    &current.name,
                    None,
                    format!("extends unknown template `{}`", parent),
                )
            })?;
            lineage.push(current.name.as_str());
        }

        let mut layers = lineage.into_iter().rev();
        let base = layers.next().unwrap_or(leaf);
        Ok(layers.fold(TemplateChain::new(base), TemplateChain::with_override))
    }

    /// Compose a chain against this set
    pub fn resolve(&self, chain: &TemplateChain) -> Result<ResolvedTemplate, TemplateError> {
        compose(self, chain)
    }

    /// Templates no other template extends
    pub fn leaves(&self) -> Vec<&str> {
        self.names()
            .filter(|name| {
                !self
                    .iter()
                    .any(|template| template.parent.as_deref() == Some(*name))
            })
            .collect()
    }
}

impl TemplateSource for TemplateSet {
    fn template(&self, name: &str) -> Option<&Template> {
        self.get(name)
    }
}

/// Loads templates from embedded sources, files and directories
#[derive(Debug, Clone, Default)]
pub struct TemplateLoader {
    parser: TemplateParser,
    templates: BTreeMap<String, Template>,
}

impl TemplateLoader {
    /// Create a loader with the given whitespace handling
    pub fn new(options: WhitespaceOptions) -> Self {
        Self {
            parser: TemplateParser::new(options),
            templates: BTreeMap::new(),
        }
    }

    /// Add the templates shipped with the crate
    pub fn with_builtin(mut self) -> Result<Self, TemplateError> {
        for (name, content) in BUILTIN_TEMPLATES {
            self.add_template(name, content)?;
        }
        Ok(self)
    }

    /// Parse and add a template, replacing any template with the same id
    pub fn add_template(&mut self, name: &str, content: &str) -> Result<(), TemplateError> {
        let template = self.parser.parse(name, content)?;
        if self.templates.insert(name.to_string(), template).is_some() {
            debug!(template = name, "Template overridden");
        }
        Ok(())
    }

    /// Load a template from a file
    ///
    /// # Arguments
    /// * `path` - Path to the template file (.tmpl extension)
    ///
    /// # Returns
    /// The id of the loaded template
    pub fn load_from_file(&mut self, path: &Path) -> Result<String, TemplateError> {
        let content = fs::read_to_string(path)?;
        let id = template_id(path)
            .ok_or_else(|| TemplateError::TemplateNotFound(path.display().to_string()))?;
        self.add_template(&id, &content)?;
        debug!(template = %id, path = %path.display(), "Loaded template");
        Ok(id)
    }

    /// Load all `.tmpl` files below a directory
    ///
    /// A missing directory loads nothing. Templates found here replace
    /// templates with the same id that were added earlier.
    ///
    /// # Returns
    /// Number of templates loaded
    pub fn load_from_directory(&mut self, dir: &Path) -> Result<usize, TemplateError> {
        if !dir.exists() {
            debug!(dir = %dir.display(), "Template directory does not exist");
            return Ok(0);
        }

        let mut loaded = 0;
        self.scan_directory(dir, &mut loaded)?;
        info!(dir = %dir.display(), count = loaded, "Loaded templates from directory");
        Ok(loaded)
    }

    fn scan_directory(&mut self, dir: &Path, loaded: &mut usize) -> Result<(), TemplateError> {
        let mut paths = fs::read_dir(dir)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<Result<Vec<_>, _>>()?;
        paths.sort();

        for path in paths {
            if path.is_dir() {
                self.scan_directory(&path, loaded)?;
            } else if path.extension().and_then(|s| s.to_str()) == Some("tmpl") {
                self.load_from_file(&path)?;
                *loaded += 1;
            } else {
                debug!(path = %path.display(), "Skipping non-template file");
            }
        }

        Ok(())
    }

    /// Finish loading
    pub fn build(self) -> TemplateSet {
        TemplateSet {
            templates: self.templates,
        }
    }
}

/// Template id from a file name: `name.lang.tmpl` -> `name`
fn template_id(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let name = name.strip_suffix(".tmpl").unwrap_or(name);
    let name = match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    };
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_template_id() {
        assert_eq!(
            template_id(&PathBuf::from("a/struct_template.js.tmpl")).as_deref(),
            Some("struct_template")
        );
        assert_eq!(template_id(&PathBuf::from("plain.tmpl")).as_deref(), Some("plain"));
        assert_eq!(template_id(&PathBuf::from(".tmpl")), None);
    }

    #[test]
    fn test_builtin_templates_parse() {
        let set = TemplateSet::builtin().unwrap();
        let names: Vec<_> = set.names().collect();
        assert_eq!(
            names,
            vec![
                "base_struct_function",
                "base_template",
                "enum_template",
                "function_template",
                "struct_template"
            ]
        );
        assert_eq!(set.leaves(), vec!["enum_template", "function_template", "struct_template"]);
    }

    #[test]
    fn test_chain_for_walks_extends() {
        let set = TemplateSet::builtin().unwrap();
        let chain = set.chain_for("struct_template").unwrap();
        assert_eq!(chain.to_string(), "base_template -> base_struct_function -> struct_template");
        assert_eq!(set.chain_for("base_template").unwrap(), TemplateChain::new("base_template"));
    }

    #[test]
    fn test_chain_for_detects_cycles_and_missing_parents() {
        let mut loader = TemplateLoader::default();
        loader.add_template("a", "{% extends 'b' %}").unwrap();
        loader.add_template("b", "{% extends 'a' %}").unwrap();
        loader.add_template("c", "{% extends 'nowhere' %}").unwrap();
        let set = loader.build();

        let err = set.chain_for("a").unwrap_err();
        assert!(err.to_string().contains("extension cycle: a -> b -> a"), "{}", err);
        assert!(matches!(set.chain_for("c"), Err(TemplateError::Resolution { .. })));
        assert!(matches!(set.chain_for("zzz"), Err(TemplateError::Resolution { .. })));
    }

    #[test]
    fn test_load_from_directory_overrides_builtin() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(temp_dir.path().join("struct_template.js.tmpl"), "{% extends 'base_struct_function' %}").unwrap();
        fs::write(nested.join("extra.js.tmpl"), "{% block x %}{% endblock %}").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        let mut loader = TemplateLoader::default().with_builtin().unwrap();
        let loaded = loader.load_from_directory(temp_dir.path()).unwrap();
        let set = loader.build();

        assert_eq!(loaded, 2);
        assert_eq!(set.len(), 6);
        assert!(set.get("extra").is_some());
        assert!(set.get("struct_template").unwrap().blocks.is_empty());
    }

    #[test]
    fn test_load_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut loader = TemplateLoader::default();
        let loaded = loader.load_from_directory(&temp_dir.path().join("missing")).unwrap();
        assert_eq!(loaded, 0);
        assert!(loader.build().is_empty());
    }

    #[test]
    fn test_load_reports_syntax_errors() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("broken.js.tmpl"), "ok\n{% if %}").unwrap();
        let mut loader = TemplateLoader::default();
        let err = loader.load_from_directory(temp_dir.path()).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidSyntax { ref template, line: 2, .. } if template == "broken"));
    }
}
