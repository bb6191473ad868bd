// Command implementations

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use classgen_generation::{
    load_spec, ClassEmitter, GeneratorConfig, OverwritePolicy, TemplateLoader, TemplateSet,
    ValidationEngine,
};
use tracing::debug;

use crate::output::{write_output, WriteOutcome};
use crate::{Cli, Commands};

/// Dispatch a parsed command line
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = GeneratorConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?;

    match cli.command {
        Commands::Render {
            schema,
            template,
            templates_dir,
            output,
            overwrite,
            skip,
        } => {
            if templates_dir.is_some() {
                config.templates_dir = templates_dir;
            }
            if overwrite {
                config.overwrite = OverwritePolicy::Overwrite;
            } else if skip {
                config.overwrite = OverwritePolicy::Skip;
            }
            render(&config, &schema, template.as_deref(), output.as_deref())
        }
        Commands::Check { templates_dir } => {
            if templates_dir.is_some() {
                config.templates_dir = templates_dir;
            }
            check(&config)
        }
        Commands::Config => {
            print!("{}", config.to_toml().context("failed to serialize configuration")?);
            Ok(())
        }
    }
}

/// Shipped templates plus any overrides from the configured directory
fn load_templates(config: &GeneratorConfig) -> anyhow::Result<TemplateSet> {
    let mut loader = TemplateLoader::new(config.whitespace()).with_builtin()?;
    if let Some(dir) = &config.templates_dir {
        let count = loader
            .load_from_directory(dir)
            .with_context(|| format!("failed to load templates from {}", dir.display()))?;
        debug!(dir = %dir.display(), count, "Loaded template overrides");
    }
    Ok(loader.build())
}

fn render(
    config: &GeneratorConfig,
    schema: &Path,
    template: Option<&str>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let templates = Arc::new(load_templates(config)?);
    let emitter = ClassEmitter::new(templates).with_template_names(config.templates.clone());

    let mut spec = load_spec(schema).with_context(|| format!("failed to load {}", schema.display()))?;
    spec.resolve_param_name_collisions();
    spec.rewrap_descriptions(config.wrap_width);

    let chain = match template {
        Some(leaf) => emitter.templates().chain_for(leaf)?,
        None => emitter.chain_for(spec.kind)?,
    };
    let source = emitter
        .render(&spec, &chain)
        .with_context(|| format!("failed to render class {}", spec.name))?;

    match output {
        Some(path) => {
            let path = config.output_dir.join(path);
            let outcome = write_output(&path, &source, config.overwrite)?;
            let label = match outcome {
                WriteOutcome::Created => "created",
                WriteOutcome::Overwritten => "overwritten",
                WriteOutcome::Skipped => "skipped",
            };
            println!("{} {}", label, path.display());
        }
        None => print!("{}", source),
    }
    Ok(())
}

fn check(config: &GeneratorConfig) -> anyhow::Result<()> {
    let templates = load_templates(config)?;
    let chains = ValidationEngine::validate_set(&templates).context("template set is invalid")?;
    for chain in &chains {
        println!("{}", chain);
    }
    println!("{} templates, {} chains resolved", templates.len(), chains.len());
    Ok(())
}
