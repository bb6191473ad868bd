// classgen CLI entry point

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;

mod commands;
mod output;

/// classgen - render class source files from declarative schemas
#[derive(Parser, Debug)]
#[command(name = "classgen")]
#[command(bin_name = "classgen")]
#[command(about = "Render class source files from declarative schemas")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Render one schema file into class source
    Render {
        /// Schema file (.json, .yaml or .yml)
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Leaf template to render with instead of the one configured for the class kind
        #[arg(short, long, value_name = "LEAF")]
        template: Option<String>,

        /// Directory of .tmpl files overriding the shipped templates
        #[arg(long, value_name = "DIR")]
        templates_dir: Option<PathBuf>,

        /// Write to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Replace an existing output file
        #[arg(long, conflicts_with = "skip")]
        overwrite: bool,

        /// Leave an existing output file untouched
        #[arg(long)]
        skip: bool,
    },

    /// Load and validate a template set and print its chains
    Check {
        /// Directory of .tmpl files overriding the shipped templates
        #[arg(long, value_name = "DIR")]
        templates_dir: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    commands::run(cli)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_render_command() {
        let cli = Cli::try_parse_from([
            "classgen",
            "render",
            "image.json",
            "--template",
            "struct_template",
            "-o",
            "Image.js",
            "--skip",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Render {
                schema,
                template,
                output,
                skip,
                overwrite,
                ..
            } => {
                assert_eq!(schema, PathBuf::from("image.json"));
                assert_eq!(template.as_deref(), Some("struct_template"));
                assert_eq!(output, Some(PathBuf::from("Image.js")));
                assert!(skip);
                assert!(!overwrite);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_overwrite_conflicts_with_skip() {
        let result = Cli::try_parse_from(["classgen", "render", "a.json", "--overwrite", "--skip"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["classgen", "check", "--config", "classgen.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("classgen.toml")));
        assert!(matches!(cli.command, Commands::Check { templates_dir: None }));
    }
}
