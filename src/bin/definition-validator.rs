//! # Run Definition Validator
//!
//! Command-line tool for checking run definitions before they are handed to an
//! engine. Validates the dependency graph and parameter addresses, and can
//! print the resulting execution order.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hunt_core::config::ConfigLoader;
use hunt_core::models::RunDefinition;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "definition-validator")]
#[command(about = "Validate hunt run definitions")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate one or more JSON run definitions
    Check {
        /// Definition files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print the topological execution order of each valid definition
        #[arg(long)]
        show_order: bool,
    },

    /// Load and validate engine configuration (TOML file plus HUNT__* overrides)
    Config {
        /// Configuration file path
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

fn main() {
    hunt_core::logging::init_structured_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { files, show_order } => check_definitions(&files, show_order),
        Commands::Config { file } => check_config(file),
    };

    if let Err(e) = result {
        error!("{e:#}");
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn check_definitions(files: &[PathBuf], show_order: bool) -> Result<()> {
    let mut failures = 0usize;

    for path in files {
        match validate_file(path) {
            Ok(order) => {
                println!("ok      {}", path.display());
                if show_order {
                    println!("        order: {}", order.join(" -> "));
                }
            }
            Err(e) => {
                failures += 1;
                println!("invalid {}: {e:#}", path.display());
            }
        }
    }

    info!(checked = files.len(), failures, "Definition validation finished");
    if failures > 0 {
        anyhow::bail!("{failures} of {} definition(s) failed validation", files.len());
    }
    Ok(())
}

fn validate_file(path: &PathBuf) -> Result<Vec<String>> {
    let definition = RunDefinition::from_json_file(path)
        .with_context(|| format!("loading {}", path.display()))?;
    let graph = definition
        .validate()
        .with_context(|| format!("validating '{}'", definition.name))?;
    Ok(graph
        .topological_order()
        .into_iter()
        .map(str::to_string)
        .collect())
}

fn check_config(file: Option<PathBuf>) -> Result<()> {
    let config = ConfigLoader::load(file.as_deref()).context("loading engine configuration")?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
