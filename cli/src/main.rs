// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

//! # fedipol CLI
//!
//! Runs the interaction policy engine against scenario files.
//!
//! ## Commands
//!
//! - `fedipol evaluate <scenario.yaml> [--kind like|reply|announce]` - Decide interactions
//! - `fedipol policy defaults|feasibility|canonicalize` - Inspect policies
//! - `fedipol config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod scenario;

use commands::{ConfigCommand, EvaluateArgs, PolicyCommand};
use fedi_policy::domain::engine_config::EngineConfigManifest;

/// fedipol - interaction policy and relationship resolution engine
#[derive(Parser)]
#[command(name = "fedipol")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "FEDIPOL_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, global = true, env = "FEDIPOL_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a scenario's status for its requester
    #[command(name = "evaluate")]
    Evaluate(EvaluateArgs),

    /// Inspect default policies, feasibility and wire forms
    #[command(name = "policy")]
    Policy {
        #[command(subcommand)]
        command: PolicyCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Logging settings come from the configuration unless overridden
    let observability = EngineConfigManifest::load_or_default(cli.config.clone())
        .map(|c| c.spec.observability)
        .unwrap_or_default();
    let level = cli.log_level.clone().unwrap_or(observability.log_level);
    init_logging(&level, &observability.log_format)?;

    match cli.command {
        Some(Commands::Evaluate(args)) => commands::evaluate::handle_command(args, cli.config).await,
        Some(Commands::Policy { command }) => commands::policy::handle_command(command, cli.config).await,
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if format == "json" {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
