// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

//! Policy inspection commands
//!
//! Commands: defaults, feasibility, canonicalize

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use fedi_policy::application::policy_mapper::{canonicalize_policy, PolicyUriContext};
use fedi_policy::domain::engine_config::EngineConfigManifest;
use fedi_policy::domain::policy::{InteractionKind, InteractionPolicy, PolicyValue};
use fedi_policy::domain::visibility::Visibility;

use crate::scenario::Scenario;

#[derive(Subcommand)]
pub enum PolicyCommand {
    /// Show the default policy for a visibility
    Defaults {
        /// public, unlocked, followers_only, mutuals_only or direct
        #[arg(value_name = "VISIBILITY")]
        visibility: Visibility,

        /// Print as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Show which policy values are feasible for which visibility
    Feasibility,

    /// Show the wire form of a scenario status's policy
    Canonicalize {
        /// Scenario file
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,
    },
}

pub async fn handle_command(command: PolicyCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        PolicyCommand::Defaults { visibility, yaml } => defaults(visibility, yaml),
        PolicyCommand::Feasibility => feasibility(),
        PolicyCommand::Canonicalize { scenario } => canonicalize(scenario, config_override).await,
    }
}

fn defaults(visibility: Visibility, yaml: bool) -> Result<()> {
    let policy = InteractionPolicy::default_for(visibility);

    if yaml {
        print!("{}", serde_yaml::to_string(&policy)?);
        return Ok(());
    }

    println!("{}", format!("Default policy for {}:", visibility).bold());
    for kind in InteractionKind::ALL {
        let rules = policy.rules_for(kind);
        println!("  {}", kind.to_string().bold());
        println!("    always:        {}", join(&rules.always));
        println!("    with approval: {}", join(&rules.with_approval));
    }
    Ok(())
}

fn feasibility() -> Result<()> {
    print!("{:<12}", "");
    for visibility in Visibility::ALL {
        print!("{:<16}", visibility.as_str());
    }
    println!();

    for value in PolicyValue::SYMBOLIC {
        print!("{:<12}", value.as_str().bold());
        for visibility in Visibility::ALL {
            let cell = if value.feasible_for_visibility(visibility) {
                format!("{:<16}", "yes").green()
            } else {
                format!("{:<16}", "no").dimmed()
            };
            print!("{}", cell);
        }
        println!();
    }
    Ok(())
}

async fn canonicalize(path: PathBuf, config_override: Option<PathBuf>) -> Result<()> {
    let config = EngineConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    let scenario = Scenario::from_yaml_file(&path)?;
    let loaded = scenario.load(&config.spec.instance).await?;

    let ctx = PolicyUriContext::new(&loaded.author, &loaded.mentions);
    let wire = canonicalize_policy(&loaded.status.effective_policy(), &ctx);
    println!("{}", serde_json::to_string_pretty(&wire)?);
    Ok(())
}

fn join(values: &[PolicyValue]) -> String {
    if values.is_empty() {
        return "(none)".dimmed().to_string();
    }
    values.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
}
