// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

//! Evaluate a scenario's status for its requester

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tracing::debug;

use fedi_policy::application::interaction_policy::{InteractionPolicyService, StandardInteractionPolicyService};
use fedi_policy::domain::engine_config::EngineConfigManifest;
use fedi_policy::domain::policy::{InteractionKind, PolicyResult};
use fedi_policy::domain::events::InteractionEvent;
use fedi_policy::infrastructure::event_bus::{DomainEvent, EventBus, EventReceiver};

use crate::scenario::Scenario;

#[derive(Args)]
pub struct EvaluateArgs {
    /// Scenario file
    #[arg(value_name = "SCENARIO")]
    scenario: PathBuf,

    /// Only evaluate one interaction kind (like, reply, announce)
    #[arg(short, long)]
    kind: Option<InteractionKind>,

    /// Print decisions as JSON
    #[arg(long)]
    json: bool,
}

pub async fn handle_command(args: EvaluateArgs, config_override: Option<PathBuf>) -> Result<()> {
    let config = EngineConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    let scenario = Scenario::from_yaml_file(&args.scenario)?;
    let loaded = scenario.load(&config.spec.instance).await?;

    let repos = loaded.repositories.clone();
    let mut service = StandardInteractionPolicyService::new(repos.relationships, repos.accounts, repos.statuses)
        .with_config(&config.spec.evaluation);
    let mut receiver = None;
    if config.spec.evaluation.publish_events {
        let event_bus = Arc::new(EventBus::new(config.spec.evaluation.event_capacity));
        receiver = Some(event_bus.subscribe());
        service = service.with_event_bus(event_bus);
    }

    let kinds: Vec<InteractionKind> = match args.kind {
        Some(kind) => vec![kind],
        None => InteractionKind::ALL.to_vec(),
    };

    let policy = loaded.status.effective_policy();
    let infeasible = policy.infeasible_values(loaded.status.visibility);

    let mut decisions = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let result = service
            .evaluate(&policy, kind, &loaded.status, &loaded.requester)
            .await
            .with_context(|| format!("Failed to evaluate {}", kind))?;
        debug!(kind = %kind, result = %result, "Scenario decision");
        decisions.push((kind, result));
    }

    let published = receiver.as_mut().map(drain_events);

    if args.json {
        let map: serde_json::Map<String, serde_json::Value> = decisions
            .iter()
            .map(|(kind, result)| (kind.to_string(), serde_json::Value::String(result.to_string())))
            .collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    let requester = loaded
        .requester
        .account()
        .map(|a| a.acct())
        .unwrap_or_else(|| "(anonymous)".to_string());
    println!("{}", "Interaction decisions:".bold());
    println!("  Status: {} ({})", loaded.status.uri, loaded.status.visibility);
    println!("  Author: {}", loaded.author.acct());
    println!("  Requester: {}", requester);
    println!();
    for (kind, result) in &decisions {
        println!("  {:<10} {}", kind.to_string(), colorize(*result));
    }

    if let Some(published) = published {
        println!();
        println!("  Events published: {}", published);
    }

    if !infeasible.is_empty() {
        println!();
        println!("{}", "Values not feasible for this visibility:".yellow());
        for (kind, value) in infeasible {
            println!("  {} {}", kind, value);
        }
    }

    Ok(())
}

/// Log every event already on the bus and return how many there were.
fn drain_events(receiver: &mut EventReceiver) -> usize {
    let mut count = 0;
    while let Ok(event) = receiver.try_recv() {
        if let DomainEvent::Interaction(InteractionEvent::InteractionEvaluated { status_id, kind, result, .. }) = &event {
            debug!(status_id = %status_id, kind = %kind, result = %result, "Decision event");
        }
        count += 1;
    }
    count
}

fn colorize(result: PolicyResult) -> colored::ColoredString {
    match result {
        PolicyResult::Permitted => result.as_str().green(),
        PolicyResult::WithApproval => result.as_str().yellow(),
        PolicyResult::Forbidden => result.as_str().red(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedi_policy::domain::engine_config::InstanceConfig;

    #[tokio::test]
    async fn test_drain_counts_one_event_per_decision() {
        let scenario = Scenario::from_yaml_str(
            r#"
accounts: [{ username: author }, { username: fan }]
status: { author: author, visibility: public }
requester: fan
"#,
        )
        .unwrap();
        let loaded = scenario.load(&InstanceConfig::default()).await.unwrap();
        let repos = loaded.repositories.clone();
        let event_bus = Arc::new(EventBus::new(8));
        let mut receiver = event_bus.subscribe();
        let service = StandardInteractionPolicyService::new(repos.relationships, repos.accounts, repos.statuses)
            .with_event_bus(event_bus);

        let policy = loaded.status.effective_policy();
        for kind in InteractionKind::ALL {
            service
                .evaluate(&policy, kind, &loaded.status, &loaded.requester)
                .await
                .unwrap();
        }

        assert_eq!(drain_events(&mut receiver), 3);
        assert_eq!(drain_events(&mut receiver), 0);
    }
}
