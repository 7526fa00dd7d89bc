// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

//! Scenario files
//!
//! A scenario describes a small social graph, one status and one requester
//! in YAML. It is loaded into the in-memory stores so that policy decisions
//! can be reproduced without a database.
//!
//! ```yaml
//! accounts:
//!   - username: author
//!   - username: fan
//!   - username: guest
//!     domain: remote.example
//!     uri: https://remote.example/users/guest
//! follows:
//!   - { from: fan, to: author }
//! blocks: []
//! status:
//!   author: author
//!   visibility: followers_only
//!   mentions: [guest]
//! requester: fan
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use fedi_policy::application::policy_resolver::Requester;
use fedi_policy::application::repository_factory::Repositories;
use fedi_policy::domain::account::Account;
use fedi_policy::domain::engine_config::InstanceConfig;
use fedi_policy::domain::policy::InteractionPolicy;
use fedi_policy::domain::relationship::{Block, Follow, FollowRequest};
use fedi_policy::domain::repository::{AccountRepository, RelationshipRepository, StatusRepository};
use fedi_policy::domain::status::Status;
use fedi_policy::domain::visibility::Visibility;
use fedi_policy::infrastructure::repositories::{
    InMemoryAccountRepository, InMemoryRelationshipRepository, InMemoryStatusRepository,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub accounts: Vec<ScenarioAccount>,
    #[serde(default)]
    pub follows: Vec<ScenarioEdge>,
    #[serde(default)]
    pub follow_requests: Vec<ScenarioEdge>,
    #[serde(default)]
    pub blocks: Vec<ScenarioEdge>,
    pub status: ScenarioStatus,
    /// Username of the requester; anonymous when omitted.
    #[serde(default)]
    pub requester: Option<String>,
    /// Remote collections the requester is known to belong to.
    #[serde(default)]
    pub verified_collections: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioAccount {
    pub username: String,
    /// Set for remote accounts.
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub followers_uri: Option<String>,
    #[serde(default)]
    pub following_uri: Option<String>,
    #[serde(default)]
    pub locked: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioEdge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioStatus {
    pub author: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub mentions: Vec<String>,
    /// Explicit policy; the visibility default applies when omitted.
    #[serde(default)]
    pub policy: Option<InteractionPolicy>,
}

/// A scenario loaded into in-memory stores.
pub struct LoadedScenario {
    pub repositories: Repositories,
    pub status: Status,
    pub author: Account,
    pub mentions: Vec<Account>,
    pub requester: Requester,
}

impl Scenario {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_yaml_str(&content).with_context(|| format!("Invalid scenario {}", path.display()))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub async fn load(&self, instance: &InstanceConfig) -> Result<LoadedScenario> {
        let relationships = Arc::new(InMemoryRelationshipRepository::new());
        let accounts = Arc::new(InMemoryAccountRepository::new());
        let statuses = Arc::new(InMemoryStatusRepository::new());

        let mut by_name: HashMap<&str, Account> = HashMap::new();
        for entry in &self.accounts {
            let account = entry.to_account(instance)?;
            accounts.save(&account).await?;
            by_name.insert(entry.username.as_str(), account);
        }
        let lookup = |name: &str| -> Result<Account> {
            by_name
                .get(name)
                .cloned()
                .with_context(|| format!("Unknown account '{}' in scenario", name))
        };

        for edge in &self.follows {
            let (origin, target) = (lookup(edge.from.as_str())?, lookup(edge.to.as_str())?);
            let uri = format!("{}/follow/{}", origin.uri, target.username);
            relationships.put_follow(&Follow::new(uri, origin.id, target.id)).await?;
        }
        for edge in &self.follow_requests {
            let (origin, target) = (lookup(edge.from.as_str())?, lookup(edge.to.as_str())?);
            let uri = format!("{}/follow/{}", origin.uri, target.username);
            relationships
                .put_follow_request(&FollowRequest::new(uri, origin.id, target.id))
                .await?;
        }
        for edge in &self.blocks {
            let (origin, target) = (lookup(edge.from.as_str())?, lookup(edge.to.as_str())?);
            let uri = format!("{}/block/{}", origin.uri, target.username);
            relationships.put_block(&Block::new(uri, origin.id, target.id)).await?;
        }

        let author = lookup(self.status.author.as_str())?;
        let mentions = self
            .status
            .mentions
            .iter()
            .map(|name| lookup(name.as_str()))
            .collect::<Result<Vec<_>>>()?;

        let mut status = Status::new(author.id, format!("{}/statuses/1", author.uri), self.status.visibility)
            .with_mentions(mentions.iter().map(|a| a.id));
        if let Some(policy) = &self.status.policy {
            status = status.with_policy(policy.clone());
        }
        statuses.save(&status).await?;

        let requester = match &self.requester {
            None => Requester::anonymous(),
            Some(name) => self
                .verified_collections
                .iter()
                .fold(Requester::for_account(lookup(name.as_str())?), |r, uri| r.with_verified_collection(uri.clone())),
        };

        Ok(LoadedScenario {
            repositories: Repositories {
                relationships,
                accounts,
                statuses,
            },
            status,
            author,
            mentions,
            requester,
        })
    }
}

impl ScenarioAccount {
    fn to_account(&self, instance: &InstanceConfig) -> Result<Account> {
        if self.domain.is_none() && (self.uri.is_some() || self.followers_uri.is_some() || self.following_uri.is_some()) {
            bail!("Local account '{}' cannot override its URIs", self.username);
        }
        let account = match &self.domain {
            None => Account::new_local(&self.username, instance)?,
            Some(domain) => {
                let uri = self
                    .uri
                    .clone()
                    .unwrap_or_else(|| format!("https://{}/users/{}", domain, self.username));
                let followers = self.followers_uri.clone().unwrap_or_else(|| format!("{}/followers", uri));
                let following = self.following_uri.clone().unwrap_or_else(|| format!("{}/following", uri));
                Account::new_remote(&self.username, domain, &uri, &followers, &following)?
            }
        };
        Ok(account.with_locked(self.locked))
    }
}
