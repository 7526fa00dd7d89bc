// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

//! Interaction Policy Evaluation
//!
//! Decides whether a requester may like, reply to or announce a status.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Evaluate a status's interaction policy for one requester
//! - **Collaborators:**
//!   - Domain: InteractionPolicy, PolicyResult, Status
//!   - Application: PolicyValueResolver
//!   - Infrastructure: RelationshipRepository, AccountRepository,
//!     StatusRepository, EventBus
//!
//! # Algorithm
//!
//! 1. A block between requester and author in either direction is a veto:
//!    `Forbidden`, whatever the policy says.
//! 2. Rule tiers are visited most permissive first (`always`, then
//!    `with_approval`). A tier no more permissive than the decision so far
//!    is skipped, so the first matching tier decides.
//! 3. Nothing matched: `Forbidden`.
//!
//! Every decision is published as `InteractionEvaluated` when an event bus
//! is attached.
//!
//! Inside a tier, values answerable without I/O are checked before any
//! relationship lookup is issued.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::application::policy_resolver::{PolicyValueResolver, Requester};
use crate::domain::account::AccountId;
use crate::domain::engine_config::EvaluationConfig;
use crate::domain::events::InteractionEvent;
use crate::domain::policy::{InteractionKind, InteractionPolicy, PolicyResult, PolicyValue};
use crate::domain::repository::{
    optional, AccountRepository, RelationshipRepository, RepositoryError, StatusRepository,
};
use crate::domain::status::{Status, StatusId};
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Decisions for all three interaction kinds on one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionPermissions {
    pub like: PolicyResult,
    pub reply: PolicyResult,
    pub announce: PolicyResult,
}

impl InteractionPermissions {
    pub fn forbidden() -> Self {
        Self {
            like: PolicyResult::Forbidden,
            reply: PolicyResult::Forbidden,
            announce: PolicyResult::Forbidden,
        }
    }

    pub fn get(&self, kind: InteractionKind) -> PolicyResult {
        match kind {
            InteractionKind::Like => self.like,
            InteractionKind::Reply => self.reply,
            InteractionKind::Announce => self.announce,
        }
    }
}

#[async_trait]
pub trait InteractionPolicyService: Send + Sync {
    /// Evaluate `policy` for one interaction kind on `status` and publish
    /// the decision.
    async fn evaluate(
        &self,
        policy: &InteractionPolicy,
        kind: InteractionKind,
        status: &Status,
        requester: &Requester,
    ) -> Result<PolicyResult, InteractionError>;

    /// Load the status and requester, then evaluate the status's effective
    /// policy.
    ///
    /// A status that does not exist, or a requester that cannot be resolved,
    /// yields `Forbidden`.
    async fn evaluate_status(
        &self,
        status_id: StatusId,
        kind: InteractionKind,
        requester_id: Option<AccountId>,
    ) -> Result<PolicyResult, InteractionError>;

    /// Evaluate the status's effective policy for every interaction kind.
    async fn permissions(&self, status: &Status, requester: &Requester) -> Result<InteractionPermissions, InteractionError>;
}

pub struct StandardInteractionPolicyService {
    resolver: PolicyValueResolver,
    relationships: Arc<dyn RelationshipRepository>,
    accounts: Arc<dyn AccountRepository>,
    statuses: Arc<dyn StatusRepository>,
    concurrent_lookups: bool,
    event_bus: Option<Arc<EventBus>>,
}

impl StandardInteractionPolicyService {
    pub fn new(
        relationships: Arc<dyn RelationshipRepository>,
        accounts: Arc<dyn AccountRepository>,
        statuses: Arc<dyn StatusRepository>,
    ) -> Self {
        Self {
            resolver: PolicyValueResolver::new(relationships.clone()),
            relationships,
            accounts,
            statuses,
            concurrent_lookups: true,
            event_bus: None,
        }
    }

    pub fn with_config(mut self, config: &EvaluationConfig) -> Self {
        self.concurrent_lookups = config.concurrent_lookups;
        self
    }

    pub fn with_concurrent_lookups(mut self, enabled: bool) -> Self {
        self.concurrent_lookups = enabled;
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    async fn is_blocked(&self, status: &Status, requester: &Requester) -> Result<bool, RepositoryError> {
        let Some(requester_id) = requester.id() else {
            return Ok(false);
        };
        if status.is_author(requester_id) {
            return Ok(false);
        }
        match self.relationships.is_blocked(requester_id, status.account_id, true).await {
            Ok(blocked) => Ok(blocked),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn any_matches(&self, values: &[&PolicyValue], status: &Status, requester: &Requester) -> Result<bool, RepositoryError> {
        let mut pending = Vec::new();
        for value in values {
            match self.resolver.matches_without_lookup(value, status, requester) {
                Some(true) => return Ok(true),
                Some(false) => {}
                None => pending.push(*value),
            }
        }

        if pending.is_empty() {
            return Ok(false);
        }

        if self.concurrent_lookups {
            let lookups = pending
                .iter()
                .map(|value| self.resolver.matches(value, status, requester));
            let answers = try_join_all(lookups).await?;
            return Ok(answers.into_iter().any(|matched| matched));
        }

        for value in pending {
            if self.resolver.matches(value, status, requester).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn resolve_requester(&self, requester_id: Option<AccountId>) -> Result<Option<Requester>, RepositoryError> {
        let Some(id) = requester_id else {
            return Ok(Some(Requester::anonymous()));
        };
        Ok(optional(self.accounts.resolve(id).await)?.map(Requester::for_account))
    }

    async fn decide(
        &self,
        policy: &InteractionPolicy,
        kind: InteractionKind,
        status: &Status,
        requester: &Requester,
    ) -> Result<PolicyResult, RepositoryError> {
        if self.is_blocked(status, requester).await? {
            debug!(
                status_id = %status.id,
                requester = ?requester.id(),
                kind = %kind,
                "Block between requester and author, interaction forbidden"
            );
            return Ok(PolicyResult::Forbidden);
        }

        let mut decision = PolicyResult::Forbidden;
        for (result, values) in policy.rules_for(kind).tiers() {
            if result <= decision || values.is_empty() {
                continue;
            }
            if self.any_matches(&values, status, requester).await? {
                debug!(status_id = %status.id, requester = ?requester.id(), kind = %kind, result = %result, "Policy matched");
                decision = PolicyResult::most_permissive([decision, result]);
            }
        }

        if decision.is_forbidden() {
            debug!(status_id = %status.id, requester = ?requester.id(), kind = %kind, "No policy value matched");
        }
        Ok(decision)
    }

    fn publish(&self, status_id: StatusId, requester_id: Option<AccountId>, kind: InteractionKind, result: PolicyResult) {
        info!(status_id = %status_id, requester = ?requester_id, kind = %kind, result = %result, "Interaction evaluated");
        if let Some(event_bus) = &self.event_bus {
            event_bus.publish_interaction_event(InteractionEvent::InteractionEvaluated {
                status_id,
                requester_id,
                kind,
                result,
                evaluated_at: Utc::now(),
            });
        }
    }
}

#[async_trait]
impl InteractionPolicyService for StandardInteractionPolicyService {
    async fn evaluate(
        &self,
        policy: &InteractionPolicy,
        kind: InteractionKind,
        status: &Status,
        requester: &Requester,
    ) -> Result<PolicyResult, InteractionError> {
        let result = self.decide(policy, kind, status, requester).await?;
        self.publish(status.id, requester.id(), kind, result);
        Ok(result)
    }

    async fn evaluate_status(
        &self,
        status_id: StatusId,
        kind: InteractionKind,
        requester_id: Option<AccountId>,
    ) -> Result<PolicyResult, InteractionError> {
        let Some(status) = self.statuses.find_by_id(status_id).await? else {
            debug!(status_id = %status_id, "Status not found, interaction forbidden");
            self.publish(status_id, requester_id, kind, PolicyResult::Forbidden);
            return Ok(PolicyResult::Forbidden);
        };
        let Some(requester) = self.resolve_requester(requester_id).await? else {
            debug!(status_id = %status_id, requester = ?requester_id, "Requester could not be resolved, interaction forbidden");
            self.publish(status_id, requester_id, kind, PolicyResult::Forbidden);
            return Ok(PolicyResult::Forbidden);
        };

        self.evaluate(&status.effective_policy(), kind, &status, &requester)
            .await
    }

    async fn permissions(&self, status: &Status, requester: &Requester) -> Result<InteractionPermissions, InteractionError> {
        let policy = status.effective_policy();
        Ok(InteractionPermissions {
            like: self.evaluate(&policy, InteractionKind::Like, status, requester).await?,
            reply: self.evaluate(&policy, InteractionKind::Reply, status, requester).await?,
            announce: self.evaluate(&policy, InteractionKind::Announce, status, requester).await?,
        })
    }
}
