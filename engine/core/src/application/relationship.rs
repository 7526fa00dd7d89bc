// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

//! Relationship Service
//!
//! Application service for relationship changes that originate locally:
//! follows, follow request handling, blocks and mutes.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Apply graph mutations and publish the matching
//!   `RelationshipEvent`
//! - **Collaborators:**
//!   - Domain: Follow, FollowRequest, Block, Mute, Relationship
//!   - Infrastructure: RelationshipRepository, AccountRepository, EventBus

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::account::{Account, AccountId};
use crate::domain::events::RelationshipEvent;
use crate::domain::relationship::{Block, Follow, FollowRequest, Mute, Relationship};
use crate::domain::repository::{optional, AccountRepository, RelationshipRepository, RepositoryError};
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Error)]
pub enum RelationshipError {
    #[error("Account {0} cannot target itself")]
    SelfTarget(AccountId),

    #[error("Account {0} not found")]
    AccountNotFound(AccountId),

    #[error("Block between {origin} and {target}")]
    Blocked { origin: AccountId, target: AccountId },

    #[error("No pending follow request from {origin} to {target}")]
    NoFollowRequest { origin: AccountId, target: AccountId },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// What a follow attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowOutcome {
    /// The origin now follows the target.
    Following(Follow),
    /// The target has to approve first.
    Requested(FollowRequest),
}

impl FollowOutcome {
    pub fn uri(&self) -> &str {
        match self {
            FollowOutcome::Following(follow) => &follow.uri,
            FollowOutcome::Requested(request) => &request.uri,
        }
    }
}

pub struct RelationshipService {
    relationships: Arc<dyn RelationshipRepository>,
    accounts: Arc<dyn AccountRepository>,
    event_bus: Option<Arc<EventBus>>,
}

impl RelationshipService {
    pub fn new(relationships: Arc<dyn RelationshipRepository>, accounts: Arc<dyn AccountRepository>) -> Self {
        Self {
            relationships,
            accounts,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Follow `target`, or ask to when the target reviews followers.
    ///
    /// Locked and remote targets get a follow request. Repeating a follow
    /// returns the existing follow or request unchanged. The store refuses
    /// the edge while either account blocks the other.
    pub async fn follow(&self, origin: AccountId, target: AccountId) -> Result<FollowOutcome, RelationshipError> {
        if origin == target {
            return Err(RelationshipError::SelfTarget(origin));
        }
        let origin_account = self.account(origin).await?;
        let target_account = self.account(target).await?;

        if let Some(existing) = optional(self.relationships.get_follow(origin, target).await)? {
            debug!(origin = %origin, target = %target, "Already following");
            return Ok(FollowOutcome::Following(existing));
        }
        if let Some(pending) = optional(self.relationships.get_follow_request(origin, target).await)? {
            debug!(origin = %origin, target = %target, "Follow request already pending");
            return Ok(FollowOutcome::Requested(pending));
        }

        if target_account.locked || !target_account.is_local() {
            let mut request = FollowRequest::new(String::new(), origin, target);
            request.uri = record_uri(&origin_account, "follow", request.id);
            self.relationships
                .put_follow_request(&request)
                .await
                .map_err(|e| edge_error(e, origin, target))?;

            info!(origin = %origin, target = %target, uri = %request.uri, "Follow requested");
            self.publish(RelationshipEvent::FollowRequested {
                account_id: origin,
                target_account_id: target,
                uri: request.uri.clone(),
                requested_at: Utc::now(),
            });
            return Ok(FollowOutcome::Requested(request));
        }

        let mut follow = Follow::new(String::new(), origin, target);
        follow.uri = record_uri(&origin_account, "follow", follow.id);
        self.relationships
            .put_follow(&follow)
            .await
            .map_err(|e| edge_error(e, origin, target))?;

        info!(origin = %origin, target = %target, uri = %follow.uri, "Followed");
        self.publish(RelationshipEvent::Followed {
            account_id: origin,
            target_account_id: target,
            uri: follow.uri.clone(),
            followed_at: Utc::now(),
        });
        Ok(FollowOutcome::Following(follow))
    }

    pub async fn accept_follow_request(&self, origin: AccountId, target: AccountId) -> Result<Follow, RelationshipError> {
        let follow = match self.relationships.accept_follow_request(origin, target).await {
            Ok(follow) => follow,
            Err(err) if err.is_not_found() => return Err(RelationshipError::NoFollowRequest { origin, target }),
            Err(err) => return Err(err.into()),
        };

        info!(origin = %origin, target = %target, "Follow request accepted");
        self.publish(RelationshipEvent::FollowRequestAccepted {
            account_id: origin,
            target_account_id: target,
            uri: follow.uri.clone(),
            accepted_at: Utc::now(),
        });
        Ok(follow)
    }

    pub async fn reject_follow_request(&self, origin: AccountId, target: AccountId) -> Result<FollowRequest, RelationshipError> {
        let request = match self.relationships.reject_follow_request(origin, target).await {
            Ok(request) => request,
            Err(err) if err.is_not_found() => return Err(RelationshipError::NoFollowRequest { origin, target }),
            Err(err) => return Err(err.into()),
        };

        info!(origin = %origin, target = %target, "Follow request rejected");
        self.publish(RelationshipEvent::FollowRequestRejected {
            account_id: origin,
            target_account_id: target,
            uri: request.uri.clone(),
            rejected_at: Utc::now(),
        });
        Ok(request)
    }

    /// Stop following `target`, withdrawing a pending request as well.
    ///
    /// Returns the URI of what was removed, `None` when there was nothing.
    pub async fn unfollow(&self, origin: AccountId, target: AccountId) -> Result<Option<String>, RelationshipError> {
        let follow_uri = self.relationships.unfollow(origin, target).await?;
        let request_uri = self.relationships.unfollow_request(origin, target).await?;

        let Some(uri) = follow_uri.or(request_uri) else {
            debug!(origin = %origin, target = %target, "Nothing to unfollow");
            return Ok(None);
        };

        info!(origin = %origin, target = %target, uri = %uri, "Unfollowed");
        self.publish(RelationshipEvent::Unfollowed {
            account_id: origin,
            target_account_id: target,
            uri: uri.clone(),
            unfollowed_at: Utc::now(),
        });
        Ok(Some(uri))
    }

    /// Block `target`. Follows and follow requests between the two accounts
    /// are removed in both directions, in the same store operation as the
    /// block itself.
    pub async fn block(&self, origin: AccountId, target: AccountId) -> Result<Block, RelationshipError> {
        if origin == target {
            return Err(RelationshipError::SelfTarget(origin));
        }
        let origin_account = self.account(origin).await?;

        let mut block = Block::new(String::new(), origin, target);
        block.uri = record_uri(&origin_account, "block", block.id);
        match self.relationships.block_and_sever(&block).await {
            Ok(()) => {}
            Err(RepositoryError::AlreadyExists(_)) => {
                debug!(origin = %origin, target = %target, "Already blocking");
                return Ok(self.relationships.get_block(origin, target).await?);
            }
            Err(err) => return Err(err.into()),
        }

        info!(origin = %origin, target = %target, uri = %block.uri, "Blocked");
        self.publish(RelationshipEvent::Blocked {
            account_id: origin,
            target_account_id: target,
            uri: block.uri.clone(),
            blocked_at: Utc::now(),
        });
        Ok(block)
    }

    /// Remove the block on `target`, returning its URI if there was one.
    pub async fn unblock(&self, origin: AccountId, target: AccountId) -> Result<Option<String>, RelationshipError> {
        let Some(block) = optional(self.relationships.get_block(origin, target).await)? else {
            return Ok(None);
        };
        self.relationships.delete_block_by_id(block.id).await?;

        info!(origin = %origin, target = %target, "Unblocked");
        self.publish(RelationshipEvent::Unblocked {
            account_id: origin,
            target_account_id: target,
            uri: block.uri.clone(),
            unblocked_at: Utc::now(),
        });
        Ok(Some(block.uri))
    }

    pub async fn mute(&self, origin: AccountId, target: AccountId, notifications: bool) -> Result<Mute, RelationshipError> {
        if origin == target {
            return Err(RelationshipError::SelfTarget(origin));
        }
        let mute = Mute::new(origin, target, notifications);
        self.relationships.put_mute(&mute).await?;

        self.publish(RelationshipEvent::Muted {
            account_id: origin,
            target_account_id: target,
            muted_at: Utc::now(),
        });
        Ok(mute)
    }

    pub async fn unmute(&self, origin: AccountId, target: AccountId) -> Result<bool, RelationshipError> {
        let removed = self.relationships.delete_mute(origin, target).await?;
        if removed {
            self.publish(RelationshipEvent::Unmuted {
                account_id: origin,
                target_account_id: target,
                unmuted_at: Utc::now(),
            });
        }
        Ok(removed)
    }

    pub async fn relationship(&self, requesting: AccountId, target: AccountId) -> Result<Relationship, RelationshipError> {
        Ok(self.relationships.get_relationship(requesting, target).await?)
    }

    async fn account(&self, id: AccountId) -> Result<Account, RelationshipError> {
        optional(self.accounts.resolve(id).await)?.ok_or(RelationshipError::AccountNotFound(id))
    }

    fn publish(&self, event: RelationshipEvent) {
        if let Some(event_bus) = &self.event_bus {
            event_bus.publish_relationship_event(event);
        }
    }
}

fn edge_error(err: RepositoryError, origin: AccountId, target: AccountId) -> RelationshipError {
    match err {
        RepositoryError::Blocked(_) => RelationshipError::Blocked { origin, target },
        other => other.into(),
    }
}

fn record_uri(actor: &Account, kind: &str, id: Uuid) -> String {
    format!("{}/{}/{}", actor.uri.trim_end_matches('/'), kind, id)
}
