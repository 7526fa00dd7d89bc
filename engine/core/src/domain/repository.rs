// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Collaborator Interfaces
//!
//! Persistence contracts consumed by the policy engine. The engine never
//! touches storage directly; it only sees boolean and aggregate answers from
//! these traits, implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Role | Implementations |
//! |-------|------|----------------|
//! | `RelationshipRepository` | Follow / follow request / block / mute graph | `InMemoryRelationshipRepository`, `PostgresRelationshipRepository` |
//! | `AccountRepository` | Actor resolution | `InMemoryAccountRepository`, `PostgresAccountRepository` |
//! | `StatusRepository` | Content store | `InMemoryStatusRepository`, `PostgresStatusRepository` |
//!
//! ## Not found
//!
//! Missing relationships and unknown actors surface as
//! [`RepositoryError::NotFound`]. Callers treat that as a negative answer
//! rather than a failure; every other variant is a genuine storage error.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::account::{Account, AccountId};
use crate::domain::relationship::{Block, Follow, FollowRequest, Mute, Relationship};
use crate::domain::status::{Status, StatusId};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

/// The relationship graph.
///
/// All mutations on one ordered `(origin, target)` pair are atomic with
/// respect to each other.
#[async_trait]
pub trait RelationshipRepository: Send + Sync {
    /// Whether `origin` follows `target`.
    async fn is_following(&self, origin: AccountId, target: AccountId) -> Result<bool, RepositoryError>;

    /// Whether `a` and `b` follow each other.
    async fn is_mutual_following(&self, a: AccountId, b: AccountId) -> Result<bool, RepositoryError> {
        Ok(self.is_following(a, b).await? && self.is_following(b, a).await?)
    }

    /// Whether `origin` has a pending follow request to `target`.
    async fn is_follow_requested(&self, origin: AccountId, target: AccountId) -> Result<bool, RepositoryError>;

    /// Whether `a` blocks `b`, or with `either_direction` whether either blocks the other.
    async fn is_blocked(&self, a: AccountId, b: AccountId, either_direction: bool) -> Result<bool, RepositoryError>;

    async fn is_muted(&self, origin: AccountId, target: AccountId) -> Result<bool, RepositoryError>;

    async fn get_follow(&self, origin: AccountId, target: AccountId) -> Result<Follow, RepositoryError>;

    async fn get_follow_request(&self, origin: AccountId, target: AccountId) -> Result<FollowRequest, RepositoryError>;

    async fn get_block(&self, origin: AccountId, target: AccountId) -> Result<Block, RepositoryError>;

    /// Aggregate view of how `requesting` relates to `target`.
    async fn get_relationship(&self, requesting: AccountId, target: AccountId) -> Result<Relationship, RepositoryError>;

    /// Insert a follow. Fails with `AlreadyExists` if the pair already has
    /// one, and with `Blocked` while either account blocks the other.
    async fn put_follow(&self, follow: &Follow) -> Result<(), RepositoryError>;

    /// Insert a follow request. Fails with `AlreadyExists` if the pair
    /// already has a follow or a pending request, and with `Blocked` while
    /// either account blocks the other.
    async fn put_follow_request(&self, request: &FollowRequest) -> Result<(), RepositoryError>;

    /// Insert a block without touching other edges.
    async fn put_block(&self, block: &Block) -> Result<(), RepositoryError>;

    /// Insert a block and, in the same step, remove follows and follow
    /// requests between the two accounts in both directions.
    ///
    /// Fails with `AlreadyExists`, changing nothing, if the block exists.
    async fn block_and_sever(&self, block: &Block) -> Result<(), RepositoryError>;

    async fn put_mute(&self, mute: &Mute) -> Result<(), RepositoryError>;

    /// Promote the pending request from `origin` to `target` into a follow.
    ///
    /// An existing follow for the pair is kept and takes the request's URI.
    async fn accept_follow_request(&self, origin: AccountId, target: AccountId) -> Result<Follow, RepositoryError>;

    /// Remove and return the pending request from `origin` to `target`.
    async fn reject_follow_request(&self, origin: AccountId, target: AccountId) -> Result<FollowRequest, RepositoryError>;

    /// Remove the follow, returning its URI, or `None` if there was none.
    async fn unfollow(&self, origin: AccountId, target: AccountId) -> Result<Option<String>, RepositoryError>;

    /// Remove the pending request, returning its URI, or `None` if there was none.
    async fn unfollow_request(&self, origin: AccountId, target: AccountId) -> Result<Option<String>, RepositoryError>;

    async fn delete_block_by_id(&self, id: Uuid) -> Result<(), RepositoryError>;

    async fn delete_block_by_uri(&self, uri: &str) -> Result<(), RepositoryError>;

    async fn delete_blocks_by_origin_account(&self, origin: AccountId) -> Result<(), RepositoryError>;

    async fn delete_blocks_by_target_account(&self, target: AccountId) -> Result<(), RepositoryError>;

    /// Remove the mute, returning whether one existed.
    async fn delete_mute(&self, origin: AccountId, target: AccountId) -> Result<bool, RepositoryError>;

    /// Follows filtered by origin and/or target. `None` leaves that side open.
    async fn get_follows(&self, origin: Option<AccountId>, target: Option<AccountId>) -> Result<Vec<Follow>, RepositoryError>;

    async fn count_follows(&self, origin: Option<AccountId>, target: Option<AccountId>) -> Result<usize, RepositoryError> {
        Ok(self.get_follows(origin, target).await?.len())
    }

    async fn get_follow_requests(
        &self,
        origin: Option<AccountId>,
        target: Option<AccountId>,
    ) -> Result<Vec<FollowRequest>, RepositoryError>;
}

/// Actor resolution.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Save account (create or update)
    async fn save(&self, account: &Account) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError>;

    /// Find account by canonical actor URI
    async fn find_by_uri(&self, uri: &str) -> Result<Option<Account>, RepositoryError>;

    async fn delete(&self, id: AccountId) -> Result<(), RepositoryError>;

    /// Resolve an account, failing with `NotFound` for unknown or deleted actors.
    async fn resolve(&self, id: AccountId) -> Result<Account, RepositoryError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("Account {} not found", id)))
    }

    /// Resolve several accounts, skipping the ones that cannot be resolved.
    async fn resolve_many(&self, ids: &[AccountId]) -> Result<Vec<Account>, RepositoryError> {
        let mut accounts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(account) = self.find_by_id(*id).await? {
                accounts.push(account);
            }
        }
        Ok(accounts)
    }
}

/// Content store.
#[async_trait]
pub trait StatusRepository: Send + Sync {
    /// Save status (create or update)
    async fn save(&self, status: &Status) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: StatusId) -> Result<Option<Status>, RepositoryError>;

    async fn find_by_uri(&self, uri: &str) -> Result<Option<Status>, RepositoryError>;

    async fn delete(&self, id: StatusId) -> Result<(), RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Entity already exists: {0}")]
    AlreadyExists(String),

    #[error("Refused by block: {0}")]
    Blocked(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound(_))
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

/// Turn a not-found lookup into `None`, leaving other errors intact.
pub fn optional<T>(result: Result<T, RepositoryError>) -> Result<Option<T>, RepositoryError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}
