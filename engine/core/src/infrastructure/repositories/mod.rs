// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the collaborator traits defined in
//! `crate::domain::repository`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve accounts, statuses and the social graph
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! - **PostgresRelationshipRepository** - follows, follow requests, blocks, mutes
//! - **PostgresAccountRepository** - actor resolution
//! - **PostgresStatusRepository** - statuses with their interaction policies
//!
//! ## In-Memory Repositories
//!
//! - **InMemoryRelationshipRepository** - indexed pair-keyed graph
//! - **InMemoryAccountRepository** - HashMap-backed, with a URI index
//! - **InMemoryStatusRepository** - HashMap-backed

pub mod postgres_account;
pub mod postgres_relationship;
pub mod postgres_status;
pub mod relationship_graph;

pub use relationship_graph::InMemoryRelationshipRepository;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::account::{Account, AccountId};
use crate::domain::repository::{AccountRepository, RepositoryError, StatusRepository};
use crate::domain::status::{Status, StatusId};

#[derive(Default)]
struct AccountTable {
    by_id: HashMap<AccountId, Account>,
    by_uri: HashMap<String, AccountId>,
}

#[derive(Clone, Default)]
pub struct InMemoryAccountRepository {
    accounts: Arc<RwLock<AccountTable>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn save(&self, account: &Account) -> Result<(), RepositoryError> {
        let mut table = self.accounts.write();
        if let Some(owner) = table.by_uri.get(&account.uri) {
            if *owner != account.id {
                return Err(RepositoryError::AlreadyExists(format!(
                    "Account with URI {}",
                    account.uri
                )));
            }
        }
        if let Some(previous) = table.by_id.insert(account.id, account.clone()) {
            table.by_uri.remove(&previous.uri);
        }
        table.by_uri.insert(account.uri.clone(), account.id);
        Ok(())
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        Ok(self.accounts.read().by_id.get(&id).cloned())
    }

    async fn find_by_uri(&self, uri: &str) -> Result<Option<Account>, RepositoryError> {
        let table = self.accounts.read();
        Ok(table
            .by_uri
            .get(uri)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn delete(&self, id: AccountId) -> Result<(), RepositoryError> {
        let mut table = self.accounts.write();
        if let Some(account) = table.by_id.remove(&id) {
            table.by_uri.remove(&account.uri);
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStatusRepository {
    statuses: Arc<RwLock<HashMap<StatusId, Status>>>,
}

impl InMemoryStatusRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusRepository for InMemoryStatusRepository {
    async fn save(&self, status: &Status) -> Result<(), RepositoryError> {
        self.statuses.write().insert(status.id, status.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: StatusId) -> Result<Option<Status>, RepositoryError> {
        Ok(self.statuses.read().get(&id).cloned())
    }

    async fn find_by_uri(&self, uri: &str) -> Result<Option<Status>, RepositoryError> {
        Ok(self
            .statuses
            .read()
            .values()
            .find(|s| s.uri == uri)
            .cloned())
    }

    async fn delete(&self, id: StatusId) -> Result<(), RepositoryError> {
        self.statuses.write().remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::engine_config::InstanceConfig;
    use crate::domain::visibility::Visibility;

    #[tokio::test]
    async fn test_account_lookup_by_uri() {
        let repo = InMemoryAccountRepository::new();
        let account = Account::new_local("zork", &InstanceConfig::default()).unwrap();
        repo.save(&account).await.unwrap();

        let found = repo.find_by_uri("http://localhost:8080/users/zork").await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(account.id));

        repo.delete(account.id).await.unwrap();
        assert!(repo.find_by_uri(&account.uri).await.unwrap().is_none());
        assert!(repo.resolve(account.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_account_uri_must_be_unique() {
        let repo = InMemoryAccountRepository::new();
        let instance = InstanceConfig::default();
        let first = Account::new_local("zork", &instance).unwrap();
        let second = Account::new_local("zork", &instance).unwrap();

        repo.save(&first).await.unwrap();
        assert!(matches!(
            repo.save(&second).await,
            Err(RepositoryError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_many_skips_unknown() {
        let repo = InMemoryAccountRepository::new();
        let account = Account::new_local("zork", &InstanceConfig::default()).unwrap();
        repo.save(&account).await.unwrap();

        let resolved = repo.resolve_many(&[account.id, AccountId::new()]).await.unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[tokio::test]
    async fn test_status_roundtrip() {
        let repo = InMemoryStatusRepository::new();
        let status = Status::new(AccountId::new(), "http://localhost:8080/statuses/1", Visibility::Public);
        repo.save(&status).await.unwrap();

        assert_eq!(repo.find_by_id(status.id).await.unwrap(), Some(status.clone()));
        assert_eq!(
            repo.find_by_uri("http://localhost:8080/statuses/1").await.unwrap().map(|s| s.id),
            Some(status.id)
        );

        repo.delete(status.id).await.unwrap();
        assert!(repo.find_by_id(status.id).await.unwrap().is_none());
    }
}
