// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates concrete repository implementations based on storage backend
//! configuration, keeping the domain layer free of infrastructure types.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Wire the collaborator traits to in-memory or PostgreSQL stores

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::domain::repository::{
    AccountRepository, RelationshipRepository, StatusRepository, StorageBackend,
};
use crate::infrastructure::db::Database;
use crate::infrastructure::repositories::postgres_account::PostgresAccountRepository;
use crate::infrastructure::repositories::postgres_relationship::PostgresRelationshipRepository;
use crate::infrastructure::repositories::postgres_status::PostgresStatusRepository;
use crate::infrastructure::repositories::{
    InMemoryAccountRepository, InMemoryRelationshipRepository, InMemoryStatusRepository,
};

/// The three stores the engine consumes.
#[derive(Clone)]
pub struct Repositories {
    pub relationships: Arc<dyn RelationshipRepository>,
    pub accounts: Arc<dyn AccountRepository>,
    pub statuses: Arc<dyn StatusRepository>,
}

/// Creates a RelationshipRepository implementation based on the configured backend
pub fn create_relationship_repository(
    backend: &StorageBackend,
    pool: Option<PgPool>,
) -> Result<Arc<dyn RelationshipRepository>> {
    match backend {
        StorageBackend::InMemory => Ok(Arc::new(InMemoryRelationshipRepository::new())),
        StorageBackend::PostgreSQL(_) => {
            let pool = pool.context("PostgreSQL backend requires a connection pool")?;
            Ok(Arc::new(PostgresRelationshipRepository::new(pool)))
        }
    }
}

/// Creates an AccountRepository implementation based on the configured backend
pub fn create_account_repository(
    backend: &StorageBackend,
    pool: Option<PgPool>,
) -> Result<Arc<dyn AccountRepository>> {
    match backend {
        StorageBackend::InMemory => Ok(Arc::new(InMemoryAccountRepository::new())),
        StorageBackend::PostgreSQL(_) => {
            let pool = pool.context("PostgreSQL backend requires a connection pool")?;
            Ok(Arc::new(PostgresAccountRepository::new(pool)))
        }
    }
}

/// Creates a StatusRepository implementation based on the configured backend
pub fn create_status_repository(
    backend: &StorageBackend,
    pool: Option<PgPool>,
) -> Result<Arc<dyn StatusRepository>> {
    match backend {
        StorageBackend::InMemory => Ok(Arc::new(InMemoryStatusRepository::new())),
        StorageBackend::PostgreSQL(_) => {
            let pool = pool.context("PostgreSQL backend requires a connection pool")?;
            Ok(Arc::new(PostgresStatusRepository::new(pool)))
        }
    }
}

/// Connect (and migrate) when the backend needs a database, then build all
/// three stores.
pub async fn create_repositories(backend: &StorageBackend) -> Result<Repositories> {
    let pool = match backend {
        StorageBackend::InMemory => None,
        StorageBackend::PostgreSQL(config) => {
            let database = Database::connect(config).await?;
            database.migrate().await?;
            Some(database.get_pool().clone())
        }
    };

    Ok(Repositories {
        relationships: create_relationship_repository(backend, pool.clone())?,
        accounts: create_account_repository(backend, pool.clone())?,
        statuses: create_status_repository(backend, pool)?,
    })
}
