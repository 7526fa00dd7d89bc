// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0
//! Postgres Account
//!
//! Actor resolution backed by the `accounts` table.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements `AccountRepository`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::account::{Account, AccountId};
use crate::domain::repository::{AccountRepository, RepositoryError};

pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn save(&self, account: &Account) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, username, domain, uri, followers_uri, following_uri, locked, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                username = EXCLUDED.username,
                domain = EXCLUDED.domain,
                uri = EXCLUDED.uri,
                followers_uri = EXCLUDED.followers_uri,
                following_uri = EXCLUDED.following_uri,
                locked = EXCLUDED.locked
            "#,
        )
        .bind(account.id.0)
        .bind(&account.username)
        .bind(&account.domain)
        .bind(&account.uri)
        .bind(&account.followers_uri)
        .bind(&account.following_uri)
        .bind(account.locked)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &account.uri))?;

        Ok(())
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, domain, uri, followers_uri, following_uri, locked, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(row.map(parse_account_row))
    }

    async fn find_by_uri(&self, uri: &str) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, username, domain, uri, followers_uri, following_uri, locked, created_at
            FROM accounts
            WHERE uri = $1
            "#,
        )
        .bind(uri)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(row.map(parse_account_row))
    }

    async fn delete(&self, id: AccountId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(())
    }
}

fn map_unique_violation(err: sqlx::Error, uri: &str) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return RepositoryError::AlreadyExists(format!("Account with URI {}", uri));
        }
    }
    RepositoryError::Database(format!("Failed to save account: {}", err))
}

fn parse_account_row(row: sqlx::postgres::PgRow) -> Account {
    let id: uuid::Uuid = row.get("id");
    let created_at: DateTime<Utc> = row.get("created_at");
    Account {
        id: AccountId(id),
        username: row.get("username"),
        domain: row.get("domain"),
        uri: row.get("uri"),
        followers_uri: row.get("followers_uri"),
        following_uri: row.get("following_uri"),
        locked: row.get("locked"),
        created_at,
    }
}
