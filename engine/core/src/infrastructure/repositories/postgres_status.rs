// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0
//! Postgres Status
//!
//! Statuses are stored with their visibility as text and their explicit
//! interaction policy, when one was set, as JSONB.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements `StatusRepository`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::account::AccountId;
use crate::domain::policy::InteractionPolicy;
use crate::domain::repository::{RepositoryError, StatusRepository};
use crate::domain::status::{Status, StatusId};
use crate::domain::visibility::Visibility;

pub struct PostgresStatusRepository {
    pool: PgPool,
}

impl PostgresStatusRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusRepository for PostgresStatusRepository {
    async fn save(&self, status: &Status) -> Result<(), RepositoryError> {
        let policy_json = status
            .interaction_policy
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        let mentions: Vec<Uuid> = status.mentions.iter().map(|id| id.0).collect();

        sqlx::query(
            r#"
            INSERT INTO statuses (id, uri, account_id, visibility, mentions, interaction_policy, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                uri = EXCLUDED.uri,
                visibility = EXCLUDED.visibility,
                mentions = EXCLUDED.mentions,
                interaction_policy = EXCLUDED.interaction_policy
            "#,
        )
        .bind(status.id.0)
        .bind(&status.uri)
        .bind(status.account_id.0)
        .bind(status.visibility.as_str())
        .bind(&mentions)
        .bind(policy_json)
        .bind(status.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save status: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, id: StatusId) -> Result<Option<Status>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, uri, account_id, visibility, mentions, interaction_policy, created_at
            FROM statuses
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.map(parse_status_row).transpose()
    }

    async fn find_by_uri(&self, uri: &str) -> Result<Option<Status>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, uri, account_id, visibility, mentions, interaction_policy, created_at
            FROM statuses
            WHERE uri = $1
            "#,
        )
        .bind(uri)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.map(parse_status_row).transpose()
    }

    async fn delete(&self, id: StatusId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM statuses WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(())
    }
}

fn parse_status_row(row: PgRow) -> Result<Status, RepositoryError> {
    let id: Uuid = row.get("id");
    let account_id: Uuid = row.get("account_id");
    let visibility_str: String = row.get("visibility");
    let mentions: Vec<Uuid> = row.get("mentions");
    let policy_json: Option<serde_json::Value> = row.get("interaction_policy");
    let created_at: DateTime<Utc> = row.get("created_at");

    // A stored visibility the engine does not know is corrupt data, not a denial
    let visibility: Visibility = visibility_str.parse().map_err(|e| {
        RepositoryError::Serialization(format!("Status {}: {}", id, e))
    })?;

    let interaction_policy = policy_json
        .map(serde_json::from_value::<InteractionPolicy>)
        .transpose()?;

    Ok(Status {
        id: StatusId(id),
        uri: row.get("uri"),
        account_id: AccountId(account_id),
        visibility,
        mentions: mentions.into_iter().map(AccountId).collect(),
        interaction_policy,
        created_at,
    })
}
