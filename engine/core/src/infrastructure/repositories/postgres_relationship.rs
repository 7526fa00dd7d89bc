// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0
//! Postgres Relationship
//!
//! The social graph over the `follows`, `follow_requests`, `blocks` and
//! `mutes` tables. Every table has a unique `(account_id, target_account_id)`
//! constraint, so one ordered pair can hold at most one edge of each kind.
//!
//! Writes that must see a consistent view of both directions (follow,
//! follow request, accept, block) first take a transaction-scoped advisory
//! lock on the unordered account pair, which serializes them per pair.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements `RelationshipRepository`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnection, PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::domain::account::AccountId;
use crate::domain::relationship::{Block, Follow, FollowRequest, Mute, Relationship};
use crate::domain::repository::{RelationshipRepository, RepositoryError};

pub struct PostgresRelationshipRepository {
    pool: PgPool,
}

impl PostgresRelationshipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, sql: &str, origin: AccountId, target: AccountId) -> Result<bool, RepositoryError> {
        let row = sqlx::query(sql)
            .bind(origin.0)
            .bind(target.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl RelationshipRepository for PostgresRelationshipRepository {
    async fn is_following(&self, origin: AccountId, target: AccountId) -> Result<bool, RepositoryError> {
        self.exists(
            "SELECT 1 FROM follows WHERE account_id = $1 AND target_account_id = $2",
            origin,
            target,
        )
        .await
    }

    async fn is_mutual_following(&self, a: AccountId, b: AccountId) -> Result<bool, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS edges
            FROM follows
            WHERE (account_id = $1 AND target_account_id = $2)
               OR (account_id = $2 AND target_account_id = $1)
            "#,
        )
        .bind(a.0)
        .bind(b.0)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let edges: i64 = row.get("edges");
        Ok(a != b && edges == 2)
    }

    async fn is_follow_requested(&self, origin: AccountId, target: AccountId) -> Result<bool, RepositoryError> {
        self.exists(
            "SELECT 1 FROM follow_requests WHERE account_id = $1 AND target_account_id = $2",
            origin,
            target,
        )
        .await
    }

    async fn is_blocked(&self, a: AccountId, b: AccountId, either_direction: bool) -> Result<bool, RepositoryError> {
        let sql = if either_direction {
            r#"
            SELECT 1 FROM blocks
            WHERE (account_id = $1 AND target_account_id = $2)
               OR (account_id = $2 AND target_account_id = $1)
            LIMIT 1
            "#
        } else {
            "SELECT 1 FROM blocks WHERE account_id = $1 AND target_account_id = $2"
        };
        self.exists(sql, a, b).await
    }

    async fn is_muted(&self, origin: AccountId, target: AccountId) -> Result<bool, RepositoryError> {
        self.exists(
            "SELECT 1 FROM mutes WHERE account_id = $1 AND target_account_id = $2",
            origin,
            target,
        )
        .await
    }

    async fn get_follow(&self, origin: AccountId, target: AccountId) -> Result<Follow, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, uri, account_id, target_account_id, show_reblogs, notify, created_at
            FROM follows
            WHERE account_id = $1 AND target_account_id = $2
            "#,
        )
        .bind(origin.0)
        .bind(target.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.map(parse_follow_row)
            .ok_or_else(|| not_found("Follow", origin, target))
    }

    async fn get_follow_request(&self, origin: AccountId, target: AccountId) -> Result<FollowRequest, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, uri, account_id, target_account_id, show_reblogs, notify, created_at
            FROM follow_requests
            WHERE account_id = $1 AND target_account_id = $2
            "#,
        )
        .bind(origin.0)
        .bind(target.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.map(parse_follow_request_row)
            .ok_or_else(|| not_found("Follow request", origin, target))
    }

    async fn get_block(&self, origin: AccountId, target: AccountId) -> Result<Block, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, uri, account_id, target_account_id, created_at
            FROM blocks
            WHERE account_id = $1 AND target_account_id = $2
            "#,
        )
        .bind(origin.0)
        .bind(target.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.map(parse_block_row)
            .ok_or_else(|| not_found("Block", origin, target))
    }

    async fn get_relationship(&self, requesting: AccountId, target: AccountId) -> Result<Relationship, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT
                f.show_reblogs AS follow_show_reblogs,
                f.notify AS follow_notify,
                EXISTS (SELECT 1 FROM follows WHERE account_id = $2 AND target_account_id = $1) AS followed_by,
                EXISTS (SELECT 1 FROM blocks WHERE account_id = $1 AND target_account_id = $2) AS blocking,
                EXISTS (SELECT 1 FROM blocks WHERE account_id = $2 AND target_account_id = $1) AS blocked_by,
                m.notifications AS mute_notifications,
                EXISTS (SELECT 1 FROM follow_requests WHERE account_id = $1 AND target_account_id = $2) AS requested,
                EXISTS (SELECT 1 FROM follow_requests WHERE account_id = $2 AND target_account_id = $1) AS requested_by
            FROM (SELECT 1) AS anchor
            LEFT JOIN follows f ON f.account_id = $1 AND f.target_account_id = $2
            LEFT JOIN mutes m ON m.account_id = $1 AND m.target_account_id = $2
            "#,
        )
        .bind(requesting.0)
        .bind(target.0)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let show_reblogs: Option<bool> = row.get("follow_show_reblogs");
        let notify: Option<bool> = row.get("follow_notify");
        let mute_notifications: Option<bool> = row.get("mute_notifications");

        Ok(Relationship {
            id: target,
            following: show_reblogs.is_some(),
            showing_reblogs: show_reblogs.unwrap_or(false),
            notifying: notify.unwrap_or(false),
            followed_by: row.get("followed_by"),
            blocking: row.get("blocking"),
            blocked_by: row.get("blocked_by"),
            muting: mute_notifications.is_some(),
            muting_notifications: mute_notifications.unwrap_or(false),
            requested: row.get("requested"),
            requested_by: row.get("requested_by"),
            note: String::new(),
        })
    }

    async fn put_follow(&self, follow: &Follow) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_pair(&mut *tx, follow.account_id, follow.target_account_id).await?;
        refuse_if_blocked(&mut *tx, follow.account_id, follow.target_account_id).await?;

        sqlx::query(
            r#"
            INSERT INTO follows (id, uri, account_id, target_account_id, show_reblogs, notify, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(follow.id)
        .bind(&follow.uri)
        .bind(follow.account_id.0)
        .bind(follow.target_account_id.0)
        .bind(follow.show_reblogs)
        .bind(follow.notify)
        .bind(follow.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, "Follow", follow.account_id, follow.target_account_id))?;

        // A follow supersedes any pending request for the same pair
        sqlx::query("DELETE FROM follow_requests WHERE account_id = $1 AND target_account_id = $2")
            .bind(follow.account_id.0)
            .bind(follow.target_account_id.0)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn put_follow_request(&self, request: &FollowRequest) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_pair(&mut *tx, request.account_id, request.target_account_id).await?;
        refuse_if_blocked(&mut *tx, request.account_id, request.target_account_id).await?;

        let followed = sqlx::query("SELECT 1 FROM follows WHERE account_id = $1 AND target_account_id = $2")
            .bind(request.account_id.0)
            .bind(request.target_account_id.0)
            .fetch_optional(&mut *tx)
            .await?;
        if followed.is_some() {
            return Err(RepositoryError::AlreadyExists(format!(
                "Follow from {} to {}",
                request.account_id, request.target_account_id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO follow_requests (id, uri, account_id, target_account_id, show_reblogs, notify, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(request.id)
        .bind(&request.uri)
        .bind(request.account_id.0)
        .bind(request.target_account_id.0)
        .bind(request.show_reblogs)
        .bind(request.notify)
        .bind(request.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, "Follow request", request.account_id, request.target_account_id))?;

        tx.commit().await?;
        Ok(())
    }

    async fn put_block(&self, block: &Block) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO blocks (id, uri, account_id, target_account_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(block.id)
        .bind(&block.uri)
        .bind(block.account_id.0)
        .bind(block.target_account_id.0)
        .bind(block.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "Block", block.account_id, block.target_account_id))?;

        Ok(())
    }

    async fn block_and_sever(&self, block: &Block) -> Result<(), RepositoryError> {
        let (origin, target) = (block.account_id, block.target_account_id);
        let mut tx = self.pool.begin().await?;
        lock_pair(&mut *tx, origin, target).await?;

        sqlx::query(
            r#"
            INSERT INTO blocks (id, uri, account_id, target_account_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(block.id)
        .bind(&block.uri)
        .bind(origin.0)
        .bind(target.0)
        .bind(block.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, "Block", origin, target))?;

        for table in ["follows", "follow_requests"] {
            let sql = format!(
                r#"
                DELETE FROM {}
                WHERE (account_id = $1 AND target_account_id = $2)
                   OR (account_id = $2 AND target_account_id = $1)
                "#,
                table
            );
            sqlx::query(&sql)
                .bind(origin.0)
                .bind(target.0)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn put_mute(&self, mute: &Mute) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO mutes (id, account_id, target_account_id, notifications, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (account_id, target_account_id) DO UPDATE SET
                notifications = EXCLUDED.notifications
            "#,
        )
        .bind(mute.id)
        .bind(mute.account_id.0)
        .bind(mute.target_account_id.0)
        .bind(mute.notifications)
        .bind(mute.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save mute: {}", e)))?;

        Ok(())
    }

    async fn accept_follow_request(&self, origin: AccountId, target: AccountId) -> Result<Follow, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_pair(&mut *tx, origin, target).await?;

        let request_row = sqlx::query(
            r#"
            DELETE FROM follow_requests
            WHERE account_id = $1 AND target_account_id = $2
            RETURNING id, uri, account_id, target_account_id, show_reblogs, notify, created_at
            "#,
        )
        .bind(origin.0)
        .bind(target.0)
        .fetch_optional(&mut *tx)
        .await?;

        let request = request_row
            .map(parse_follow_request_row)
            .ok_or_else(|| not_found("Follow request", origin, target))?;

        // An existing follow is kept and takes over the request URI
        let candidate = request.into_follow();
        let row = sqlx::query(
            r#"
            INSERT INTO follows (id, uri, account_id, target_account_id, show_reblogs, notify, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (account_id, target_account_id) DO UPDATE SET
                uri = EXCLUDED.uri
            RETURNING id, uri, account_id, target_account_id, show_reblogs, notify, created_at
            "#,
        )
        .bind(candidate.id)
        .bind(&candidate.uri)
        .bind(candidate.account_id.0)
        .bind(candidate.target_account_id.0)
        .bind(candidate.show_reblogs)
        .bind(candidate.notify)
        .bind(candidate.created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(parse_follow_row(row))
    }

    async fn reject_follow_request(&self, origin: AccountId, target: AccountId) -> Result<FollowRequest, RepositoryError> {
        let row = sqlx::query(
            r#"
            DELETE FROM follow_requests
            WHERE account_id = $1 AND target_account_id = $2
            RETURNING id, uri, account_id, target_account_id, show_reblogs, notify, created_at
            "#,
        )
        .bind(origin.0)
        .bind(target.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(parse_follow_request_row)
            .ok_or_else(|| not_found("Follow request", origin, target))
    }

    async fn unfollow(&self, origin: AccountId, target: AccountId) -> Result<Option<String>, RepositoryError> {
        let row = sqlx::query(
            "DELETE FROM follows WHERE account_id = $1 AND target_account_id = $2 RETURNING uri",
        )
        .bind(origin.0)
        .bind(target.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get("uri")))
    }

    async fn unfollow_request(&self, origin: AccountId, target: AccountId) -> Result<Option<String>, RepositoryError> {
        let row = sqlx::query(
            "DELETE FROM follow_requests WHERE account_id = $1 AND target_account_id = $2 RETURNING uri",
        )
        .bind(origin.0)
        .bind(target.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get("uri")))
    }

    async fn delete_block_by_id(&self, id: Uuid) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM blocks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_block_by_uri(&self, uri: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM blocks WHERE uri = $1")
            .bind(uri)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_blocks_by_origin_account(&self, origin: AccountId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM blocks WHERE account_id = $1")
            .bind(origin.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_blocks_by_target_account(&self, target: AccountId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM blocks WHERE target_account_id = $1")
            .bind(target.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_mute(&self, origin: AccountId, target: AccountId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM mutes WHERE account_id = $1 AND target_account_id = $2")
            .bind(origin.0)
            .bind(target.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_follows(&self, origin: Option<AccountId>, target: Option<AccountId>) -> Result<Vec<Follow>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, uri, account_id, target_account_id, show_reblogs, notify, created_at
            FROM follows
            WHERE ($1::uuid IS NULL OR account_id = $1)
              AND ($2::uuid IS NULL OR target_account_id = $2)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(origin.map(|id| id.0))
        .bind(target.map(|id| id.0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(parse_follow_row).collect())
    }

    async fn count_follows(&self, origin: Option<AccountId>, target: Option<AccountId>) -> Result<usize, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total
            FROM follows
            WHERE ($1::uuid IS NULL OR account_id = $1)
              AND ($2::uuid IS NULL OR target_account_id = $2)
            "#,
        )
        .bind(origin.map(|id| id.0))
        .bind(target.map(|id| id.0))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        let total: i64 = row.get("total");
        Ok(total.max(0) as usize)
    }

    async fn get_follow_requests(
        &self,
        origin: Option<AccountId>,
        target: Option<AccountId>,
    ) -> Result<Vec<FollowRequest>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, uri, account_id, target_account_id, show_reblogs, notify, created_at
            FROM follow_requests
            WHERE ($1::uuid IS NULL OR account_id = $1)
              AND ($2::uuid IS NULL OR target_account_id = $2)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(origin.map(|id| id.0))
        .bind(target.map(|id| id.0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(parse_follow_request_row).collect())
    }
}

/// Serialize writers on the unordered pair until the transaction ends.
async fn lock_pair(conn: &mut PgConnection, a: AccountId, b: AccountId) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"
        SELECT pg_advisory_xact_lock(
            hashtextextended(LEAST($1::uuid::text, $2::uuid::text) || GREATEST($1::uuid::text, $2::uuid::text), 0)
        )
        "#,
    )
    .bind(a.0)
    .bind(b.0)
    .execute(conn)
    .await?;
    Ok(())
}

async fn refuse_if_blocked(conn: &mut PgConnection, a: AccountId, b: AccountId) -> Result<(), RepositoryError> {
    let blocked = sqlx::query(
        r#"
        SELECT 1 FROM blocks
        WHERE (account_id = $1 AND target_account_id = $2)
           OR (account_id = $2 AND target_account_id = $1)
        LIMIT 1
        "#,
    )
    .bind(a.0)
    .bind(b.0)
    .fetch_optional(conn)
    .await?;
    if blocked.is_some() {
        return Err(RepositoryError::Blocked(format!("between {} and {}", a, b)));
    }
    Ok(())
}

fn not_found(kind: &str, origin: AccountId, target: AccountId) -> RepositoryError {
    RepositoryError::NotFound(format!("{} from {} to {} not found", kind, origin, target))
}

fn map_insert_error(err: sqlx::Error, kind: &str, origin: AccountId, target: AccountId) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return RepositoryError::AlreadyExists(format!("{} from {} to {}", kind, origin, target));
        }
    }
    RepositoryError::Database(format!("Failed to save {}: {}", kind.to_lowercase(), err))
}

fn parse_follow_row(row: PgRow) -> Follow {
    let account_id: Uuid = row.get("account_id");
    let target_account_id: Uuid = row.get("target_account_id");
    let created_at: DateTime<Utc> = row.get("created_at");
    Follow {
        id: row.get("id"),
        uri: row.get("uri"),
        account_id: AccountId(account_id),
        target_account_id: AccountId(target_account_id),
        show_reblogs: row.get("show_reblogs"),
        notify: row.get("notify"),
        created_at,
    }
}

fn parse_follow_request_row(row: PgRow) -> FollowRequest {
    let account_id: Uuid = row.get("account_id");
    let target_account_id: Uuid = row.get("target_account_id");
    let created_at: DateTime<Utc> = row.get("created_at");
    FollowRequest {
        id: row.get("id"),
        uri: row.get("uri"),
        account_id: AccountId(account_id),
        target_account_id: AccountId(target_account_id),
        show_reblogs: row.get("show_reblogs"),
        notify: row.get("notify"),
        created_at,
    }
}

fn parse_block_row(row: PgRow) -> Block {
    let account_id: Uuid = row.get("account_id");
    let target_account_id: Uuid = row.get("target_account_id");
    let created_at: DateTime<Utc> = row.get("created_at");
    Block {
        id: row.get("id"),
        uri: row.get("uri"),
        account_id: AccountId(account_id),
        target_account_id: AccountId(target_account_id),
        created_at,
    }
}
