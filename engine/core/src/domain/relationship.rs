// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

//! Directed edges of the social graph.
//!
//! Every edge is keyed on an ordered `(account_id, target_account_id)` pair.
//! A pair carries at most one [`Follow`], and never a [`Follow`] and a
//! [`FollowRequest`] at the same time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::account::AccountId;

/// Ordered `(origin, target)` key for a directed edge.
pub type AccountPair = (AccountId, AccountId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    pub id: Uuid,
    pub uri: String,
    pub account_id: AccountId,
    pub target_account_id: AccountId,
    /// Show announces by the target in the origin's home timeline.
    #[serde(default = "default_true")]
    pub show_reblogs: bool,
    /// Notify the origin when the target posts.
    #[serde(default)]
    pub notify: bool,
    pub created_at: DateTime<Utc>,
}

impl Follow {
    pub fn new(uri: impl Into<String>, account_id: AccountId, target_account_id: AccountId) -> Self {
        Self {
            id: Uuid::new_v4(),
            uri: uri.into(),
            account_id,
            target_account_id,
            show_reblogs: true,
            notify: false,
            created_at: Utc::now(),
        }
    }

    pub fn pair(&self) -> AccountPair {
        (self.account_id, self.target_account_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowRequest {
    pub id: Uuid,
    pub uri: String,
    pub account_id: AccountId,
    pub target_account_id: AccountId,
    #[serde(default = "default_true")]
    pub show_reblogs: bool,
    #[serde(default)]
    pub notify: bool,
    pub created_at: DateTime<Utc>,
}

impl FollowRequest {
    pub fn new(uri: impl Into<String>, account_id: AccountId, target_account_id: AccountId) -> Self {
        Self {
            id: Uuid::new_v4(),
            uri: uri.into(),
            account_id,
            target_account_id,
            show_reblogs: true,
            notify: false,
            created_at: Utc::now(),
        }
    }

    pub fn pair(&self) -> AccountPair {
        (self.account_id, self.target_account_id)
    }

    /// The follow created when this request is accepted. It keeps the
    /// request's URI and preferences.
    pub fn into_follow(self) -> Follow {
        Follow {
            id: Uuid::new_v4(),
            uri: self.uri,
            account_id: self.account_id,
            target_account_id: self.target_account_id,
            show_reblogs: self.show_reblogs,
            notify: self.notify,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: Uuid,
    pub uri: String,
    pub account_id: AccountId,
    pub target_account_id: AccountId,
    pub created_at: DateTime<Utc>,
}

impl Block {
    pub fn new(uri: impl Into<String>, account_id: AccountId, target_account_id: AccountId) -> Self {
        Self {
            id: Uuid::new_v4(),
            uri: uri.into(),
            account_id,
            target_account_id,
            created_at: Utc::now(),
        }
    }

    pub fn pair(&self) -> AccountPair {
        (self.account_id, self.target_account_id)
    }
}

/// Local-only edge; mutes never federate and never affect policy decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mute {
    pub id: Uuid,
    pub account_id: AccountId,
    pub target_account_id: AccountId,
    /// Also hide notifications from the target.
    #[serde(default)]
    pub notifications: bool,
    pub created_at: DateTime<Utc>,
}

impl Mute {
    pub fn new(account_id: AccountId, target_account_id: AccountId, notifications: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            target_account_id,
            notifications,
            created_at: Utc::now(),
        }
    }

    pub fn pair(&self) -> AccountPair {
        (self.account_id, self.target_account_id)
    }
}

/// How one account relates to another, from the requesting account's side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: AccountId,
    pub following: bool,
    pub showing_reblogs: bool,
    pub notifying: bool,
    pub followed_by: bool,
    pub blocking: bool,
    pub blocked_by: bool,
    pub muting: bool,
    pub muting_notifications: bool,
    pub requested: bool,
    pub requested_by: bool,
    #[serde(default)]
    pub note: String,
}

impl Relationship {
    pub fn is_mutual(&self) -> bool {
        self.following && self.followed_by
    }

    pub fn is_blocked_either_direction(&self) -> bool {
        self.blocking || self.blocked_by
    }
}

fn default_true() -> bool {
    true
}
