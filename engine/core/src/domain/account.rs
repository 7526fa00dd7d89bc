// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

//! Actors known to the engine.
//!
//! Local accounts derive their actor and collection URIs from the instance
//! configuration. Remote accounts carry whatever URIs their home server
//! published, which are not required to follow any particular layout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::domain::engine_config::InstanceConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid actor URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    /// Home domain for remote accounts, `None` for local ones.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Canonical ActivityPub actor URI.
    pub uri: String,
    pub followers_uri: String,
    pub following_uri: String,
    /// Locked accounts review follow requests manually.
    #[serde(default)]
    pub locked: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Build a local account with URIs laid out under `/users/{username}`.
    pub fn new_local(username: &str, instance: &InstanceConfig) -> Result<Self, AccountError> {
        validate_username(username)?;

        let base = format!("{}://{}/", instance.protocol, instance.host);
        let base = Url::parse(&base).map_err(|e| AccountError::InvalidUri {
            uri: base.clone(),
            reason: e.to_string(),
        })?;
        let actor = join(&base, &format!("users/{}", username))?;
        let followers = join(&base, &format!("users/{}/followers", username))?;
        let following = join(&base, &format!("users/{}/following", username))?;

        Ok(Self {
            id: AccountId::new(),
            username: username.to_string(),
            domain: None,
            uri: actor,
            followers_uri: followers,
            following_uri: following,
            locked: false,
            created_at: Utc::now(),
        })
    }

    /// Build a remote account from the URIs its home server published.
    pub fn new_remote(
        username: &str,
        domain: &str,
        uri: &str,
        followers_uri: &str,
        following_uri: &str,
    ) -> Result<Self, AccountError> {
        validate_username(username)?;
        for candidate in [uri, followers_uri, following_uri] {
            Url::parse(candidate).map_err(|e| AccountError::InvalidUri {
                uri: candidate.to_string(),
                reason: e.to_string(),
            })?;
        }

        Ok(Self {
            id: AccountId::new(),
            username: username.to_string(),
            domain: Some(domain.to_string()),
            uri: uri.to_string(),
            followers_uri: followers_uri.to_string(),
            following_uri: following_uri.to_string(),
            locked: false,
            created_at: Utc::now(),
        })
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn is_local(&self) -> bool {
        self.domain.is_none()
    }

    /// `@username` for local accounts, `@username@domain` for remote ones.
    pub fn acct(&self) -> String {
        match &self.domain {
            Some(domain) => format!("@{}@{}", self.username, domain),
            None => format!("@{}", self.username),
        }
    }
}

fn validate_username(username: &str) -> Result<(), AccountError> {
    let valid = !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(AccountError::InvalidUsername(username.to_string()))
    }
}

fn join(base: &Url, path: &str) -> Result<String, AccountError> {
    base.join(path)
        .map(|u| u.to_string())
        .map_err(|e| AccountError::InvalidUri {
            uri: format!("{}{}", base, path),
            reason: e.to_string(),
        })
}
