// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::account::AccountId;
use crate::domain::policy::InteractionPolicy;
use crate::domain::visibility::Visibility;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusId(pub Uuid);

impl StatusId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for StatusId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A federated post as seen by the policy engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub id: StatusId,
    pub uri: String,
    /// Author of the status.
    pub account_id: AccountId,
    pub visibility: Visibility,
    /// Resolved mentions, in the order they appear in the text.
    #[serde(default)]
    pub mentions: Vec<AccountId>,
    /// Explicit policy, `None` means the visibility default applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_policy: Option<InteractionPolicy>,
    pub created_at: DateTime<Utc>,
}

impl Status {
    pub fn new(account_id: AccountId, uri: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            id: StatusId::new(),
            uri: uri.into(),
            account_id,
            visibility,
            mentions: Vec::new(),
            interaction_policy: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_mentions(mut self, mentions: impl IntoIterator<Item = AccountId>) -> Self {
        for mention in mentions {
            if !self.mentions.contains(&mention) {
                self.mentions.push(mention);
            }
        }
        self
    }

    pub fn with_policy(mut self, policy: InteractionPolicy) -> Self {
        self.interaction_policy = Some(policy);
        self
    }

    pub fn is_author(&self, account_id: AccountId) -> bool {
        self.account_id == account_id
    }

    pub fn mentions(&self, account_id: AccountId) -> bool {
        self.mentions.contains(&account_id)
    }

    /// The attached policy, or the default for this status's visibility.
    pub fn effective_policy(&self) -> InteractionPolicy {
        match &self.interaction_policy {
            Some(policy) => policy.clone(),
            None => InteractionPolicy::default_for(self.visibility),
        }
    }
}
