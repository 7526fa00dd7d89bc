// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

//! Domain events published by the engine.
//!
//! Moderation, notification and federation delivery subscribe to these;
//! none of them feed back into policy decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::account::AccountId;
use crate::domain::policy::{InteractionKind, PolicyResult};
use crate::domain::status::StatusId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InteractionEvent {
    InteractionEvaluated {
        status_id: StatusId,
        /// `None` for anonymous requesters.
        requester_id: Option<AccountId>,
        kind: InteractionKind,
        result: PolicyResult,
        evaluated_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RelationshipEvent {
    Followed {
        account_id: AccountId,
        target_account_id: AccountId,
        uri: String,
        followed_at: DateTime<Utc>,
    },
    FollowRequested {
        account_id: AccountId,
        target_account_id: AccountId,
        uri: String,
        requested_at: DateTime<Utc>,
    },
    FollowRequestAccepted {
        account_id: AccountId,
        target_account_id: AccountId,
        uri: String,
        accepted_at: DateTime<Utc>,
    },
    FollowRequestRejected {
        account_id: AccountId,
        target_account_id: AccountId,
        uri: String,
        rejected_at: DateTime<Utc>,
    },
    Unfollowed {
        account_id: AccountId,
        target_account_id: AccountId,
        uri: String,
        unfollowed_at: DateTime<Utc>,
    },
    Blocked {
        account_id: AccountId,
        target_account_id: AccountId,
        uri: String,
        blocked_at: DateTime<Utc>,
    },
    Unblocked {
        account_id: AccountId,
        target_account_id: AccountId,
        uri: String,
        unblocked_at: DateTime<Utc>,
    },
    Muted {
        account_id: AccountId,
        target_account_id: AccountId,
        muted_at: DateTime<Utc>,
    },
    Unmuted {
        account_id: AccountId,
        target_account_id: AccountId,
        unmuted_at: DateTime<Utc>,
    },
}

impl RelationshipEvent {
    /// `(origin, target)` pair the event concerns.
    pub fn pair(&self) -> (AccountId, AccountId) {
        match self {
            RelationshipEvent::Followed { account_id, target_account_id, .. }
            | RelationshipEvent::FollowRequested { account_id, target_account_id, .. }
            | RelationshipEvent::FollowRequestAccepted { account_id, target_account_id, .. }
            | RelationshipEvent::FollowRequestRejected { account_id, target_account_id, .. }
            | RelationshipEvent::Unfollowed { account_id, target_account_id, .. }
            | RelationshipEvent::Blocked { account_id, target_account_id, .. }
            | RelationshipEvent::Unblocked { account_id, target_account_id, .. }
            | RelationshipEvent::Muted { account_id, target_account_id, .. }
            | RelationshipEvent::Unmuted { account_id, target_account_id, .. } => {
                (*account_id, *target_account_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_event_serialization() {
        let status_id = StatusId::new();
        let event = InteractionEvent::InteractionEvaluated {
            status_id,
            requester_id: None,
            kind: InteractionKind::Reply,
            result: PolicyResult::WithApproval,
            evaluated_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("InteractionEvaluated"));
        assert!(json.contains("with_approval"));

        let deserialized: InteractionEvent = serde_json::from_str(&json).unwrap();
        let InteractionEvent::InteractionEvaluated { status_id: id, result, .. } = deserialized;
        assert_eq!(id, status_id);
        assert_eq!(result, PolicyResult::WithApproval);
    }

    #[test]
    fn test_relationship_event_pair() {
        let origin = AccountId::new();
        let target = AccountId::new();
        let event = RelationshipEvent::Blocked {
            account_id: origin,
            target_account_id: target,
            uri: "https://example.org/users/a/block/1".to_string(),
            blocked_at: Utc::now(),
        };
        assert_eq!(event.pair(), (origin, target));
    }
}
