// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

//! Policy Value Resolver
//!
//! Turns a [`PolicyValue`] into a membership test for one status and one
//! requester.
//!
//! # DDD Pattern: Domain Service (hosted in the application layer)
//!
//! - **Layer:** Application
//! - **Responsibility:** Decide whether a requester belongs to the audience
//!   a policy value names
//! - **Collaborators:**
//!   - Domain: Status, Account, PolicyValue
//!   - Infrastructure: RelationshipRepository (follow lookups only)
//!
//! Values that can be answered from the status and the requester alone
//! (`Public`, `Author`, `Mentioned`, `Mutuals`, literal URIs) never touch
//! the relationship graph. Only `Followers` and `Following` do.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::domain::account::{Account, AccountId};
use crate::domain::policy::PolicyValue;
use crate::domain::repository::{RelationshipRepository, RepositoryError};
use crate::domain::status::Status;

/// The actor asking to interact with a status.
#[derive(Debug, Clone, Default)]
pub struct Requester {
    account: Option<Account>,
    /// Remote collection URIs the federation layer has already verified
    /// this requester to be a member of.
    verified_collections: HashSet<String>,
}

impl Requester {
    /// An unauthenticated requester. Only matches `Public`.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_account(account: Account) -> Self {
        Self {
            account: Some(account),
            verified_collections: HashSet::new(),
        }
    }

    pub fn with_verified_collection(mut self, uri: impl Into<String>) -> Self {
        self.verified_collections.insert(uri.into());
        self
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    pub fn id(&self) -> Option<AccountId> {
        self.account.as_ref().map(|a| a.id)
    }

    pub fn is_anonymous(&self) -> bool {
        self.account.is_none()
    }

    pub fn is_verified_member(&self, collection_uri: &str) -> bool {
        self.verified_collections.contains(collection_uri)
    }
}

#[derive(Clone)]
pub struct PolicyValueResolver {
    relationships: Arc<dyn RelationshipRepository>,
}

impl PolicyValueResolver {
    pub fn new(relationships: Arc<dyn RelationshipRepository>) -> Self {
        Self { relationships }
    }

    /// Answer without any graph query, or `None` when the value needs one.
    pub fn matches_without_lookup(&self, value: &PolicyValue, status: &Status, requester: &Requester) -> Option<bool> {
        match value {
            PolicyValue::Public => Some(true),
            _ if requester.is_anonymous() => Some(false),
            PolicyValue::Author => Some(requester.id().is_some_and(|id| status.is_author(id))),
            PolicyValue::Mentioned => Some(requester.id().is_some_and(|id| status.mentions(id))),
            PolicyValue::Mutuals => Some(false),
            PolicyValue::Uri(uri) => Some(
                requester.account().is_some_and(|a| a.uri == *uri) || requester.is_verified_member(uri),
            ),
            PolicyValue::Followers | PolicyValue::Following => None,
        }
    }

    /// Whether `requester` is in the audience `value` names for `status`.
    ///
    /// A relationship that does not exist is a plain `false`; other store
    /// failures are returned.
    pub async fn matches(&self, value: &PolicyValue, status: &Status, requester: &Requester) -> Result<bool, RepositoryError> {
        if let Some(answer) = self.matches_without_lookup(value, status, requester) {
            return Ok(answer);
        }

        let Some(requester_id) = requester.id() else {
            return Ok(false);
        };
        let author_id = status.account_id;

        let lookup = match value {
            // Requester follows the author
            PolicyValue::Followers => self.relationships.is_following(requester_id, author_id).await,
            // Author follows the requester
            PolicyValue::Following => self.relationships.is_following(author_id, requester_id).await,
            _ => Ok(false),
        };

        match lookup {
            Ok(found) => Ok(found),
            Err(err) if err.is_not_found() => {
                debug!(value = %value, requester = %requester_id, "Relationship not found, treating as no match");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::engine_config::InstanceConfig;
    use crate::domain::relationship::Follow;
    use crate::domain::visibility::Visibility;
    use crate::infrastructure::repositories::InMemoryRelationshipRepository;

    fn local(username: &str) -> Account {
        Account::new_local(username, &InstanceConfig::default()).unwrap()
    }

    fn setup() -> (Arc<InMemoryRelationshipRepository>, PolicyValueResolver) {
        let graph = Arc::new(InMemoryRelationshipRepository::new());
        let resolver = PolicyValueResolver::new(graph.clone());
        (graph, resolver)
    }

    #[tokio::test]
    async fn test_public_matches_anonymous() {
        let (_, resolver) = setup();
        let author = local("author");
        let status = Status::new(author.id, "http://localhost:8080/statuses/1", Visibility::Public);

        let anonymous = Requester::anonymous();
        assert!(resolver.matches(&PolicyValue::Public, &status, &anonymous).await.unwrap());
        for value in [
            PolicyValue::Author,
            PolicyValue::Mentioned,
            PolicyValue::Followers,
            PolicyValue::Following,
            PolicyValue::Uri(author.uri.clone()),
        ] {
            assert!(!resolver.matches(&value, &status, &anonymous).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_author_and_mentioned() {
        let (_, resolver) = setup();
        let author = local("author");
        let mentioned = local("mentioned");
        let stranger = local("stranger");
        let status = Status::new(author.id, "http://localhost:8080/statuses/1", Visibility::Direct)
            .with_mentions([mentioned.id]);

        let as_author = Requester::for_account(author);
        let as_mentioned = Requester::for_account(mentioned);
        let as_stranger = Requester::for_account(stranger);

        assert!(resolver.matches(&PolicyValue::Author, &status, &as_author).await.unwrap());
        assert!(!resolver.matches(&PolicyValue::Author, &status, &as_mentioned).await.unwrap());
        assert!(resolver.matches(&PolicyValue::Mentioned, &status, &as_mentioned).await.unwrap());
        assert!(!resolver.matches(&PolicyValue::Mentioned, &status, &as_stranger).await.unwrap());
    }

    #[tokio::test]
    async fn test_followers_and_following_directions() {
        let (graph, resolver) = setup();
        let author = local("author");
        let fan = local("fan");
        let status = Status::new(author.id, "http://localhost:8080/statuses/1", Visibility::FollowersOnly);

        graph
            .put_follow(&Follow::new("http://localhost:8080/users/fan/follow/1", fan.id, author.id))
            .await
            .unwrap();

        let as_fan = Requester::for_account(fan);
        assert!(resolver.matches(&PolicyValue::Followers, &status, &as_fan).await.unwrap());
        assert!(!resolver.matches(&PolicyValue::Following, &status, &as_fan).await.unwrap());
    }

    #[tokio::test]
    async fn test_mutuals_never_matches() {
        let (graph, resolver) = setup();
        let author = local("author");
        let friend = local("friend");
        graph.put_follow(&Follow::new("http://localhost:8080/f/1", friend.id, author.id)).await.unwrap();
        graph.put_follow(&Follow::new("http://localhost:8080/f/2", author.id, friend.id)).await.unwrap();

        let status = Status::new(author.id, "http://localhost:8080/statuses/1", Visibility::MutualsOnly);
        let requester = Requester::for_account(friend);
        assert_eq!(resolver.matches_without_lookup(&PolicyValue::Mutuals, &status, &requester), Some(false));
        assert!(!resolver.matches(&PolicyValue::Mutuals, &status, &requester).await.unwrap());
    }

    #[tokio::test]
    async fn test_literal_uri_by_actor_or_verified_collection() {
        let (_, resolver) = setup();
        let author = local("author");
        let remote = Account::new_remote(
            "someone",
            "remote.example",
            "https://remote.example/users/someone",
            "https://remote.example/users/someone/followers",
            "https://remote.example/users/someone/following",
        )
        .unwrap();
        let status = Status::new(author.id, "http://localhost:8080/statuses/1", Visibility::Public);

        let actor_literal = PolicyValue::Uri("https://remote.example/users/someone".to_string());
        let collection_literal = PolicyValue::Uri("https://remote.example/groups/knitting/members".to_string());

        let plain = Requester::for_account(remote.clone());
        assert!(resolver.matches(&actor_literal, &status, &plain).await.unwrap());
        assert!(!resolver.matches(&collection_literal, &status, &plain).await.unwrap());

        let verified = Requester::for_account(remote)
            .with_verified_collection("https://remote.example/groups/knitting/members");
        assert!(resolver.matches(&collection_literal, &status, &verified).await.unwrap());
    }

    #[test]
    fn test_graph_values_need_lookup() {
        let graph = Arc::new(InMemoryRelationshipRepository::new());
        let resolver = PolicyValueResolver::new(graph);
        let author = local("author");
        let status = Status::new(author.id, "http://localhost:8080/statuses/1", Visibility::Public);
        let requester = Requester::for_account(local("someone"));

        assert_eq!(resolver.matches_without_lookup(&PolicyValue::Followers, &status, &requester), None);
        assert_eq!(resolver.matches_without_lookup(&PolicyValue::Following, &status, &requester), None);
        assert_eq!(resolver.matches_without_lookup(&PolicyValue::Public, &status, &requester), Some(true));
    }
}
