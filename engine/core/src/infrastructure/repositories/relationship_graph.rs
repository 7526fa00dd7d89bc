// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0
//! In-Memory Relationship Graph
//!
//! Directed edges keyed on ordered `(origin, target)` pairs, with per-account
//! outgoing/incoming indexes so that follower and following listings do not
//! scan the whole graph.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** `RelationshipRepository` for development, tests and the CLI
//!
//! All mutations take the single graph write lock, which makes every
//! operation atomic per pair (and globally).

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::account::AccountId;
use crate::domain::relationship::{AccountPair, Block, Follow, FollowRequest, Mute, Relationship};
use crate::domain::repository::{RelationshipRepository, RepositoryError};

/// Adjacency index for one edge type.
#[derive(Debug, Default)]
struct EdgeIndex {
    outgoing: HashMap<AccountId, BTreeSet<AccountId>>,
    incoming: HashMap<AccountId, BTreeSet<AccountId>>,
}

impl EdgeIndex {
    fn insert(&mut self, (origin, target): AccountPair) {
        self.outgoing.entry(origin).or_default().insert(target);
        self.incoming.entry(target).or_default().insert(origin);
    }

    fn remove(&mut self, (origin, target): AccountPair) {
        if let Some(targets) = self.outgoing.get_mut(&origin) {
            targets.remove(&target);
            if targets.is_empty() {
                self.outgoing.remove(&origin);
            }
        }
        if let Some(origins) = self.incoming.get_mut(&target) {
            origins.remove(&origin);
            if origins.is_empty() {
                self.incoming.remove(&target);
            }
        }
    }

    /// Pairs matching the filter. `None` on a side leaves it open.
    fn pairs(&self, origin: Option<AccountId>, target: Option<AccountId>) -> Vec<AccountPair> {
        match (origin, target) {
            (Some(origin), Some(target)) => self
                .outgoing
                .get(&origin)
                .filter(|targets| targets.contains(&target))
                .map(|_| vec![(origin, target)])
                .unwrap_or_default(),
            (Some(origin), None) => self
                .outgoing
                .get(&origin)
                .map(|targets| targets.iter().map(|t| (origin, *t)).collect())
                .unwrap_or_default(),
            (None, Some(target)) => self
                .incoming
                .get(&target)
                .map(|origins| origins.iter().map(|o| (*o, target)).collect())
                .unwrap_or_default(),
            (None, None) => self
                .outgoing
                .iter()
                .flat_map(|(origin, targets)| targets.iter().map(move |t| (*origin, *t)))
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
struct RelationshipGraph {
    follows: HashMap<AccountPair, Follow>,
    follow_index: EdgeIndex,
    follow_requests: HashMap<AccountPair, FollowRequest>,
    request_index: EdgeIndex,
    blocks: HashMap<AccountPair, Block>,
    mutes: HashMap<AccountPair, Mute>,
}

impl RelationshipGraph {
    fn insert_follow(&mut self, follow: Follow) {
        let pair = follow.pair();
        self.follow_index.insert(pair);
        self.follows.insert(pair, follow);
    }

    fn remove_follow(&mut self, pair: AccountPair) -> Option<Follow> {
        let removed = self.follows.remove(&pair);
        if removed.is_some() {
            self.follow_index.remove(pair);
        }
        removed
    }

    fn insert_request(&mut self, request: FollowRequest) {
        let pair = request.pair();
        self.request_index.insert(pair);
        self.follow_requests.insert(pair, request);
    }

    fn remove_request(&mut self, pair: AccountPair) -> Option<FollowRequest> {
        let removed = self.follow_requests.remove(&pair);
        if removed.is_some() {
            self.request_index.remove(pair);
        }
        removed
    }

    fn refuse_if_blocked(&self, (origin, target): AccountPair) -> Result<(), RepositoryError> {
        if self.blocks.contains_key(&(origin, target)) || self.blocks.contains_key(&(target, origin)) {
            return Err(RepositoryError::Blocked(format!("between {} and {}", origin, target)));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryRelationshipRepository {
    graph: Arc<RwLock<RelationshipGraph>>,
}

impl InMemoryRelationshipRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(kind: &str, (origin, target): AccountPair) -> RepositoryError {
    RepositoryError::NotFound(format!("{} from {} to {} not found", kind, origin, target))
}

fn by_creation<T>(mut items: Vec<T>, key: impl Fn(&T) -> (chrono::DateTime<chrono::Utc>, Uuid)) -> Vec<T> {
    items.sort_by_key(|item| key(item));
    items
}

#[async_trait]
impl RelationshipRepository for InMemoryRelationshipRepository {
    async fn is_following(&self, origin: AccountId, target: AccountId) -> Result<bool, RepositoryError> {
        Ok(self.graph.read().follows.contains_key(&(origin, target)))
    }

    async fn is_mutual_following(&self, a: AccountId, b: AccountId) -> Result<bool, RepositoryError> {
        let graph = self.graph.read();
        Ok(graph.follows.contains_key(&(a, b)) && graph.follows.contains_key(&(b, a)))
    }

    async fn is_follow_requested(&self, origin: AccountId, target: AccountId) -> Result<bool, RepositoryError> {
        Ok(self.graph.read().follow_requests.contains_key(&(origin, target)))
    }

    async fn is_blocked(&self, a: AccountId, b: AccountId, either_direction: bool) -> Result<bool, RepositoryError> {
        let graph = self.graph.read();
        if graph.blocks.contains_key(&(a, b)) {
            return Ok(true);
        }
        Ok(either_direction && graph.blocks.contains_key(&(b, a)))
    }

    async fn is_muted(&self, origin: AccountId, target: AccountId) -> Result<bool, RepositoryError> {
        Ok(self.graph.read().mutes.contains_key(&(origin, target)))
    }

    async fn get_follow(&self, origin: AccountId, target: AccountId) -> Result<Follow, RepositoryError> {
        self.graph
            .read()
            .follows
            .get(&(origin, target))
            .cloned()
            .ok_or_else(|| not_found("Follow", (origin, target)))
    }

    async fn get_follow_request(&self, origin: AccountId, target: AccountId) -> Result<FollowRequest, RepositoryError> {
        self.graph
            .read()
            .follow_requests
            .get(&(origin, target))
            .cloned()
            .ok_or_else(|| not_found("Follow request", (origin, target)))
    }

    async fn get_block(&self, origin: AccountId, target: AccountId) -> Result<Block, RepositoryError> {
        self.graph
            .read()
            .blocks
            .get(&(origin, target))
            .cloned()
            .ok_or_else(|| not_found("Block", (origin, target)))
    }

    async fn get_relationship(&self, requesting: AccountId, target: AccountId) -> Result<Relationship, RepositoryError> {
        let graph = self.graph.read();
        let forward = (requesting, target);
        let backward = (target, requesting);

        let follow = graph.follows.get(&forward);
        let mute = graph.mutes.get(&forward);

        Ok(Relationship {
            id: target,
            following: follow.is_some(),
            showing_reblogs: follow.map(|f| f.show_reblogs).unwrap_or(false),
            notifying: follow.map(|f| f.notify).unwrap_or(false),
            followed_by: graph.follows.contains_key(&backward),
            blocking: graph.blocks.contains_key(&forward),
            blocked_by: graph.blocks.contains_key(&backward),
            muting: mute.is_some(),
            muting_notifications: mute.map(|m| m.notifications).unwrap_or(false),
            requested: graph.follow_requests.contains_key(&forward),
            requested_by: graph.follow_requests.contains_key(&backward),
            note: String::new(),
        })
    }

    async fn put_follow(&self, follow: &Follow) -> Result<(), RepositoryError> {
        let mut graph = self.graph.write();
        let pair = follow.pair();
        graph.refuse_if_blocked(pair)?;
        if graph.follows.contains_key(&pair) {
            return Err(RepositoryError::AlreadyExists(format!(
                "Follow from {} to {}",
                pair.0, pair.1
            )));
        }
        // A follow supersedes any pending request for the same pair
        graph.remove_request(pair);
        graph.insert_follow(follow.clone());
        Ok(())
    }

    async fn put_follow_request(&self, request: &FollowRequest) -> Result<(), RepositoryError> {
        let mut graph = self.graph.write();
        let pair = request.pair();
        graph.refuse_if_blocked(pair)?;
        if graph.follows.contains_key(&pair) || graph.follow_requests.contains_key(&pair) {
            return Err(RepositoryError::AlreadyExists(format!(
                "Follow or follow request from {} to {}",
                pair.0, pair.1
            )));
        }
        graph.insert_request(request.clone());
        Ok(())
    }

    async fn put_block(&self, block: &Block) -> Result<(), RepositoryError> {
        let mut graph = self.graph.write();
        let pair = block.pair();
        if graph.blocks.contains_key(&pair) {
            return Err(RepositoryError::AlreadyExists(format!(
                "Block from {} to {}",
                pair.0, pair.1
            )));
        }
        graph.blocks.insert(pair, block.clone());
        Ok(())
    }

    async fn block_and_sever(&self, block: &Block) -> Result<(), RepositoryError> {
        let mut graph = self.graph.write();
        let (origin, target) = block.pair();
        if graph.blocks.contains_key(&(origin, target)) {
            return Err(RepositoryError::AlreadyExists(format!(
                "Block from {} to {}",
                origin, target
            )));
        }
        graph.blocks.insert((origin, target), block.clone());
        for pair in [(origin, target), (target, origin)] {
            graph.remove_follow(pair);
            graph.remove_request(pair);
        }
        Ok(())
    }

    async fn put_mute(&self, mute: &Mute) -> Result<(), RepositoryError> {
        self.graph.write().mutes.insert(mute.pair(), mute.clone());
        Ok(())
    }

    async fn accept_follow_request(&self, origin: AccountId, target: AccountId) -> Result<Follow, RepositoryError> {
        let mut graph = self.graph.write();
        let pair = (origin, target);
        let request = graph
            .remove_request(pair)
            .ok_or_else(|| not_found("Follow request", pair))?;

        if let Some(existing) = graph.follows.get_mut(&pair) {
            existing.uri = request.uri;
            return Ok(existing.clone());
        }

        let follow = request.into_follow();
        graph.insert_follow(follow.clone());
        Ok(follow)
    }

    async fn reject_follow_request(&self, origin: AccountId, target: AccountId) -> Result<FollowRequest, RepositoryError> {
        let pair = (origin, target);
        self.graph
            .write()
            .remove_request(pair)
            .ok_or_else(|| not_found("Follow request", pair))
    }

    async fn unfollow(&self, origin: AccountId, target: AccountId) -> Result<Option<String>, RepositoryError> {
        Ok(self.graph.write().remove_follow((origin, target)).map(|f| f.uri))
    }

    async fn unfollow_request(&self, origin: AccountId, target: AccountId) -> Result<Option<String>, RepositoryError> {
        Ok(self.graph.write().remove_request((origin, target)).map(|r| r.uri))
    }

    async fn delete_block_by_id(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.graph.write().blocks.retain(|_, block| block.id != id);
        Ok(())
    }

    async fn delete_block_by_uri(&self, uri: &str) -> Result<(), RepositoryError> {
        self.graph.write().blocks.retain(|_, block| block.uri != uri);
        Ok(())
    }

    async fn delete_blocks_by_origin_account(&self, origin: AccountId) -> Result<(), RepositoryError> {
        self.graph.write().blocks.retain(|(o, _), _| *o != origin);
        Ok(())
    }

    async fn delete_blocks_by_target_account(&self, target: AccountId) -> Result<(), RepositoryError> {
        self.graph.write().blocks.retain(|(_, t), _| *t != target);
        Ok(())
    }

    async fn delete_mute(&self, origin: AccountId, target: AccountId) -> Result<bool, RepositoryError> {
        Ok(self.graph.write().mutes.remove(&(origin, target)).is_some())
    }

    async fn get_follows(&self, origin: Option<AccountId>, target: Option<AccountId>) -> Result<Vec<Follow>, RepositoryError> {
        let graph = self.graph.read();
        let follows = graph
            .follow_index
            .pairs(origin, target)
            .into_iter()
            .filter_map(|pair| graph.follows.get(&pair).cloned())
            .collect();
        Ok(by_creation(follows, |f: &Follow| (f.created_at, f.id)))
    }

    async fn count_follows(&self, origin: Option<AccountId>, target: Option<AccountId>) -> Result<usize, RepositoryError> {
        Ok(self.graph.read().follow_index.pairs(origin, target).len())
    }

    async fn get_follow_requests(
        &self,
        origin: Option<AccountId>,
        target: Option<AccountId>,
    ) -> Result<Vec<FollowRequest>, RepositoryError> {
        let graph = self.graph.read();
        let requests = graph
            .request_index
            .pairs(origin, target)
            .into_iter()
            .filter_map(|pair| graph.follow_requests.get(&pair).cloned())
            .collect();
        Ok(by_creation(requests, |r: &FollowRequest| (r.created_at, r.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(origin: AccountId, target: AccountId) -> Block {
        Block::new("http://localhost:8080/some_block_uri_1", origin, target)
    }

    #[tokio::test]
    async fn test_is_blocked() {
        let repo = InMemoryRelationshipRepository::new();
        let account1 = AccountId::new();
        let account2 = AccountId::new();

        assert!(!repo.is_blocked(account1, account2, false).await.unwrap());
        assert!(!repo.is_blocked(account2, account1, false).await.unwrap());

        repo.put_block(&block(account1, account2)).await.unwrap();

        assert!(repo.is_blocked(account1, account2, false).await.unwrap());
        assert!(!repo.is_blocked(account2, account1, false).await.unwrap());

        // A block exists in either direction between the two
        assert!(repo.is_blocked(account1, account2, true).await.unwrap());
        assert!(repo.is_blocked(account2, account1, true).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_block_variants() {
        let repo = InMemoryRelationshipRepository::new();
        let account1 = AccountId::new();
        let account2 = AccountId::new();

        let b = block(account1, account2);
        repo.put_block(&b).await.unwrap();
        repo.delete_block_by_id(b.id).await.unwrap();
        assert!(repo.get_block(account1, account2).await.unwrap_err().is_not_found());

        repo.put_block(&b).await.unwrap();
        repo.delete_block_by_uri("http://localhost:8080/some_block_uri_1").await.unwrap();
        assert!(repo.get_block(account1, account2).await.unwrap_err().is_not_found());

        repo.put_block(&b).await.unwrap();
        repo.delete_blocks_by_origin_account(account1).await.unwrap();
        assert!(repo.get_block(account1, account2).await.unwrap_err().is_not_found());

        repo.put_block(&b).await.unwrap();
        repo.delete_blocks_by_target_account(account2).await.unwrap();
        assert!(repo.get_block(account1, account2).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_block_rejected() {
        let repo = InMemoryRelationshipRepository::new();
        let (a, b) = (AccountId::new(), AccountId::new());
        repo.put_block(&block(a, b)).await.unwrap();
        assert!(matches!(
            repo.put_block(&block(a, b)).await,
            Err(RepositoryError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_follow_refused_across_block() {
        let repo = InMemoryRelationshipRepository::new();
        let (a, b) = (AccountId::new(), AccountId::new());
        repo.put_block(&block(a, b)).await.unwrap();

        for (origin, target) in [(a, b), (b, a)] {
            assert!(matches!(
                repo.put_follow(&Follow::new("http://localhost:8080/f", origin, target)).await,
                Err(RepositoryError::Blocked(_))
            ));
            assert!(matches!(
                repo.put_follow_request(&FollowRequest::new("http://localhost:8080/r", origin, target))
                    .await,
                Err(RepositoryError::Blocked(_))
            ));
        }
        assert_eq!(repo.count_follows(None, None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_block_and_sever() {
        let repo = InMemoryRelationshipRepository::new();
        let (a, b) = (AccountId::new(), AccountId::new());
        repo.put_follow(&Follow::new("http://localhost:8080/f/1", a, b)).await.unwrap();
        repo.put_follow_request(&FollowRequest::new("http://localhost:8080/r/1", b, a))
            .await
            .unwrap();

        repo.block_and_sever(&block(a, b)).await.unwrap();
        let relationship = repo.get_relationship(a, b).await.unwrap();
        assert!(relationship.blocking);
        assert!(!relationship.following);
        assert!(!relationship.requested_by);

        // A second block leaves the graph as it was
        repo.graph.write().insert_follow(Follow::new("http://localhost:8080/f/2", b, a));
        assert!(matches!(
            repo.block_and_sever(&block(a, b)).await,
            Err(RepositoryError::AlreadyExists(_))
        ));
        assert!(repo.is_following(b, a).await.unwrap());
    }

    #[tokio::test]
    async fn test_accept_follow_request() {
        let repo = InMemoryRelationshipRepository::new();
        let (origin, target) = (AccountId::new(), AccountId::new());
        let request = FollowRequest::new("http://localhost:8080/weeeeeeeeeeeeeeeee", origin, target);
        repo.put_follow_request(&request).await.unwrap();

        let follow = repo.accept_follow_request(origin, target).await.unwrap();
        assert_eq!(follow.uri, request.uri);
        assert!(repo.is_following(origin, target).await.unwrap());
        assert!(!repo.is_follow_requested(origin, target).await.unwrap());
    }

    #[tokio::test]
    async fn test_accept_follow_request_not_existing() {
        let repo = InMemoryRelationshipRepository::new();
        let err = repo
            .accept_follow_request(AccountId::new(), AccountId::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_accept_follow_request_follow_already_exists() {
        let repo = InMemoryRelationshipRepository::new();
        let (origin, target) = (AccountId::new(), AccountId::new());
        let existing = Follow::new("http://localhost:8080/users/zork/follow/1", origin, target);
        repo.put_follow(&existing).await.unwrap();

        // The store refuses the request while a follow exists, so plant one
        // the way a racing remote Follow activity would leave it.
        let request = FollowRequest::new("http://localhost:8080/weeeeeeeeeeeeeeeee", origin, target);
        repo.graph.write().insert_request(request.clone());

        let follow = repo.accept_follow_request(origin, target).await.unwrap();
        assert_ne!(existing.uri, request.uri);
        assert_eq!(follow.uri, request.uri);
        assert_eq!(follow.id, existing.id);
        assert_eq!(repo.count_follows(Some(origin), None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reject_follow_request() {
        let repo = InMemoryRelationshipRepository::new();
        let (origin, target) = (AccountId::new(), AccountId::new());
        repo.put_follow_request(&FollowRequest::new("http://localhost:8080/req", origin, target))
            .await
            .unwrap();

        let rejected = repo.reject_follow_request(origin, target).await.unwrap();
        assert_eq!(rejected.uri, "http://localhost:8080/req");
        assert!(!repo.is_following(origin, target).await.unwrap());

        assert!(repo.reject_follow_request(origin, target).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_request_and_follow_mutually_exclusive() {
        let repo = InMemoryRelationshipRepository::new();
        let (origin, target) = (AccountId::new(), AccountId::new());
        repo.put_follow_request(&FollowRequest::new("http://localhost:8080/req", origin, target))
            .await
            .unwrap();

        repo.put_follow(&Follow::new("http://localhost:8080/follow", origin, target))
            .await
            .unwrap();
        assert!(!repo.is_follow_requested(origin, target).await.unwrap());

        let again = FollowRequest::new("http://localhost:8080/req2", origin, target);
        assert!(matches!(
            repo.put_follow_request(&again).await,
            Err(RepositoryError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_get_and_count_follows_by_side() {
        let repo = InMemoryRelationshipRepository::new();
        let zork = AccountId::new();
        let admin = AccountId::new();
        let turtle = AccountId::new();

        repo.put_follow(&Follow::new("http://localhost:8080/f/1", zork, admin)).await.unwrap();
        repo.put_follow(&Follow::new("http://localhost:8080/f/2", zork, turtle)).await.unwrap();
        repo.put_follow(&Follow::new("http://localhost:8080/f/3", admin, zork)).await.unwrap();
        repo.put_follow(&Follow::new("http://localhost:8080/f/4", turtle, zork)).await.unwrap();

        assert_eq!(repo.get_follows(Some(zork), None).await.unwrap().len(), 2);
        assert_eq!(repo.count_follows(None, Some(zork)).await.unwrap(), 2);
        assert_eq!(repo.count_follows(Some(zork), Some(admin)).await.unwrap(), 1);
        assert_eq!(repo.count_follows(None, None).await.unwrap(), 4);
        assert!(repo.is_mutual_following(zork, admin).await.unwrap());
    }

    #[tokio::test]
    async fn test_unfollow() {
        let repo = InMemoryRelationshipRepository::new();
        let (origin, target) = (AccountId::new(), AccountId::new());
        let uri = "http://localhost:8080/users/the_mighty_zork/follow/01F8PY8RHWRQZV038T4E8T9YK8";
        repo.put_follow(&Follow::new(uri, origin, target)).await.unwrap();

        assert_eq!(repo.unfollow(origin, target).await.unwrap().as_deref(), Some(uri));
        assert_eq!(repo.unfollow(origin, target).await.unwrap(), None);
        assert_eq!(repo.count_follows(None, Some(target)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unfollow_request() {
        let repo = InMemoryRelationshipRepository::new();
        let (origin, target) = (AccountId::new(), AccountId::new());
        repo.put_follow_request(&FollowRequest::new("http://localhost:8080/weeeeeeeeeeeeeeeee", origin, target))
            .await
            .unwrap();

        assert_eq!(
            repo.unfollow_request(origin, target).await.unwrap().as_deref(),
            Some("http://localhost:8080/weeeeeeeeeeeeeeeee")
        );
        assert_eq!(repo.unfollow_request(origin, target).await.unwrap(), None);
        assert!(repo.get_follow_requests(None, Some(target)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_relationship() {
        let repo = InMemoryRelationshipRepository::new();
        let requesting = AccountId::new();
        let target = AccountId::new();

        repo.put_follow(&Follow::new("http://localhost:8080/f/1", requesting, target)).await.unwrap();
        repo.put_follow(&Follow::new("http://localhost:8080/f/2", target, requesting)).await.unwrap();
        repo.put_mute(&Mute::new(requesting, target, true)).await.unwrap();

        let relationship = repo.get_relationship(requesting, target).await.unwrap();
        assert_eq!(relationship.id, target);
        assert!(relationship.following);
        assert!(relationship.showing_reblogs);
        assert!(!relationship.notifying);
        assert!(relationship.followed_by);
        assert!(!relationship.blocking);
        assert!(!relationship.blocked_by);
        assert!(relationship.muting);
        assert!(relationship.muting_notifications);
        assert!(!relationship.requested);
        assert!(relationship.note.is_empty());

        assert!(repo.delete_mute(requesting, target).await.unwrap());
        assert!(!repo.is_muted(requesting, target).await.unwrap());
    }
}
