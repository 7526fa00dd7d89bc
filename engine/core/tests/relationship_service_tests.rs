// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for locally originated relationship changes.

use std::sync::Arc;

use fedi_policy::application::relationship::{FollowOutcome, RelationshipError, RelationshipService};
use fedi_policy::domain::account::{Account, AccountId};
use fedi_policy::domain::engine_config::InstanceConfig;
use fedi_policy::domain::events::RelationshipEvent;
use fedi_policy::domain::repository::{AccountRepository, RelationshipRepository};
use fedi_policy::infrastructure::event_bus::{DomainEvent, EventBus};
use fedi_policy::infrastructure::repositories::{InMemoryAccountRepository, InMemoryRelationshipRepository};

struct Fixture {
    graph: Arc<InMemoryRelationshipRepository>,
    accounts: Arc<InMemoryAccountRepository>,
    event_bus: Arc<EventBus>,
    service: RelationshipService,
}

impl Fixture {
    fn new() -> Self {
        let graph = Arc::new(InMemoryRelationshipRepository::new());
        let accounts = Arc::new(InMemoryAccountRepository::new());
        let event_bus = Arc::new(EventBus::new(64));
        let service = RelationshipService::new(graph.clone(), accounts.clone()).with_event_bus(event_bus.clone());
        Self {
            graph,
            accounts,
            event_bus,
            service,
        }
    }

    async fn local(&self, username: &str, locked: bool) -> Account {
        let account = Account::new_local(username, &InstanceConfig::default())
            .unwrap()
            .with_locked(locked);
        self.accounts.save(&account).await.unwrap();
        account
    }

    async fn remote(&self, username: &str) -> Account {
        let base = format!("https://remote.example/users/{}", username);
        let account = Account::new_remote(
            username,
            "remote.example",
            &base,
            &format!("{}/followers", base),
            &format!("{}/following", base),
        )
        .unwrap();
        self.accounts.save(&account).await.unwrap();
        account
    }
}

#[tokio::test]
async fn test_follow_unlocked_local_account() {
    let fx = Fixture::new();
    let mut events = fx.event_bus.subscribe();
    let zork = fx.local("zork", false).await;
    let turtle = fx.local("turtle", false).await;

    let outcome = fx.service.follow(zork.id, turtle.id).await.unwrap();
    let FollowOutcome::Following(follow) = outcome else {
        panic!("expected a follow");
    };
    assert!(follow.uri.starts_with("http://localhost:8080/users/zork/follow/"));
    assert!(fx.graph.is_following(zork.id, turtle.id).await.unwrap());

    match events.recv().await.unwrap() {
        DomainEvent::Relationship(RelationshipEvent::Followed { account_id, uri, .. }) => {
            assert_eq!(account_id, zork.id);
            assert_eq!(uri, follow.uri);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_follow_is_idempotent() {
    let fx = Fixture::new();
    let zork = fx.local("zork", false).await;
    let turtle = fx.local("turtle", false).await;

    let first = fx.service.follow(zork.id, turtle.id).await.unwrap();
    let second = fx.service.follow(zork.id, turtle.id).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(fx.graph.count_follows(Some(zork.id), None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_follow_locked_or_remote_creates_request() {
    let fx = Fixture::new();
    let zork = fx.local("zork", false).await;
    let locked = fx.local("locked", true).await;
    let remote = fx.remote("someone").await;

    for target in [&locked, &remote] {
        let outcome = fx.service.follow(zork.id, target.id).await.unwrap();
        assert!(matches!(outcome, FollowOutcome::Requested(_)));
        assert!(fx.graph.is_follow_requested(zork.id, target.id).await.unwrap());
        assert!(!fx.graph.is_following(zork.id, target.id).await.unwrap());
    }
}

#[tokio::test]
async fn test_follow_refused_for_self_and_blocks() {
    let fx = Fixture::new();
    let zork = fx.local("zork", false).await;
    let turtle = fx.local("turtle", false).await;

    assert!(matches!(
        fx.service.follow(zork.id, zork.id).await,
        Err(RelationshipError::SelfTarget(_))
    ));

    fx.service.block(turtle.id, zork.id).await.unwrap();
    assert!(matches!(
        fx.service.follow(zork.id, turtle.id).await,
        Err(RelationshipError::Blocked { .. })
    ));
}

#[tokio::test]
async fn test_follow_unknown_account() {
    let fx = Fixture::new();
    let zork = fx.local("zork", false).await;
    let ghost = AccountId::new();

    assert!(matches!(
        fx.service.follow(zork.id, ghost).await,
        Err(RelationshipError::AccountNotFound(id)) if id == ghost
    ));
}

#[tokio::test]
async fn test_accept_and_reject_follow_request() {
    let fx = Fixture::new();
    let zork = fx.local("zork", false).await;
    let turtle = fx.local("turtle", false).await;
    let locked = fx.local("locked", true).await;

    let outcome = fx.service.follow(zork.id, locked.id).await.unwrap();
    let follow = fx.service.accept_follow_request(zork.id, locked.id).await.unwrap();
    assert_eq!(follow.uri, outcome.uri());
    assert!(fx.graph.is_following(zork.id, locked.id).await.unwrap());
    assert!(!fx.graph.is_follow_requested(zork.id, locked.id).await.unwrap());

    fx.service.follow(turtle.id, locked.id).await.unwrap();
    let rejected = fx.service.reject_follow_request(turtle.id, locked.id).await.unwrap();
    assert_eq!(rejected.target_account_id, locked.id);
    assert!(!fx.graph.is_following(turtle.id, locked.id).await.unwrap());

    assert!(matches!(
        fx.service.accept_follow_request(turtle.id, locked.id).await,
        Err(RelationshipError::NoFollowRequest { .. })
    ));
}

#[tokio::test]
async fn test_unfollow_withdraws_request() {
    let fx = Fixture::new();
    let zork = fx.local("zork", false).await;
    let locked = fx.local("locked", true).await;

    let outcome = fx.service.follow(zork.id, locked.id).await.unwrap();
    let removed = fx.service.unfollow(zork.id, locked.id).await.unwrap();
    assert_eq!(removed.as_deref(), Some(outcome.uri()));
    assert!(!fx.graph.is_follow_requested(zork.id, locked.id).await.unwrap());

    assert_eq!(fx.service.unfollow(zork.id, locked.id).await.unwrap(), None);
}

#[tokio::test]
async fn test_block_severs_follows_both_ways() {
    let fx = Fixture::new();
    let zork = fx.local("zork", false).await;
    let turtle = fx.local("turtle", false).await;
    fx.service.follow(zork.id, turtle.id).await.unwrap();
    fx.service.follow(turtle.id, zork.id).await.unwrap();

    let block = fx.service.block(zork.id, turtle.id).await.unwrap();
    assert!(block.uri.starts_with("http://localhost:8080/users/zork/block/"));

    let relationship = fx.service.relationship(zork.id, turtle.id).await.unwrap();
    assert!(relationship.blocking);
    assert!(!relationship.following);
    assert!(!relationship.followed_by);
    assert!(!relationship.requested);

    // Blocking again returns the same block
    let again = fx.service.block(zork.id, turtle.id).await.unwrap();
    assert_eq!(again.id, block.id);

    let uri = fx.service.unblock(zork.id, turtle.id).await.unwrap();
    assert_eq!(uri, Some(block.uri));
    assert!(!fx.graph.is_blocked(zork.id, turtle.id, true).await.unwrap());
    assert_eq!(fx.service.unblock(zork.id, turtle.id).await.unwrap(), None);
}

#[tokio::test]
async fn test_mute_and_unmute() {
    let fx = Fixture::new();
    let zork = fx.local("zork", false).await;
    let turtle = fx.local("turtle", false).await;

    fx.service.mute(zork.id, turtle.id, true).await.unwrap();
    let relationship = fx.service.relationship(zork.id, turtle.id).await.unwrap();
    assert!(relationship.muting);
    assert!(relationship.muting_notifications);

    assert!(fx.service.unmute(zork.id, turtle.id).await.unwrap());
    assert!(!fx.service.unmute(zork.id, turtle.id).await.unwrap());
    assert!(!fx.graph.is_muted(zork.id, turtle.id).await.unwrap());
}

#[tokio::test]
async fn test_account_receiver_sees_block_of_watched_account() {
    let fx = Fixture::new();
    let zork = fx.local("zork", false).await;
    let turtle = fx.local("turtle", false).await;
    let mut watcher = fx.event_bus.subscribe_account(turtle.id);

    fx.service.block(zork.id, turtle.id).await.unwrap();

    match watcher.recv().await.unwrap() {
        RelationshipEvent::Blocked { account_id, target_account_id, .. } => {
            assert_eq!(account_id, zork.id);
            assert_eq!(target_account_id, turtle.id);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_follow_and_block_never_leave_follow_behind_block() {
    for _ in 0..64 {
        let fx = Fixture::new();
        let zork = fx.local("zork", false).await;
        let turtle = fx.local("turtle", false).await;
        let service = Arc::new(fx.service);

        let follower = service.clone();
        let blocker = service.clone();
        let follow = tokio::spawn(async move { follower.follow(zork.id, turtle.id).await });
        let block = tokio::spawn(async move { blocker.block(turtle.id, zork.id).await });

        match follow.await.unwrap() {
            Ok(_) | Err(RelationshipError::Blocked { .. }) => {}
            Err(other) => panic!("unexpected error {:?}", other),
        }
        block.await.unwrap().unwrap();

        assert!(fx.graph.is_blocked(zork.id, turtle.id, true).await.unwrap());
        assert!(!fx.graph.is_following(zork.id, turtle.id).await.unwrap());
        assert!(!fx.graph.is_follow_requested(zork.id, turtle.id).await.unwrap());
    }
}
