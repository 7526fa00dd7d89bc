// Copyright (c) 2026 fedipol contributors
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Domain Events
//
// In-memory event streaming over tokio broadcast channels. Events published
// with no subscribers are dropped; lagging subscribers lose the oldest events.

use crate::domain::account::AccountId;
use crate::domain::events::{InteractionEvent, RelationshipEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Unified domain event type for the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Interaction(InteractionEvent),
    Relationship(RelationshipEvent),
}

/// Event bus for publishing and subscribing to domain events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
}

impl EventBus {
    /// Capacity is how many events are buffered before the oldest are dropped
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish_interaction_event(&self, event: InteractionEvent) {
        self.publish(DomainEvent::Interaction(event));
    }

    pub fn publish_relationship_event(&self, event: RelationshipEvent) {
        self.publish(DomainEvent::Relationship(event));
    }

    fn publish(&self, event: DomainEvent) {
        debug!("Publishing event: {:?}", event);

        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all domain events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to relationship events touching one account, on either side
    pub fn subscribe_account(&self, account_id: AccountId) -> AccountEventReceiver {
        AccountEventReceiver {
            receiver: self.sender.subscribe(),
            account_id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiver for all domain events
pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver for relationship events of one account (filtered)
pub struct AccountEventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
    account_id: AccountId,
}

impl AccountEventReceiver {
    pub async fn recv(&mut self) -> Result<RelationshipEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;

            if let DomainEvent::Relationship(relationship_event) = event {
                let (origin, target) = relationship_event.pair();
                if origin == self.account_id || target == self.account_id {
                    return Ok(relationship_event);
                }
            }
        }
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn blocked(origin: AccountId, target: AccountId) -> RelationshipEvent {
        RelationshipEvent::Blocked {
            account_id: origin,
            target_account_id: target,
            uri: "https://example.org/users/a/block/1".to_string(),
            blocked_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let origin = AccountId::new();
        event_bus.publish_relationship_event(blocked(origin, AccountId::new()));

        match receiver.recv().await.unwrap() {
            DomainEvent::Relationship(RelationshipEvent::Blocked { account_id, .. }) => {
                assert_eq!(account_id, origin);
            }
            _ => panic!("Wrong event type received"),
        }
    }

    #[tokio::test]
    async fn test_account_event_filtering() {
        let event_bus = EventBus::new(10);
        let watched = AccountId::new();
        let mut receiver = event_bus.subscribe_account(watched);

        // Unrelated pair, filtered out
        event_bus.publish_relationship_event(blocked(AccountId::new(), AccountId::new()));
        // Watched account on the target side
        event_bus.publish_relationship_event(blocked(AccountId::new(), watched));

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.pair().1, watched);
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let event_bus = EventBus::new(4);
        let mut receiver = event_bus.subscribe();
        assert!(matches!(receiver.try_recv(), Err(EventBusError::Empty)));
        assert_eq!(event_bus.subscriber_count(), 1);
    }
}
