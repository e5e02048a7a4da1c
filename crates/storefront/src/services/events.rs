//! Cart change notifications.
//!
//! Anything showing cart state (the header badge, an open cart drawer) can
//! subscribe to its owner's events and refresh when checkout empties the
//! cart. The hub lives in `AppState` and is handed to the services that
//! publish; there is no process-wide instance.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;

use bloom_core::{OrderId, UserId};

/// Default number of buffered events before slow subscribers lag.
pub const DEFAULT_CAPACITY: usize = 64;

/// Something changed in an owner's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CartEvent {
    /// Lines were added, updated or removed.
    CartChanged { owner: UserId },
    /// An order was committed from the cart.
    CheckoutCompleted { owner: UserId, order_id: OrderId },
}

impl CartEvent {
    /// The shopper this event concerns.
    #[must_use]
    pub const fn owner(&self) -> UserId {
        match self {
            Self::CartChanged { owner } | Self::CheckoutCompleted { owner, .. } => *owner,
        }
    }
}

/// Broadcast hub for [`CartEvent`]s.
#[derive(Debug, Clone)]
pub struct CartEventHub {
    sender: broadcast::Sender<CartEvent>,
}

impl Default for CartEventHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl CartEventHub {
    /// Create a hub buffering up to `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event. Returns how many subscribers received it.
    ///
    /// Publishing with nobody listening is not an error.
    pub fn publish(&self, event: CartEvent) -> usize {
        let owner = event.owner();
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::trace!(owner = %owner, "No cart event subscribers");
                0
            }
        }
    }

    /// Subscribe to the events of a single owner.
    #[must_use]
    pub fn subscribe_for(&self, owner: UserId) -> OwnerSubscription {
        OwnerSubscription {
            owner,
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiver that yields only one owner's events.
#[derive(Debug)]
pub struct OwnerSubscription {
    owner: UserId,
    receiver: broadcast::Receiver<CartEvent>,
}

impl OwnerSubscription {
    /// Wait for the next event for this owner.
    ///
    /// Returns `None` once the hub is dropped. Missed events after a lag are
    /// skipped; subscribers only need to know that something changed.
    pub async fn recv(&mut self) -> Option<CartEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.owner() == self.owner => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(owner = %self.owner, skipped, "Cart event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Wait up to `timeout` for the next event for this owner.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<CartEvent> {
        tokio::time::timeout(timeout, self.recv()).await.ok().flatten()
    }

    /// Take an already buffered event for this owner without waiting.
    pub fn try_recv(&mut self) -> Option<CartEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.owner() == self.owner => return Some(event),
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_sees_only_own_events() {
        let hub = CartEventHub::default();
        let alice = UserId::new(1);
        let bob = UserId::new(2);
        let mut sub = hub.subscribe_for(alice);

        hub.publish(CartEvent::CartChanged { owner: bob });
        hub.publish(CartEvent::CheckoutCompleted {
            owner: alice,
            order_id: OrderId::new(10),
        });

        let event = sub.recv().await.unwrap();
        assert_eq!(
            event,
            CartEvent::CheckoutCompleted {
                owner: alice,
                order_id: OrderId::new(10)
            }
        );
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let hub = CartEventHub::new(4);
        assert_eq!(hub.publish(CartEvent::CartChanged { owner: UserId::new(3) }), 0);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_keeps_receiving() {
        let hub = CartEventHub::new(2);
        let owner = UserId::new(5);
        let mut sub = hub.subscribe_for(owner);

        for _ in 0..5 {
            hub.publish(CartEvent::CartChanged { owner });
        }

        assert_eq!(sub.recv().await.unwrap(), CartEvent::CartChanged { owner });
    }

    #[tokio::test]
    async fn test_recv_returns_none_when_hub_dropped() {
        let hub = CartEventHub::default();
        let mut sub = hub.subscribe_for(UserId::new(1));
        drop(hub);
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_recv_timeout_expires() {
        let hub = CartEventHub::default();
        let mut sub = hub.subscribe_for(UserId::new(1));
        assert!(sub.recv_timeout(Duration::from_millis(10)).await.is_none());
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(CartEvent::CheckoutCompleted {
            owner: UserId::new(1),
            order_id: OrderId::new(2),
        })
        .unwrap();
        assert_eq!(json["type"], "checkout_completed");
        assert_eq!(json["order_id"], 2);
    }
}
