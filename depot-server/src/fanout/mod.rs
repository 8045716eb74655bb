//! Room-addressed event fanout
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  RoomBus                    │
//! │  DashMap<RoomKey, broadcast::Sender<..>>    │
//! └──────────────────────┬──────────────────────┘
//!                        │
//!            ┌───────────┴───────────┐
//!            │   EventFanout trait   │  ◄── injected into every
//!            └───────────┬───────────┘      publishing component
//!                        │
//!        ┌───────────────┼───────────────┐
//!        ▼               ▼               ▼
//!   order:<id>      branch:<id>     wallet:<id>  ...
//! ```
//!
//! Delivery is at-least-once and best-effort: publishing to a room with
//! no subscribers is a no-op, a lagged subscriber drops the oldest
//! events, and no ordering is guaranteed between two distinct rooms.
//! Components publish through the [`EventFanout`] trait so tests can
//! substitute a [`RecordingFanout`].

mod recorder;

pub use recorder::RecordingFanout;

use dashmap::DashMap;
use shared::message::{FanoutEvent, RoomKey};
use tokio::sync::broadcast;

/// Default per-room broadcast channel capacity
const DEFAULT_ROOM_CAPACITY: usize = 1024;

/// Publish side of the fanout layer
///
/// Injected explicitly into every component that needs to notify
/// external actors; never reached through an ambient global.
pub trait EventFanout: Send + Sync {
    /// Publish an event to a room (best-effort, never fails the caller)
    fn publish(&self, room: RoomKey, event: FanoutEvent);
}

/// In-process room bus backed by one broadcast channel per room
#[derive(Debug)]
pub struct RoomBus {
    /// Room registry (Room key -> broadcast sender)
    rooms: DashMap<RoomKey, broadcast::Sender<FanoutEvent>>,
    /// Capacity of each room channel
    capacity: usize,
}

impl RoomBus {
    /// Create a bus with the default per-room capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ROOM_CAPACITY)
    }

    /// Create a bus with a specific per-room capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            capacity,
        }
    }

    /// Subscribe to a room, creating it lazily
    pub fn subscribe(&self, room: RoomKey) -> broadcast::Receiver<FanoutEvent> {
        self.rooms
            .entry(room)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of live subscribers in a room
    pub fn subscriber_count(&self, room: &RoomKey) -> usize {
        self.rooms
            .get(room)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Drop rooms whose subscribers have all disconnected
    ///
    /// Publishing recreates a room on demand, so pruning is safe at any
    /// point; called periodically by the housekeeping task.
    pub fn prune_empty_rooms(&self) -> usize {
        let before = self.rooms.len();
        self.rooms.retain(|_, sender| sender.receiver_count() > 0);
        before - self.rooms.len()
    }
}

impl Default for RoomBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventFanout for RoomBus {
    fn publish(&self, room: RoomKey, event: FanoutEvent) {
        let sender = self
            .rooms
            .entry(room.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone();

        // A send error only means no subscriber is currently connected;
        // clients re-fetch authoritative state on reconnect.
        if sender.send(event.clone()).is_err() {
            tracing::trace!(room = %room, event = event.name(), "No subscribers for room");
        } else {
            tracing::debug!(room = %room, event = event.name(), "Event published");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::OrderStatus;

    fn status_event(order_id: &str) -> FanoutEvent {
        FanoutEvent::OrderStatusUpdated {
            order_id: order_id.to_string(),
            order_number: "ORD-000001".to_string(),
            status: OrderStatus::Packed,
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_room_subscriber() {
        let bus = RoomBus::new();
        let room = RoomKey::Order("o-1".to_string());
        let mut rx = bus.subscribe(room.clone());

        bus.publish(room, status_event("o-1"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "orderStatusUpdated");
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let bus = RoomBus::new();
        let mut order_rx = bus.subscribe(RoomKey::Order("o-1".to_string()));
        let mut other_rx = bus.subscribe(RoomKey::Order("o-2".to_string()));

        bus.publish(RoomKey::Order("o-1".to_string()), status_event("o-1"));

        assert!(order_rx.recv().await.is_ok());
        assert!(matches!(
            other_rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let bus = RoomBus::new();
        // Must not panic or error
        bus.publish(RoomKey::Admin, status_event("o-1"));
        assert_eq!(bus.subscriber_count(&RoomKey::Admin), 0);
    }

    #[tokio::test]
    async fn test_prune_empty_rooms() {
        let bus = RoomBus::new();
        let room = RoomKey::Branch("b-1".to_string());
        {
            let _rx = bus.subscribe(room.clone());
            assert_eq!(bus.prune_empty_rooms(), 0);
        }
        // Receiver dropped, room can be pruned
        assert_eq!(bus.prune_empty_rooms(), 1);
        assert_eq!(bus.subscriber_count(&room), 0);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_all_receive() {
        let bus = RoomBus::new();
        let room = RoomKey::Customer("c-1".to_string());
        let mut rx1 = bus.subscribe(room.clone());
        let mut rx2 = bus.subscribe(room.clone());

        bus.publish(room, status_event("o-1"));

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }
}
