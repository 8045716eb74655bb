//! Recording fanout for tests and in-process inspection

use parking_lot::Mutex;
use shared::message::{FanoutEvent, RoomKey};

use super::EventFanout;

/// Fanout implementation that records every publish
///
/// Substituted for [`super::RoomBus`] in unit tests so components can be
/// exercised without a live subscriber, then asserted against.
#[derive(Debug, Default)]
pub struct RecordingFanout {
    events: Mutex<Vec<(RoomKey, FanoutEvent)>>,
}

impl RecordingFanout {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded publishes in order
    pub fn events(&self) -> Vec<(RoomKey, FanoutEvent)> {
        self.events.lock().clone()
    }

    /// Events published to a specific room
    pub fn events_for(&self, room: &RoomKey) -> Vec<FanoutEvent> {
        self.events
            .lock()
            .iter()
            .filter(|(key, _)| key == room)
            .map(|(_, event)| event.clone())
            .collect()
    }

    /// Whether an event with the given name reached the given room
    pub fn was_published(&self, room: &RoomKey, event_name: &str) -> bool {
        self.events
            .lock()
            .iter()
            .any(|(key, event)| key == room && event.name() == event_name)
    }

    /// Drop all recorded events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventFanout for RecordingFanout {
    fn publish(&self, room: RoomKey, event: FanoutEvent) {
        self.events.lock().push((room, event));
    }
}
