//! Topic-based event bus implementation.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::types::{PersistenceEvent, SheetEvent};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Sheet changes (levels, purchases, undo)
    Sheet,
    /// Autosave results
    Persistence,
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Sheet(SheetEvent),
    Persistence(PersistenceEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Sheet(_) => Topic::Sheet,
            Event::Persistence(_) => Topic::Persistence,
        }
    }
}

impl From<SheetEvent> for Event {
    fn from(event: SheetEvent) -> Self {
        Event::Sheet(event)
    }
}

impl From<PersistenceEvent> for Event {
    fn from(event: PersistenceEvent) -> Self {
        Event::Persistence(event)
    }
}

/// Topic-based event bus
///
/// Allows consumers (views, webhook sinks) to subscribe to specific topics
/// and only receive events they care about. Publishing is best-effort and
/// never blocks.
#[derive(Clone)]
pub struct EventBus {
    sheet: broadcast::Sender<Event>,
    persistence: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            sheet: broadcast::channel(capacity).0,
            persistence: broadcast::channel(capacity).0,
        }
    }

    fn channel(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Sheet => &self.sheet,
            Topic::Persistence => &self.persistence,
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: impl Into<Event>) {
        let event = event.into();
        let topic = event.topic();

        if self.channel(topic).send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    ///
    /// Returns a receiver that will only receive events for that topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.channel(topic).subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
