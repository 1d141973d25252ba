//! Change notifications for the panel store, backed by a
//! `tokio::sync::broadcast` channel.

use chrono::{DateTime, Utc};
use genpanel_core::{GenerationPanelView, MediaType, RunType};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// What a dispatched action changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelEvent {
    Opened { loading: bool },
    Closed,
    ViewChanged { view: GenerationPanelView },
    TypeChanged { media_type: MediaType },
    LoadFailed,
    DataChanged { run_type: RunType },
    DataCleared,
}

/// A [`PanelEvent`] stamped with the counter value after it was applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEvent {
    pub event: PanelEvent,
    pub counter: u64,
    pub timestamp: DateTime<Utc>,
}

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// Fan-out of [`StoreEvent`]s to any number of subscribers.
pub struct PanelEventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl PanelEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped when nobody listens.
    pub fn publish(&self, event: PanelEvent, counter: u64) {
        let _ = self.sender.send(StoreEvent {
            event,
            counter,
            timestamp: Utc::now(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }
}

impl Default for PanelEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = PanelEventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(PanelEvent::DataChanged { run_type: RunType::Run }, 3);

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event, PanelEvent::DataChanged { run_type: RunType::Run });
        assert_eq!(received.counter, 3);
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        PanelEventBus::default().publish(PanelEvent::Closed, 0);
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let value = serde_json::to_value(PanelEvent::Opened { loading: true }).unwrap();
        assert_eq!(value, serde_json::json!({"kind": "opened", "loading": true}));
    }
}
