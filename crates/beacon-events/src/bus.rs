//! A thin broadcast event bus, grounded on the teacher's
//! `riptide-events::bus::EventBus` but pared down to what this workspace
//! actually needs: a fixed set of typed events and no pluggable handler
//! registry. Subscribers call [`EventBus::subscribe`] and drain the
//! returned [`tokio::sync::broadcast::Receiver`] themselves.

use crate::event::{BeaconEvent, TimestampedEvent};
use crate::metrics::ErrorMetrics;
use tokio::sync::broadcast;

const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Central publish point for [`BeaconEvent`]s, backed by a
/// `tokio::sync::broadcast` channel. Cheap to clone; every clone shares
/// the same underlying channel and [`ErrorMetrics`].
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<TimestampedEvent>,
    metrics: ErrorMetrics,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer_size: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(buffer_size);
        Self {
            sender,
            metrics: ErrorMetrics::new(),
        }
    }

    /// Publish an event. Returns the number of active subscribers, or
    /// `0` if there are none — unlike the teacher's bus, a missing
    /// subscriber is not an error here, since the metrics counters (not
    /// the broadcast channel) are the source of truth for `/metrics`.
    pub fn publish(&self, event: impl Into<BeaconEvent>) -> usize {
        let envelope = TimestampedEvent {
            event: event.into(),
            at: chrono_now(),
        };
        self.sender.send(envelope).map(|n| n).unwrap_or(0)
    }

    /// Record a [`beacon_types::BeaconError`] against the error-taxonomy
    /// counters without publishing it on the bus (most errors are
    /// absorbed locally and only need to move the needle on `/metrics`).
    pub fn record_error(&self, error: &beacon_types::BeaconError) {
        self.metrics.record(error);
    }

    pub fn metrics(&self) -> &ErrorMetrics {
        &self.metrics
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimestampedEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Isolates the one non-deterministic call this module needs behind a
/// function boundary for testability; callers needing a fixed clock for
/// tests construct [`crate::event::TimestampedEvent`] directly.
fn chrono_now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RelayEvent;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(RelayEvent::Connected {
            url: "wss://relay.example".into(),
        });

        let received = rx.recv().await.unwrap();
        match received.event {
            BeaconEvent::Relay(RelayEvent::Connected { url }) => {
                assert_eq!(url, "wss://relay.example");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(RelayEvent::Connected { url: "x".into() }), 0);
    }

    #[test]
    fn record_error_updates_shared_metrics() {
        let bus = EventBus::new();
        bus.record_error(&beacon_types::BeaconError::Duplicate("evt1".into()));
        assert_eq!(bus.metrics().snapshot().duplicate, 1);
    }
}
