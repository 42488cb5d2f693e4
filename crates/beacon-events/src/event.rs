//! Domain event types published on the [`crate::bus::EventBus`].
//!
//! Kept as a closed set of enums rather than a generalized `dyn Event`
//! trait: the bus only ever needs to carry these four families, and a
//! closed `match` at each subscriber keeps handling exhaustive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle events from the relay pool and discovery/crawl loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RelayEvent {
    Discovered { url: String, source: String },
    Connected { url: String },
    Disconnected { url: String, reason: String },
    RateLimited { url: String, slept_ms: u64 },
    HealthDegraded { url: String, failure_count: u32 },
}

/// Events from classification, spam filtering, and dedup/index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IngestEvent {
    Classified { event_id: String, kind: u32 },
    Rejected { event_id: String, reason: String },
    Indexed { event_id: String, document_type: String },
    Duplicate { event_id: String },
}

/// State transitions of any [`beacon_types::CircuitBreaker`] instance,
/// identified by the name of the relay/provider it guards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CircuitBreakerEvent {
    Opened { target: String, failure_count: u32 },
    HalfOpened { target: String },
    Closed { target: String },
}

/// Events from the federated retrieve/enrich/rank/explain/ingest pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FrpeiEvent {
    RetrieveStarted { request_id: String, providers: Vec<String> },
    ProviderFailed { request_id: String, provider: String, reason: String },
    ProviderFallback { request_id: String },
    FeedbackRecorded { candidate_id: String, sentiment: String },
}

/// The envelope carried on the bus: a timestamped, tagged union of the
/// four event families.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BeaconEvent {
    Relay(RelayEvent),
    Ingest(IngestEvent),
    CircuitBreaker(CircuitBreakerEvent),
    Frpei(FrpeiEvent),
}

/// A [`BeaconEvent`] with the timestamp it was emitted at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub event: BeaconEvent,
    pub at: DateTime<Utc>,
}

impl From<RelayEvent> for BeaconEvent {
    fn from(e: RelayEvent) -> Self {
        BeaconEvent::Relay(e)
    }
}

impl From<IngestEvent> for BeaconEvent {
    fn from(e: IngestEvent) -> Self {
        BeaconEvent::Ingest(e)
    }
}

impl From<CircuitBreakerEvent> for BeaconEvent {
    fn from(e: CircuitBreakerEvent) -> Self {
        BeaconEvent::CircuitBreaker(e)
    }
}

impl From<FrpeiEvent> for BeaconEvent {
    fn from(e: FrpeiEvent) -> Self {
        BeaconEvent::Frpei(e)
    }
}
