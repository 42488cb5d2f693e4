//! Async event bus and metric counters shared across Beacon Search
//! components: relay lifecycle, ingestion outcomes, circuit breaker state
//! transitions, and FRPEI retrieval, plus the atomic counters backing the
//! error-taxonomy metrics surfaced at `/metrics` and `/status`.

pub mod bus;
pub mod event;
pub mod metrics;

pub use bus::EventBus;
pub use event::{BeaconEvent, CircuitBreakerEvent, FrpeiEvent, IngestEvent, RelayEvent, TimestampedEvent};
pub use metrics::{ErrorMetrics, ErrorMetricsSnapshot};
