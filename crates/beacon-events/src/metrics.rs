//! In-process counters backing the `/metrics` and `/status` surfaces.
//!
//! One atomic per [`beacon_types::BeaconError`] variant that is tracked as
//! a signal rather than propagated: these are the numbers an
//! operator watches to tell a healthy system (rate limiting, the
//! occasional duplicate) from a degrading one (rising provider timeouts).

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of [`ErrorMetrics`] at a point in time, suitable for
/// serializing into a `/metrics` or `/status` response body.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ErrorMetricsSnapshot {
    pub transient_network: u64,
    pub rate_limit_exhausted: u64,
    pub malformed_event: u64,
    pub duplicate: u64,
    pub provider_timeout: u64,
    pub ontology_miss: u64,
    pub embedding_unavailable: u64,
}

/// Lock-free counters, one per observable [`beacon_types::BeaconError`]
/// variant. Cheap to clone (wraps an `Arc`) and safe to share across
/// every task that might raise one of these.
#[derive(Debug, Clone, Default)]
pub struct ErrorMetrics {
    inner: std::sync::Arc<ErrorMetricsInner>,
}

#[derive(Debug, Default)]
struct ErrorMetricsInner {
    transient_network: AtomicU64,
    rate_limit_exhausted: AtomicU64,
    malformed_event: AtomicU64,
    duplicate: AtomicU64,
    provider_timeout: AtomicU64,
    ontology_miss: AtomicU64,
    embedding_unavailable: AtomicU64,
}

impl ErrorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the counter matching a [`beacon_types::BeaconError`],
    /// doing nothing for variants that aren't part of the taxonomy
    /// (`Fatal`, `Configuration`, etc. are logged, not counted here).
    pub fn record(&self, error: &beacon_types::BeaconError) {
        use beacon_types::BeaconError::*;
        let counter = match error {
            TransientNetwork(_) => &self.inner.transient_network,
            RateLimitExhausted(_) => &self.inner.rate_limit_exhausted,
            MalformedEvent(_) => &self.inner.malformed_event,
            Duplicate(_) => &self.inner.duplicate,
            ProviderTimeout(_) => &self.inner.provider_timeout,
            OntologyMiss(_) => &self.inner.ontology_miss,
            EmbeddingUnavailable(_) => &self.inner.embedding_unavailable,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ErrorMetricsSnapshot {
        ErrorMetricsSnapshot {
            transient_network: self.inner.transient_network.load(Ordering::Relaxed),
            rate_limit_exhausted: self.inner.rate_limit_exhausted.load(Ordering::Relaxed),
            malformed_event: self.inner.malformed_event.load(Ordering::Relaxed),
            duplicate: self.inner.duplicate.load(Ordering::Relaxed),
            provider_timeout: self.inner.provider_timeout.load(Ordering::Relaxed),
            ontology_miss: self.inner.ontology_miss.load(Ordering::Relaxed),
            embedding_unavailable: self.inner.embedding_unavailable.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_types::BeaconError;

    #[test]
    fn records_only_taxonomy_variants() {
        let metrics = ErrorMetrics::new();
        metrics.record(&BeaconError::TransientNetwork("timeout".into()));
        metrics.record(&BeaconError::Duplicate("evt1".into()));
        metrics.record(&BeaconError::Fatal("db gone".into()));

        let snap = metrics.snapshot();
        assert_eq!(snap.transient_network, 1);
        assert_eq!(snap.duplicate, 1);
        assert_eq!(snap.rate_limit_exhausted, 0);
    }

    #[test]
    fn counters_accumulate_across_clones() {
        let metrics = ErrorMetrics::new();
        let clone = metrics.clone();
        clone.record(&BeaconError::ProviderTimeout(1500));
        assert_eq!(metrics.snapshot().provider_timeout, 1);
    }
}
