//! Error taxonomy for Beacon Search
//!
//! All kinds are observable; none crash the engine. Only [`BeaconError::Fatal`]
//! propagates past a component boundary — everything else is logged, counted,
//! and absorbed locally by the component that raised it.

use thiserror::Error;

/// Result type alias using [`BeaconError`]
pub type Result<T> = std::result::Result<T, BeaconError>;

/// Unified error type for Beacon Search operations.
///
/// Mirrors the taxonomy described for the ingestion/retrieval core: each
/// variant names a failure mode that a specific component is expected to
/// absorb locally rather than let bubble up.
#[derive(Error, Debug)]
pub enum BeaconError {
    /// A single relay or provider call failed; retried within budget and
    /// tracked by circuit-breaker logic.
    #[error("transient network failure: {0}")]
    TransientNetwork(String),

    /// Synthesized when a token bucket sleeps. Not a real error; tracked as
    /// a metric only.
    #[error("rate limit exhausted, slept {0}ms")]
    RateLimitExhausted(u64),

    /// Classification or extraction failed for one event. The event is
    /// skipped and counted; it never poisons the rest of a batch.
    #[error("malformed event: {0}")]
    MalformedEvent(String),

    /// An `ON CONFLICT DO NOTHING/UPDATE` path was taken. Not an error.
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// A provider call exceeded its deadline, distinguished from a generic
    /// failure for circuit-breaker bookkeeping.
    #[error("provider timed out after {0}ms")]
    ProviderTimeout(u64),

    /// Canonicalization against the ontology found no match. The candidate
    /// is kept without enrichment.
    #[error("no ontology match for: {0}")]
    OntologyMiss(String),

    /// The embedding function is unavailable; vector mode degrades to text
    /// mode for the affected query.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// URL parse error.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database connection loss or schema invariant violation (e.g.
    /// embedding dimension mismatch). Propagated up; no retry in the core.
    #[error("fatal: {0}")]
    Fatal(String),

    /// Generic error with a custom message.
    #[error("{0}")]
    Custom(String),

    /// Escape hatch for interop with library call sites that return
    /// `anyhow::Error`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BeaconError {
    /// Create a custom error with a message.
    pub fn custom<S: Into<String>>(msg: S) -> Self {
        BeaconError::Custom(msg.into())
    }

    /// Whether this error should be retried by its caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BeaconError::TransientNetwork(_) | BeaconError::ProviderTimeout(_)
        )
    }

    /// Whether this is a genuine error at all, or an expected control-flow
    /// signal (rate limiting, dedup) that the caller merely counts.
    pub fn is_signal_only(&self) -> bool {
        matches!(
            self,
            BeaconError::RateLimitExhausted(_) | BeaconError::Duplicate(_)
        )
    }

    /// Only [`BeaconError::Fatal`] (and its `anyhow` escape hatch when it
    /// wraps one) should terminate a task; everything else is absorbed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BeaconError::Fatal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_error_roundtrips_message() {
        let err = BeaconError::custom("boom");
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn retryable_classification() {
        assert!(BeaconError::TransientNetwork("x".into()).is_retryable());
        assert!(BeaconError::ProviderTimeout(500).is_retryable());
        assert!(!BeaconError::Configuration("x".into()).is_retryable());
    }

    #[test]
    fn signal_only_classification() {
        assert!(BeaconError::RateLimitExhausted(100).is_signal_only());
        assert!(BeaconError::Duplicate("id".into()).is_signal_only());
        assert!(!BeaconError::Fatal("db gone".into()).is_signal_only());
    }

    #[test]
    fn only_fatal_is_fatal() {
        assert!(BeaconError::Fatal("db gone".into()).is_fatal());
        assert!(!BeaconError::OntologyMiss("btc".into()).is_fatal());
        assert!(!BeaconError::MalformedEvent("bad tags".into()).is_fatal());
    }

    #[test]
    fn url_parse_error_converts() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: BeaconError = url_err.into();
        assert!(matches!(err, BeaconError::InvalidUrl(_)));
    }
}
