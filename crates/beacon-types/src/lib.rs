//! # Beacon Types
//!
//! Shared domain types and port traits for the Beacon Search ingestion and
//! retrieval core.
//!
//! ## Organization
//!
//! - `error`: the unified `BeaconError` taxonomy and `Result` alias
//! - `document`: the canonical `Document` and `NostrEventRecord` records
//! - `relay`: `RelayConfig`/`RelayHealth`, the crawler's runtime relay state
//! - `ontology`: `OntologyConcept`, `DictionaryEntry`, and their sub-types
//! - `frpei`: `FrpeiCandidate` and the federated-router data shapes
//! - `ports`: backend-agnostic traits implemented by infrastructure crates

pub mod document;
pub mod error;
pub mod frpei;
pub mod nostr;
pub mod ontology;
pub mod ports;
pub mod relay;

pub use document::{ContentType, Document, NostrEventRecord};
pub use error::{BeaconError, Result};
pub use frpei::{
    CandidateSource, CanonicalMatch, Enrichment, Explanation, FeedbackEntry, FeedbackSentiment,
    FrpeiCandidate, Provenance, Signals, TrustTier,
};
pub use nostr::{NostrEvent, NostrFilter};
pub use ontology::{Alias, AliasKind, DictionaryEntry, MatchedBy, OntologyConcept, Relation, RelationKind};
pub use ports::{
    CacheStorage, CircuitBreaker, CircuitState, DictionaryRepository, DocumentFilter,
    DocumentRepository, Embedder, EventStore, FeedbackRepository, OntologyRepository, Page,
    RateLimiter, SearchProvider,
};
pub use relay::{RelayConfig, RelayHealth};
