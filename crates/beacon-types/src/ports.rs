//! Backend-agnostic trait ("port") definitions implemented by infrastructure
//! crates (`beacon-reliability`, `beacon-persistence`, `beacon-relay`,
//! `beacon-federation`) and consumed by the component crates without
//! creating a dependency cycle back to those implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::document::{Document, NostrEventRecord};
use crate::error::Result;
use crate::frpei::{FeedbackEntry, FrpeiCandidate};
use crate::ontology::{DictionaryEntry, OntologyConcept};

/// A gate that short-circuits calls to a failing dependency. Implemented by
/// `beacon-reliability::CircuitBreaker` and shared by the relay pool and by
/// every FRPEI provider.
pub trait CircuitBreaker: Send + Sync {
    /// Returns `true` if a call may proceed right now.
    fn allow_request(&self) -> bool;
    fn record_success(&self);
    fn record_failure(&self);
    fn state(&self) -> CircuitState;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Generic TTL-keyed cache storage, used by FRPEI's retrieve cache and
/// optionally by query result memoization.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: std::time::Duration) -> Result<()>;
    async fn invalidate(&self, key: &str) -> Result<()>;
}

/// Token-bucket rate limiter, keyed by an arbitrary resource id (a relay
/// URL in the crawler, a provider name in FRPEI).
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Blocks (sleeping as needed) until a request to `key` may proceed,
    /// returning how long it slept.
    async fn acquire(&self, key: &str) -> std::time::Duration;
}

/// Filters accepted by [`DocumentRepository::search_documents`] and facet
/// aggregation. `None` means "no constraint on this field."
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub content_type: Option<String>,
    pub document_type: Option<String>,
    pub author: Option<String>,
    pub attribute_eq: Option<(String, serde_json::Value)>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

/// Pagination, stable-tiebroken by `updated_at` then `id`.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 20,
        }
    }
}

/// The canonical Document/NostrEventRecord store. Exclusively written by
/// the Ingestion Pipeline (for relay-sourced documents) and by FRPEI's
/// feedback/ingest step; read-only from the Query Engine.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Upserts a Document and its co-terminal NostrEventRecord atomically.
    /// Keyed by `(source_id, external_id)` when both are present on the
    /// document, else always inserts a new document; the event record is
    /// keyed by `event_id`. On conflict, only `quality_score`/`indexed_at`
    /// are updated — `event_created_at` is never overwritten.
    async fn upsert_event(&self, document: Document, event: NostrEventRecord) -> Result<Uuid>;

    async fn get(&self, id: Uuid) -> Result<Option<Document>>;
    async fn get_event(&self, event_id: &str) -> Result<Option<NostrEventRecord>>;
    async fn find_by_dedup_key(&self, source_id: &str, external_id: &str) -> Result<Option<Document>>;

    async fn search_documents(&self, filter: &DocumentFilter, page: Page) -> Result<Vec<Document>>;
    async fn count_documents(&self, filter: &DocumentFilter) -> Result<u64>;

    /// Vector similarity search (cosine distance) against `query_embedding`.
    async fn vector_search(
        &self,
        query_embedding: &[f32],
        filter: &DocumentFilter,
        page: Page,
    ) -> Result<Vec<(Document, f32)>>;

    /// Lexical rank search over the stemmed/tokenized index.
    async fn text_search(
        &self,
        lexical_query: &str,
        filter: &DocumentFilter,
        page: Page,
    ) -> Result<Vec<(Document, f32)>>;
}

/// Alias kept distinct from [`DocumentRepository`] for the stores that only
/// need event-level access (e.g. the crawler's dedup bookkeeping).
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn has_event(&self, event_id: &str) -> Result<bool>;
    async fn mark_processed(&self, event_id: &str) -> Result<()>;
}

/// Read-only access to the ontology graph, used by the Query Engine's
/// concept matcher/relation expander and by FRPEI canonicalization.
#[async_trait]
pub trait OntologyRepository: Send + Sync {
    async fn find_by_term(&self, term: &str) -> Result<Vec<OntologyConcept>>;
    async fn get(&self, id: Uuid) -> Result<Option<OntologyConcept>>;
    async fn related(&self, id: Uuid) -> Result<Vec<OntologyConcept>>;
    async fn all_terms(&self) -> Result<Vec<String>>;
}

/// Read-only access to the flat synonym/acronym dictionary.
#[async_trait]
pub trait DictionaryRepository: Send + Sync {
    async fn find(&self, term: &str) -> Result<Option<DictionaryEntry>>;
    async fn all_terms(&self) -> Result<Vec<String>>;
}

/// `Embed(text) -> Vec<f32>`. An external collaborator by design — no
/// production implementation ships in this workspace.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn dimension(&self) -> usize;
}

/// A federated search backend (local, web, media, ...), implemented once
/// per provider in `beacon-federation::providers`.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// `expand` mirrors the caller's own retrieve-request flag: providers
    /// that perform their own query understanding (the `local` provider's
    /// ontology-aware rewrite) use it to decide whether to expand the
    /// query; providers with no such stage may ignore it.
    async fn search(&self, query: &str, limit: u32, expand: bool) -> Result<Vec<FrpeiCandidate>>;
    fn name(&self) -> &str;
    async fn health_check(&self) -> Result<()>;
}

/// Append-only feedback log plus its read-side ranking aggregate.
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn record(&self, entry: FeedbackEntry) -> Result<()>;
    /// Bounded `[0.0, 0.15]`, recency-weighted boost for a candidate id.
    async fn boost_for(&self, candidate_id: &str) -> Result<f32>;
}
