//! Request/response bodies for every route in the FRPEI and Query Engine
//! HTTP contracts. Kept snake_case throughout, matching the
//! rest of this workspace's JSON conventions.

use std::collections::HashMap;

use beacon_federation::{FeedbackRequest, RetrieveRequest};
use beacon_query::RetrievalMode;
use beacon_types::frpei::FrpeiCandidate;
use beacon_types::ports::DocumentFilter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_limit() -> u32 {
    20
}

fn default_true() -> bool {
    true
}

/// `POST /retrieve` request body.
#[derive(Debug, Deserialize)]
pub struct RetrieveBody {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub providers: Option<Vec<String>>,
    pub types: Option<Vec<String>>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub expand: bool,
    #[serde(default)]
    pub explain: bool,
    #[serde(default = "default_true", rename = "enableCache", alias = "enable_cache")]
    pub enable_cache: bool,
    #[serde(default = "default_true")]
    pub dedupe: bool,
    #[serde(rename = "timeoutMs", alias = "timeout_ms")]
    pub timeout_ms: Option<u64>,
}

impl RetrieveBody {
    pub fn into_request(self) -> RetrieveRequest {
        RetrieveRequest {
            query: self.query,
            limit: self.limit,
            providers: self.providers,
            mode: self.mode.unwrap_or_else(|| "hybrid".into()),
            types: self.types,
            enable_cache: self.enable_cache,
            dedupe: self.dedupe,
            timeout_ms: self.timeout_ms,
            expand: self.expand,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProviderOutcome {
    pub name: String,
    pub ok: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Default)]
pub struct RetrieveMetrics {
    pub cache_hit: bool,
    pub fell_back_to_local: bool,
    pub candidate_count: usize,
}

/// `POST /retrieve` response body: `{requestId, query, results[], providers[], metrics, errors?}`.
#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub request_id: String,
    pub query: String,
    pub results: Vec<FrpeiCandidate>,
    pub providers: Vec<ProviderOutcome>,
    pub metrics: RetrieveMetrics,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// `POST /enrich` request/response.
#[derive(Debug, Deserialize)]
pub struct EnrichBody {
    pub candidates: Vec<FrpeiCandidate>,
}

#[derive(Debug, Serialize)]
pub struct EnrichResponse {
    pub enriched: Vec<FrpeiCandidate>,
}

/// `POST /rank` request/response.
#[derive(Debug, Deserialize)]
pub struct RankBody {
    pub query: Option<String>,
    pub candidates: Vec<FrpeiCandidate>,
}

#[derive(Debug, Serialize)]
pub struct RankResponse {
    pub ranked: Vec<FrpeiCandidate>,
}

/// `POST /explain` request/response.
#[derive(Debug, Deserialize)]
pub struct ExplainBody {
    pub candidate: FrpeiCandidate,
}

#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    pub candidate_id: String,
    pub explanation: beacon_types::frpei::Explanation,
}

/// `POST /feedback` request body, accepting either the normalized
/// `feedback` field or an `action` synonym.
#[derive(Debug, Deserialize)]
pub struct FeedbackBody {
    pub candidate_id: String,
    pub request_id: Option<String>,
    pub provider: Option<String>,
    pub feedback: Option<String>,
    pub action: Option<String>,
    pub rating: Option<f32>,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl FeedbackBody {
    pub fn into_request(self) -> Result<FeedbackRequest, crate::error::ApiError> {
        let action = self
            .feedback
            .or(self.action)
            .ok_or_else(|| crate::error::ApiError::bad_request("one of `feedback` or `action` is required"))?;
        Ok(FeedbackRequest {
            candidate_id: self.candidate_id,
            request_id: self.request_id,
            provider: self.provider,
            action,
            rating: self.rating,
            notes: self.notes,
            metadata: self.metadata,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// `GET /search` query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    pub content_type: Option<String>,
    pub document_type: Option<String>,
    pub author: Option<String>,
    #[serde(default = "default_true")]
    pub expand: bool,
    #[serde(default = "default_true")]
    pub enable_fuzzy: bool,
    #[serde(default = "default_true")]
    pub enable_abbrev: bool,
    #[serde(default)]
    pub explain: bool,
}

impl SearchQuery {
    pub fn mode(&self) -> RetrievalMode {
        match self.mode.as_deref() {
            Some("vector") => RetrievalMode::Vector,
            Some("text") => RetrievalMode::Text,
            _ => RetrievalMode::Hybrid,
        }
    }

    pub fn filter(&self) -> DocumentFilter {
        DocumentFilter {
            content_type: self.content_type.clone(),
            document_type: self.document_type.clone(),
            author: self.author.clone(),
            attribute_eq: None,
            since: None,
            until: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub document: beacon_types::Document,
    pub score: f32,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub vector_query: String,
    pub lexical_query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<QueryRewriteExplanationDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueryRewriteExplanationDto {
    pub phrases: Vec<String>,
    pub expansions: Vec<(String, f32)>,
    pub fuzzy_matches: Vec<(String, String, usize)>,
    pub concept_matches: Vec<String>,
}

impl From<&beacon_query::QueryRewriteExplanation> for QueryRewriteExplanationDto {
    fn from(explanation: &beacon_query::QueryRewriteExplanation) -> Self {
        Self {
            phrases: explanation.phrases.clone(),
            expansions: explanation.expansions.clone(),
            fuzzy_matches: explanation
                .fuzzy_matches
                .iter()
                .map(|m| (m.term.clone(), m.matched_term.clone(), m.distance))
                .collect(),
            concept_matches: explanation
                .concept_matches
                .iter()
                .map(|m| m.preferred_term.clone())
                .collect(),
        }
    }
}

/// `GET /facets` query parameters — the same filter fields as `/search`.
#[derive(Debug, Deserialize, Default)]
pub struct FacetsQuery {
    pub content_type: Option<String>,
    pub document_type: Option<String>,
    pub author: Option<String>,
}

impl FacetsQuery {
    pub fn filter(&self) -> DocumentFilter {
        DocumentFilter {
            content_type: self.content_type.clone(),
            document_type: self.document_type.clone(),
            author: self.author.clone(),
            attribute_eq: None,
            since: None,
            until: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FacetsResponse {
    pub tags: Vec<(String, u64)>,
    pub authors: Vec<(String, u64)>,
    pub content_types: Vec<(String, u64)>,
    pub document_types: Vec<(String, u64)>,
    pub sentiments: Vec<(String, u64)>,
    pub entity_types: HashMap<String, Vec<(String, u64)>>,
    pub date_buckets: Vec<(String, u64)>,
}

impl From<beacon_query::FacetCounts> for FacetsResponse {
    fn from(counts: beacon_query::FacetCounts) -> Self {
        Self {
            tags: counts.tags.0,
            authors: counts.authors.0,
            content_types: counts.content_types.0,
            document_types: counts.document_types.0,
            sentiments: counts.sentiments.0,
            entity_types: counts.entity_types.into_iter().map(|(k, v)| (k, v.0)).collect(),
            date_buckets: counts.date_buckets.0,
        }
    }
}

/// `GET /metrics` response: the error-taxonomy counters plus per-provider
/// circuit breaker state.
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub errors: beacon_events::ErrorMetricsSnapshot,
    pub providers: Vec<ProviderStatus>,
}

#[derive(Debug, Serialize)]
pub struct ProviderStatus {
    pub name: String,
    pub circuit_state: beacon_types::ports::CircuitState,
}

/// `GET /status` response: coarse liveness plus the same provider states.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub providers: Vec<ProviderStatus>,
}
