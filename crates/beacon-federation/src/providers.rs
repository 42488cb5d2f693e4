//! Concrete [`SearchProvider`] implementations: `local` (the document
//! store itself), and the generic `web`/`media` HTTP backends federated
//! search fans out to.

use std::sync::Arc;

use async_trait::async_trait;
use beacon_query::retrieval::{RetrievalMode, Retriever};
use beacon_query::{QueryRewriter, RewriteOptions};
use beacon_reliability::http_client::{FetchOptions, ReliableHttpClient};
use beacon_types::ports::{DocumentFilter, DocumentRepository, Embedder, Page, SearchProvider};
use beacon_types::{BeaconError, Result};
use beacon_types::frpei::{CandidateSource, FrpeiCandidate, TrustTier};
use serde::Deserialize;

/// Wraps the document store as a federated provider, reusing the Query
/// Engine's hybrid retriever and query rewriter rather than
/// re-implementing text/vector scoring or ontology expansion: every local
/// hit is a high-trust candidate with no network round-trip.
pub struct LocalProvider<R> {
    retriever: Retriever<R>,
    rewriter: Arc<QueryRewriter>,
}

impl<R> LocalProvider<R>
where
    R: DocumentRepository + Send + Sync + 'static,
{
    pub fn new(repository: Arc<R>, embedder: Option<Arc<dyn Embedder>>, rewriter: Arc<QueryRewriter>) -> Self {
        Self {
            retriever: Retriever::new(repository, embedder),
            rewriter,
        }
    }
}

#[async_trait]
impl<R> SearchProvider for LocalProvider<R>
where
    R: DocumentRepository + Send + Sync + 'static,
{
    async fn search(&self, query: &str, limit: u32, expand: bool) -> Result<Vec<FrpeiCandidate>> {
        let rewritten = self
            .rewriter
            .rewrite(
                query,
                &RewriteOptions {
                    expand: Some(expand),
                    ..Default::default()
                },
            )
            .await?;
        let page = Page { offset: 0, limit };
        let hits = self
            .retriever
            .retrieve(&rewritten, RetrievalMode::Hybrid, &DocumentFilter::default(), page)
            .await?;

        Ok(hits
            .into_iter()
            .map(|scored| {
                let document = scored.document;
                let mut candidate = FrpeiCandidate::new(
                    document.id.to_string(),
                    CandidateSource {
                        provider: "local".into(),
                        trust_tier: TrustTier::High,
                    },
                    document.title.clone().unwrap_or_else(|| document.content.chars().take(80).collect()),
                );
                candidate.url = document.url.as_ref().map(ToString::to_string);
                candidate.normalized_url = candidate.url.as_deref().map(normalize_http_url);
                candidate.snippet = Some(document.content.chars().take(280).collect());
                candidate.content_type = document.document_type.clone();
                candidate.signals.score = scored.score;
                let freshness_days = (chrono::Utc::now() - document.created_at).num_days().max(0) as u32;
                candidate.signals.freshness_days = Some(freshness_days);
                candidate
            })
            .collect())
    }

    fn name(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> Result<()> {
        self.retriever
            .repository()
            .count_documents(&DocumentFilter::default())
            .await
            .map(|_| ())
    }
}

#[derive(Debug, Deserialize)]
struct GenericSearchResponse {
    #[serde(default)]
    results: Vec<GenericSearchHit>,
}

#[derive(Debug, Deserialize)]
struct GenericSearchHit {
    title: String,
    url: Option<String>,
    snippet: Option<String>,
    #[serde(default)]
    score: f32,
}

/// A generic HTTP JSON search backend, shared by the `web` and `media`
/// providers — they differ only in base URL and trust tier.
pub struct HttpSearchProvider {
    name: String,
    trust_tier: TrustTier,
    base_url: String,
    client: ReliableHttpClient,
}

impl HttpSearchProvider {
    pub fn new(name: impl Into<String>, trust_tier: TrustTier, base_url: impl Into<String>, client: ReliableHttpClient) -> Self {
        Self {
            name: name.into(),
            trust_tier,
            base_url: base_url.into(),
            client,
        }
    }

    pub fn web(base_url: impl Into<String>, client: ReliableHttpClient) -> Self {
        Self::new("web", TrustTier::Low, base_url, client)
    }

    pub fn media(base_url: impl Into<String>, client: ReliableHttpClient) -> Self {
        Self::new("media", TrustTier::Medium, base_url, client)
    }
}

#[async_trait]
impl SearchProvider for HttpSearchProvider {
    async fn search(&self, query: &str, limit: u32, _expand: bool) -> Result<Vec<FrpeiCandidate>> {
        let url = format!("{}/search?q={}&limit={}", self.base_url, urlencoding_encode(query), limit);
        let response = self.client.get(&url, FetchOptions::default()).await?;
        let parsed: GenericSearchResponse = response
            .json()
            .await
            .map_err(|e| BeaconError::MalformedEvent(format!("{} provider response: {e}", self.name)))?;

        Ok(parsed
            .results
            .into_iter()
            .enumerate()
            .map(|(idx, hit)| {
                let mut candidate = FrpeiCandidate::new(
                    format!("{}-{}", self.name, idx),
                    CandidateSource {
                        provider: self.name.clone(),
                        trust_tier: self.trust_tier,
                    },
                    hit.title,
                );
                candidate.url = hit.url.clone();
                candidate.normalized_url = hit.url.as_deref().map(normalize_http_url);
                candidate.snippet = hit.snippet;
                candidate.content_type = "web_result".into();
                candidate.signals.score = hit.score;
                candidate.signals.rank = Some(idx as u32 + 1);
                candidate
            })
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn health_check(&self) -> Result<()> {
        self.client.get(&format!("{}/health", self.base_url), FetchOptions::default()).await.map(|_| ())
    }
}

fn normalize_http_url(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    lowered.strip_suffix('/').map(str::to_string).unwrap_or(lowered)
}

/// Minimal percent-encoding for the one query parameter providers need;
/// avoids pulling in a whole URL-building crate for a single call site.
fn urlencoding_encode(input: &str) -> String {
    input
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
            _ => format!("%{b:02X}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_config::QueryRewriteConfig;
    use beacon_persistence::{InMemoryDictionaryStore, InMemoryDocumentStore, InMemoryOntologyStore};
    use beacon_types::{ContentType, Document, NostrEventRecord};
    use chrono::Utc;

    fn sample_event(id: &str) -> NostrEventRecord {
        NostrEventRecord {
            event_id: id.into(),
            pubkey: "pk".into(),
            kind: 1,
            event_created_at: Utc::now(),
            tags: vec![],
            document_id: uuid::Uuid::nil(),
            quality_score: 0.5,
            indexed_at: Utc::now(),
        }
    }

    fn rewriter() -> Arc<QueryRewriter> {
        Arc::new(QueryRewriter::new(
            Arc::new(InMemoryOntologyStore::new()),
            Arc::new(InMemoryDictionaryStore::new()),
            QueryRewriteConfig::default(),
        ))
    }

    #[tokio::test]
    async fn local_provider_surfaces_document_store_hits() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store
            .upsert_event(Document::new("bitcoin halving explained".into(), "note", ContentType::Note), sample_event("e1"))
            .await
            .unwrap();

        let provider = LocalProvider::new(store, None, rewriter());
        let hits = provider.search("bitcoin", 10, true).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source.trust_tier, TrustTier::High);
    }

    #[test]
    fn normalize_http_url_lowercases_and_strips_trailing_slash() {
        assert_eq!(normalize_http_url("HTTPS://Example.com/Post/"), "https://example.com/post");
    }

    #[test]
    fn urlencoding_escapes_reserved_characters() {
        assert_eq!(urlencoding_encode("bitcoin network"), "bitcoin%20network");
    }
}
