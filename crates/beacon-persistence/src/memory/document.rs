//! In-memory [`DocumentRepository`]/[`EventStore`] adapter.
//!
//! Used by component tests and by any deployment that hasn't wired a
//! `postgres` feature build. Mirrors the transactional-upsert and
//! dedup-key semantics the Postgres adapter provides, guarded by a single
//! `tokio::sync::RwLock` rather than a connection pool.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use beacon_types::ports::{DocumentFilter, DocumentRepository, EventStore, Page};
use beacon_types::{Document, NostrEventRecord, Result};
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    documents: HashMap<Uuid, Document>,
    events: HashMap<String, NostrEventRecord>,
    dedup_index: HashMap<(String, String), Uuid>,
    processed_event_ids: HashSet<String>,
}

/// Shared, clonable in-memory store implementing both
/// [`DocumentRepository`] and [`EventStore`].
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches_filter(doc: &Document, filter: &DocumentFilter) -> bool {
        if let Some(ct) = &filter.content_type {
            let matches = match &doc.content_type {
                beacon_types::ContentType::Other(s) => s == ct,
                other => format!("{other:?}").to_lowercase() == ct.to_lowercase(),
            };
            if !matches {
                return false;
            }
        }
        if let Some(dt) = &filter.document_type {
            if &doc.document_type != dt {
                return false;
            }
        }
        if let Some(author) = &filter.author {
            let matches_author = doc
                .attributes
                .get("nostr")
                .and_then(|n| n.get("pubkey"))
                .and_then(|p| p.as_str())
                .map(|p| p == author)
                .unwrap_or(false);
            if !matches_author {
                return false;
            }
        }
        if let Some((key, value)) = &filter.attribute_eq {
            if doc.attributes.get(key) != Some(value) {
                return false;
            }
        }
        if let Some(since) = filter.since {
            if doc.created_at < since {
                return false;
            }
        }
        if let Some(until) = filter.until {
            if doc.created_at > until {
                return false;
            }
        }
        true
    }

    fn paginate<T>(items: Vec<T>, page: Page) -> Vec<T> {
        items
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentStore {
    async fn upsert_event(&self, mut document: Document, event: NostrEventRecord) -> Result<Uuid> {
        let mut inner = self.inner.write().await;

        // A repeat `event_id` is not an error: it is the same Nostr event
        // arriving again (re-crawl, duplicate relay delivery). Reuse the
        // document that event already produced instead of rejecting or
        // minting a second one for it.
        let existing_document_id = inner.events.get(&event.event_id).map(|e| e.document_id);

        let dedup_key = document
            .dedup_key()
            .map(|(s, e)| (s.to_string(), e.to_string()));

        let doc_id = if let Some(existing_id) = existing_document_id {
            document.id = existing_id;
            document.updated_at = Utc::now();
            if let Some(key) = &dedup_key {
                inner.dedup_index.insert(key.clone(), existing_id);
            }
            inner.documents.insert(existing_id, document);
            existing_id
        } else if let Some(key) = &dedup_key {
            if let Some(&existing_id) = inner.dedup_index.get(key) {
                document.id = existing_id;
                document.updated_at = Utc::now();
                inner.documents.insert(existing_id, document);
                existing_id
            } else {
                let id = document.id;
                inner.dedup_index.insert(key.clone(), id);
                inner.documents.insert(id, document);
                id
            }
        } else {
            let id = document.id;
            inner.documents.insert(id, document);
            id
        };

        let mut event = event;
        event.document_id = doc_id;
        if let Some(existing) = inner.events.get(&event.event_id) {
            event.event_created_at = existing.event_created_at;
        }
        let event_id = event.event_id.clone();
        inner.events.insert(event_id.clone(), event);
        inner.processed_event_ids.insert(event_id);

        Ok(doc_id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Document>> {
        Ok(self.inner.read().await.documents.get(&id).cloned())
    }

    async fn get_event(&self, event_id: &str) -> Result<Option<NostrEventRecord>> {
        Ok(self.inner.read().await.events.get(event_id).cloned())
    }

    async fn find_by_dedup_key(&self, source_id: &str, external_id: &str) -> Result<Option<Document>> {
        let inner = self.inner.read().await;
        let key = (source_id.to_string(), external_id.to_string());
        Ok(inner
            .dedup_index
            .get(&key)
            .and_then(|id| inner.documents.get(id))
            .cloned())
    }

    async fn search_documents(&self, filter: &DocumentFilter, page: Page) -> Result<Vec<Document>> {
        let inner = self.inner.read().await;
        let mut matched: Vec<Document> = inner
            .documents
            .values()
            .filter(|doc| Self::matches_filter(doc, filter))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        Ok(Self::paginate(matched, page))
    }

    async fn count_documents(&self, filter: &DocumentFilter) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(inner
            .documents
            .values()
            .filter(|doc| Self::matches_filter(doc, filter))
            .count() as u64)
    }

    async fn vector_search(
        &self,
        query_embedding: &[f32],
        filter: &DocumentFilter,
        page: Page,
    ) -> Result<Vec<(Document, f32)>> {
        let inner = self.inner.read().await;
        let mut scored: Vec<(Document, f32)> = inner
            .documents
            .values()
            .filter(|doc| Self::matches_filter(doc, filter))
            .filter_map(|doc| {
                let embedding = doc.embedding.as_ref()?;
                let dist = cosine_distance(query_embedding, embedding);
                Some((doc.clone(), dist))
            })
            .collect();
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(Self::paginate(scored, page))
    }

    async fn text_search(
        &self,
        lexical_query: &str,
        filter: &DocumentFilter,
        page: Page,
    ) -> Result<Vec<(Document, f32)>> {
        let inner = self.inner.read().await;
        let terms: Vec<String> = lexical_query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();

        let mut scored: Vec<(Document, f32)> = inner
            .documents
            .values()
            .filter(|doc| Self::matches_filter(doc, filter))
            .filter_map(|doc| {
                let content_lower = doc.content.to_lowercase();
                let hits = terms.iter().filter(|t| content_lower.contains(t.as_str())).count();
                if hits == 0 {
                    None
                } else {
                    let rank = hits as f32 / terms.len().max(1) as f32;
                    Some((doc.clone(), rank))
                }
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(Self::paginate(scored, page))
    }
}

#[async_trait]
impl EventStore for InMemoryDocumentStore {
    async fn has_event(&self, event_id: &str) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner.processed_event_ids.contains(event_id) || inner.events.contains_key(event_id))
    }

    async fn mark_processed(&self, event_id: &str) -> Result<()> {
        self.inner.write().await.processed_event_ids.insert(event_id.to_string());
        Ok(())
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 1.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - (dot / (norm_a * norm_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_types::ContentType;

    fn sample_event(event_id: &str) -> NostrEventRecord {
        NostrEventRecord {
            event_id: event_id.to_string(),
            pubkey: "pk1".into(),
            kind: 1,
            event_created_at: Utc::now(),
            tags: vec![],
            document_id: Uuid::nil(),
            quality_score: 0.5,
            indexed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = InMemoryDocumentStore::new();
        let doc = Document::new("hello world".into(), "note", ContentType::Note);
        let id = store.upsert_event(doc, sample_event("e1")).await.unwrap();
        let fetched = store.get(id).await.unwrap().unwrap();
        assert_eq!(fetched.content, "hello world");
    }

    #[tokio::test]
    async fn reingesting_same_event_id_updates_quality_and_indexed_at_only() {
        let store = InMemoryDocumentStore::new();
        let original_created_at = Utc::now() - chrono::Duration::hours(1);
        let mut first_event = sample_event("dup");
        first_event.event_created_at = original_created_at;
        first_event.quality_score = 0.2;
        let doc = Document::new("hello".into(), "note", ContentType::Note);
        let first_id = store.upsert_event(doc.clone(), first_event).await.unwrap();

        let mut second_event = sample_event("dup");
        second_event.event_created_at = Utc::now();
        second_event.quality_score = 0.9;
        let second_id = store.upsert_event(doc, second_event).await.unwrap();

        assert_eq!(first_id, second_id, "re-ingestion reuses the same document");
        let stored_event = store.get_event("dup").await.unwrap().unwrap();
        assert_eq!(stored_event.quality_score, 0.9, "quality_score is updated");
        assert_eq!(
            stored_event.event_created_at, original_created_at,
            "event_created_at is never overwritten"
        );
    }

    #[tokio::test]
    async fn dedup_key_upserts_in_place() {
        let store = InMemoryDocumentStore::new();
        let mut doc = Document::new("v1".into(), "note", ContentType::Note);
        doc.source_id = Some("nostr".into());
        doc.external_id = Some("abc".into());
        let id1 = store.upsert_event(doc.clone(), sample_event("e1")).await.unwrap();

        let mut doc2 = Document::new("v2".into(), "note", ContentType::Note);
        doc2.source_id = Some("nostr".into());
        doc2.external_id = Some("abc".into());
        let id2 = store.upsert_event(doc2, sample_event("e2")).await.unwrap();

        assert_eq!(id1, id2);
        let fetched = store.get(id1).await.unwrap().unwrap();
        assert_eq!(fetched.content, "v2");
    }

    #[tokio::test]
    async fn text_search_ranks_by_term_overlap() {
        let store = InMemoryDocumentStore::new();
        store
            .upsert_event(Document::new("bitcoin halving explained".into(), "note", ContentType::Note), sample_event("e1"))
            .await
            .unwrap();
        store
            .upsert_event(Document::new("unrelated gardening tips".into(), "note", ContentType::Note), sample_event("e2"))
            .await
            .unwrap();

        let results = store
            .text_search("bitcoin halving", &DocumentFilter::default(), Page::default())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].0.content.contains("bitcoin"));
    }

    #[tokio::test]
    async fn event_store_tracks_processed_ids() {
        let store = InMemoryDocumentStore::new();
        assert!(!store.has_event("e1").await.unwrap());
        store.mark_processed("e1").await.unwrap();
        assert!(store.has_event("e1").await.unwrap());
    }
}
