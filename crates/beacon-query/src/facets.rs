//! Facet computation: counts over tags, authors, content/document type,
//! sentiment, entity types, and date buckets,
//! each capped at a configured top-N.

use std::collections::HashMap;
use std::sync::Arc;

use beacon_config::FacetConfig;
use beacon_types::ports::{DocumentFilter, DocumentRepository, Page};
use beacon_types::{ContentType, Document, Result};
use chrono::Utc;

/// One facet's top-N value/count pairs, already capped and sorted
/// descending by count.
#[derive(Debug, Clone, Default)]
pub struct FacetBucket(pub Vec<(String, u64)>);

#[derive(Debug, Clone, Default)]
pub struct FacetCounts {
    pub tags: FacetBucket,
    pub authors: FacetBucket,
    pub content_types: FacetBucket,
    pub document_types: FacetBucket,
    pub sentiments: FacetBucket,
    pub entity_types: HashMap<String, FacetBucket>,
    pub date_buckets: FacetBucket,
}

/// The five fixed date buckets facets are always reported over.
const DATE_BUCKET_NAMES: [(&str, i64); 4] = [("24h", 1), ("7d", 7), ("30d", 30), ("90d", 90)];

pub struct FacetComputer<R> {
    repository: Arc<R>,
    config: FacetConfig,
}

impl<R> FacetComputer<R>
where
    R: DocumentRepository + Send + Sync + 'static,
{
    pub fn new(repository: Arc<R>, config: FacetConfig) -> Self {
        Self { repository, config }
    }

    /// Aggregates over every document matching `filter` (there is no
    /// facet-specific pagination — counts are always computed over the
    /// full matching set).
    pub async fn compute(&self, filter: &DocumentFilter) -> Result<FacetCounts> {
        let total = self.repository.count_documents(filter).await?;
        let page = Page {
            offset: 0,
            limit: total.min(u32::MAX as u64) as u32,
        };
        let documents = self.repository.search_documents(filter, page).await?;

        let mut tags: HashMap<String, u64> = HashMap::new();
        let mut authors: HashMap<String, u64> = HashMap::new();
        let mut content_types: HashMap<String, u64> = HashMap::new();
        let mut document_types: HashMap<String, u64> = HashMap::new();
        let mut sentiments: HashMap<String, u64> = HashMap::new();
        let mut entity_types: HashMap<String, HashMap<String, u64>> = HashMap::new();
        let mut date_buckets: HashMap<String, u64> = HashMap::new();
        date_buckets.insert("all".to_string(), 0);
        for (name, _) in DATE_BUCKET_NAMES {
            date_buckets.insert(name.to_string(), 0);
        }

        let now = Utc::now();
        for document in &documents {
            for tag in document_tags(document) {
                *tags.entry(tag).or_insert(0) += 1;
            }
            if let Some(author) = document_author(document) {
                *authors.entry(author).or_insert(0) += 1;
            }
            *content_types.entry(content_type_label(&document.content_type)).or_insert(0) += 1;
            *document_types.entry(document.document_type.clone()).or_insert(0) += 1;
            if let Some(sentiment) = document
                .attributes
                .get("metadata")
                .and_then(|m| m.get("sentiment"))
                .and_then(|s| s.as_str())
            {
                *sentiments.entry(sentiment.to_string()).or_insert(0) += 1;
            }
            for (entity_type, value) in document_entities(document) {
                *entity_types
                    .entry(entity_type)
                    .or_default()
                    .entry(value)
                    .or_insert(0) += 1;
            }

            *date_buckets.get_mut("all").unwrap() += 1;
            let age_days = (now - document.created_at).num_days();
            for (name, max_days) in DATE_BUCKET_NAMES {
                if age_days <= max_days {
                    *date_buckets.entry(name.to_string()).or_insert(0) += 1;
                }
            }
        }

        Ok(FacetCounts {
            tags: cap(tags, self.config.tag_cap),
            authors: cap(authors, self.config.author_cap),
            content_types: cap(content_types, usize::MAX),
            document_types: cap(document_types, usize::MAX),
            sentiments: cap(sentiments, usize::MAX),
            entity_types: entity_types
                .into_iter()
                .map(|(entity_type, counts)| (entity_type, cap(counts, self.config.entity_cap)))
                .collect(),
            date_buckets: cap(date_buckets, usize::MAX),
        })
    }
}

fn document_tags(document: &Document) -> Vec<String> {
    document
        .attributes
        .get("tags")
        .and_then(|t| t.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

fn document_author(document: &Document) -> Option<String> {
    document
        .attributes
        .get("nostr")
        .and_then(|n| n.get("pubkey"))
        .and_then(|p| p.as_str())
        .or_else(|| {
            document
                .attributes
                .get("metadata")
                .and_then(|m| m.get("author").or_else(|| m.get("detected_author")))
                .and_then(|a| a.as_str())
        })
        .map(str::to_string)
}

fn document_entities(document: &Document) -> Vec<(String, String)> {
    const ENTITY_TYPES: [&str; 3] = ["PERSON", "ORGANIZATION", "LOCATION"];
    let Some(entities) = document
        .attributes
        .get("metadata")
        .and_then(|m| m.get("entities"))
        .and_then(|e| e.as_object())
    else {
        return Vec::new();
    };
    ENTITY_TYPES
        .iter()
        .filter_map(|entity_type| entities.get(*entity_type).and_then(|v| v.as_array()).map(|v| (entity_type, v)))
        .flat_map(|(entity_type, values)| {
            values
                .iter()
                .filter_map(move |v| v.as_str().map(|s| (entity_type.to_string(), s.to_string())))
        })
        .collect()
}

fn content_type_label(content_type: &ContentType) -> String {
    match content_type {
        ContentType::Note => "note".to_string(),
        ContentType::Article => "article".to_string(),
        ContentType::PodcastEpisode => "podcast_episode".to_string(),
        ContentType::TvTranscriptChunk => "tv_transcript_chunk".to_string(),
        ContentType::Other(s) => s.clone(),
    }
}

fn cap(counts: HashMap<String, u64>, limit: usize) -> FacetBucket {
    let mut entries: Vec<(String, u64)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(limit);
    FacetBucket(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_persistence::InMemoryDocumentStore;
    use beacon_types::NostrEventRecord;
    use chrono::Utc;
    use serde_json::json;

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

    #[tokio::test]
    async fn computes_tag_and_author_counts() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let mut doc = Document::new("hello".into(), "note", ContentType::Note);
        doc.attributes = json!({"nostr": {"pubkey": "alice"}, "tags": ["bitcoin", "nostr"]});
        store.upsert_event(doc, sample_event("e1")).await.unwrap();

        let mut doc2 = Document::new("world".into(), "note", ContentType::Note);
        doc2.attributes = json!({"nostr": {"pubkey": "alice"}, "tags": ["bitcoin"]});
        store.upsert_event(doc2, sample_event("e2")).await.unwrap();

        let computer = FacetComputer::new(store, FacetConfig::default());
        let facets = computer.compute(&DocumentFilter::default()).await.unwrap();

        assert_eq!(facets.tags.0[0], ("bitcoin".to_string(), 2));
        assert_eq!(facets.authors.0[0], ("alice".to_string(), 2));
    }

    #[tokio::test]
    async fn date_bucket_all_counts_every_document() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store
            .upsert_event(Document::new("hello".into(), "note", ContentType::Note), sample_event("e1"))
            .await
            .unwrap();

        let computer = FacetComputer::new(store, FacetConfig::default());
        let facets = computer.compute(&DocumentFilter::default()).await.unwrap();
        let all_count = facets.date_buckets.0.iter().find(|(name, _)| name == "all").unwrap().1;
        assert_eq!(all_count, 1);
    }

    #[tokio::test]
    async fn tag_facet_is_capped() {
        let store = Arc::new(InMemoryDocumentStore::new());
        for i in 0..40 {
            let mut doc = Document::new(format!("doc {i}"), "note", ContentType::Note);
            doc.attributes = json!({"tags": [format!("tag{i}")]});
            store.upsert_event(doc, sample_event(&format!("e{i}"))).await.unwrap();
        }
        let computer = FacetComputer::new(store, FacetConfig::default());
        let facets = computer.compute(&DocumentFilter::default()).await.unwrap();
        assert_eq!(facets.tags.0.len(), 30);
    }
}
