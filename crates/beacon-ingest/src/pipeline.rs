//! The Ingestion Pipeline: classify → extract → spam-filter → dedupe/index.
//! Implements [`beacon_relay::IngestSink`] so the Adaptive Crawler can
//! drive it directly without knowing anything about documents.

use std::sync::Arc;

use async_trait::async_trait;
use beacon_events::{EventBus, IngestEvent};
use beacon_relay::IngestSink;
use beacon_types::document::{ContentType, Document, NostrEventRecord};
use beacon_types::ports::{DocumentRepository, EventStore};
use beacon_types::{NostrEvent, Result};
use chrono::{TimeZone, Utc};
use serde_json::json;

use crate::classify::Classifier;
use crate::extract::{extractor_for, ExtractedContent};
use crate::spam::SpamFilter;

/// Ties classification, extraction, spam filtering, and indexing together
/// for one Nostr source. `source_id` tags every produced [`Document`] so
/// downstream dedup keys are scoped per ingestion source.
pub struct IngestionPipeline<R> {
    source_id: String,
    classifier: Classifier,
    spam_filter: SpamFilter,
    repository: Arc<R>,
    events: EventBus,
}

impl<R> IngestionPipeline<R>
where
    R: DocumentRepository + EventStore + Send + Sync + 'static,
{
    pub fn new(
        source_id: impl Into<String>,
        spam_filter: SpamFilter,
        repository: Arc<R>,
        events: EventBus,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            classifier: Classifier::new(),
            spam_filter,
            repository,
            events,
        }
    }

    /// Runs one event through the full pipeline. Returns `Ok(None)` for a
    /// silently dropped event (unclassified or spam-filtered) and
    /// `Ok(Some(document_id))` once indexed. Re-ingesting a previously
    /// seen `event_id` is not short-circuited: it runs the full pipeline
    /// again and lands on the same document via `upsert_event`'s
    /// conflict-by-`event_id` branch, updating `quality_score` and
    /// `indexed_at` without overwriting `event_created_at`.
    pub async fn ingest_event(&self, event: &NostrEvent) -> Result<Option<uuid::Uuid>> {
        let Some(rule) = self.classifier.classify(event.kind) else {
            self.events.publish(IngestEvent::Rejected {
                event_id: event.id.clone(),
                reason: "unclassified or below priority threshold".into(),
            });
            return Ok(None);
        };
        self.events.publish(IngestEvent::Classified {
            event_id: event.id.clone(),
            kind: event.kind,
        });

        let mut acc = ExtractedContent::default();
        for extractor_kind in &rule.extractors {
            extractor_for(*extractor_kind).extract(event, &mut acc);
        }

        let created_at = Utc
            .timestamp_opt(event.created_at, 0)
            .single()
            .unwrap_or_else(Utc::now);

        if let Some(reason) = self.spam_filter.check(&event.pubkey, &acc.body, created_at) {
            self.events.publish(IngestEvent::Rejected {
                event_id: event.id.clone(),
                reason: reason.to_string(),
            });
            self.repository.mark_processed(&event.id).await?;
            return Ok(None);
        }

        let content_type = content_type_for_category(rule.category);
        let mut document = Document::new(acc.body, rule.category, content_type);
        document.title = acc.title;
        document.source_id = Some(self.source_id.clone());
        document.external_id = Some(event.id.clone());
        document.created_at = created_at;
        document.attributes = json!({
            "nostr": {
                "event_id": event.id,
                "pubkey": event.pubkey,
                "kind": event.kind,
            },
            "tags": acc.tags,
            "metadata": acc.metadata,
        });

        let event_record = NostrEventRecord {
            event_id: event.id.clone(),
            pubkey: event.pubkey.clone(),
            kind: event.kind,
            event_created_at: created_at,
            tags: event.tags.clone(),
            document_id: document.id,
            quality_score: acc.quality_score,
            indexed_at: Utc::now(),
        };

        let document_type = document.document_type.clone();
        let document_id = self.repository.upsert_event(document, event_record).await?;
        self.events.publish(IngestEvent::Indexed {
            event_id: event.id.clone(),
            document_type,
        });

        Ok(Some(document_id))
    }
}

/// Maps a classifier category to the coarse [`ContentType`] carried on the
/// indexed document. Video and structured-publication categories don't map
/// to a dedicated variant yet, so they fall back to `Other(category)`.
fn content_type_for_category(category: &str) -> ContentType {
    match category {
        "note" | "repost" | "reaction" => ContentType::Note,
        "long_form_article" | "long_form_draft" | "classified_listing" => ContentType::Article,
        "live_event" => ContentType::PodcastEpisode,
        other => ContentType::Other(other.to_string()),
    }
}

#[async_trait]
impl<R> IngestSink for IngestionPipeline<R>
where
    R: DocumentRepository + EventStore + Send + Sync + 'static,
{
    async fn ingest_page(&self, events: &[NostrEvent]) -> Result<()> {
        for event in events {
            self.ingest_event(event).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_config::SpamFilterConfig;
    use beacon_persistence::InMemoryDocumentStore;

    fn event(kind: u32, content: &str) -> NostrEvent {
        NostrEvent {
            id: format!("evt-{kind}-{}", content.len()),
            pubkey: "pk1".into(),
            created_at: 1_700_000_000,
            kind,
            tags: vec![],
            content: content.into(),
            sig: String::new(),
        }
    }

    fn pipeline() -> IngestionPipeline<InMemoryDocumentStore> {
        IngestionPipeline::new(
            "nostr",
            SpamFilter::new(SpamFilterConfig::default()),
            Arc::new(InMemoryDocumentStore::new()),
            EventBus::new(),
        )
    }

    #[tokio::test]
    async fn indexes_a_well_formed_note() {
        let p = pipeline();
        let e = event(1, "a perfectly normal note about rust programming");
        let id = p.ingest_event(&e).await.unwrap();
        assert!(id.is_some());
    }

    #[tokio::test]
    async fn drops_ephemeral_kind_without_indexing() {
        let p = pipeline();
        let e = event(22222, "ephemeral content");
        assert_eq!(p.ingest_event(&e).await.unwrap(), None);
    }

    #[tokio::test]
    async fn drops_spammy_content() {
        let p = pipeline();
        let e = event(1, "x");
        assert_eq!(p.ingest_event(&e).await.unwrap(), None);
    }

    #[tokio::test]
    async fn reingesting_same_event_id_is_idempotent() {
        let p = pipeline();
        let e = event(1, "a perfectly normal note about rust programming");
        let first = p.ingest_event(&e).await.unwrap();
        assert!(first.is_some());
        let second = p.ingest_event(&e).await.unwrap();
        assert_eq!(second, first, "re-ingestion lands on the same document");
    }
}
