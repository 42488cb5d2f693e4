//! The canonical [`Document`] record and its co-terminal [`NostrEventRecord`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::BeaconError;

/// Coarse content classification carried on every indexed [`Document`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Note,
    Article,
    PodcastEpisode,
    TvTranscriptChunk,
    Other(String),
}

/// The canonical record produced by the Ingestion Pipeline or by FRPEI's
/// feedback loop.
///
/// Invariants:
/// - `(source_id, external_id)` is unique when both are present.
/// - `embedding`, if present, always has dimension `D` (checked on
///   construction via [`Document::with_embedding`] — there is no other way
///   to attach a non-null embedding).
/// - `content_type` is set for every document that has been indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub external_id: Option<String>,
    pub source_id: Option<String>,
    pub title: Option<String>,
    pub content: String,
    pub url: Option<Url>,
    pub document_type: String,
    pub content_type: ContentType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Free-form provenance, e.g. `{"nostr":{"event_id":..,"pubkey":..,"kind":..}}`.
    pub attributes: serde_json::Value,
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    /// Construct a new document with no embedding attached.
    pub fn new(
        content: String,
        document_type: impl Into<String>,
        content_type: ContentType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            external_id: None,
            source_id: None,
            title: None,
            content,
            url: None,
            document_type: document_type.into(),
            content_type,
            created_at: now,
            updated_at: now,
            attributes: serde_json::Value::Object(Default::default()),
            embedding: None,
        }
    }

    /// Attach an embedding, enforcing the `embedding.dim == D` invariant.
    pub fn with_embedding(mut self, embedding: Vec<f32>, expected_dim: usize) -> crate::Result<Self> {
        if embedding.len() != expected_dim {
            return Err(BeaconError::Fatal(format!(
                "embedding dimension mismatch: expected {expected_dim}, got {}",
                embedding.len()
            )));
        }
        self.embedding = Some(embedding);
        Ok(self)
    }

    /// Identity key used for upsert: `(source_id, external_id)` when both
    /// are present.
    pub fn dedup_key(&self) -> Option<(&str, &str)> {
        match (&self.source_id, &self.external_id) {
            (Some(s), Some(e)) => Some((s.as_str(), e.as_str())),
            _ => None,
        }
    }
}

/// A Nostr event as stored alongside the document it produced.
///
/// Lifetime is co-terminal with its [`Document`]: the pair is modeled as two
/// rows joined by `document_id`, and deleting the document cascades to the
/// event record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NostrEventRecord {
    /// Globally unique; hex32 in the wire format.
    pub event_id: String,
    pub pubkey: String,
    pub kind: u32,
    pub event_created_at: DateTime<Utc>,
    pub tags: Vec<Vec<String>>,
    pub document_id: Uuid,
    pub quality_score: f32,
    pub indexed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_requires_both_fields() {
        let mut doc = Document::new("hello".into(), "note", ContentType::Note);
        assert!(doc.dedup_key().is_none());
        doc.source_id = Some("nostr".into());
        assert!(doc.dedup_key().is_none());
        doc.external_id = Some("abc".into());
        assert_eq!(doc.dedup_key(), Some(("nostr", "abc")));
    }

    #[test]
    fn with_embedding_rejects_wrong_dimension() {
        let doc = Document::new("hello".into(), "note", ContentType::Note);
        let err = doc.with_embedding(vec![0.0, 1.0], 3).unwrap_err();
        assert!(matches!(err, BeaconError::Fatal(_)));
    }

    #[test]
    fn with_embedding_accepts_matching_dimension() {
        let doc = Document::new("hello".into(), "note", ContentType::Note);
        let doc = doc.with_embedding(vec![0.0, 1.0, 2.0], 3).unwrap();
        assert_eq!(doc.embedding.unwrap().len(), 3);
    }
}
