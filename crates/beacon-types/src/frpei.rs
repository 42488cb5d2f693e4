//! Data shapes produced by the Federated Router (FRPEI): candidates,
//! canonicalization matches, enrichment records, signal bundles, and the
//! always-produced ranking explanation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse provider-quality prior used as a tie-break and ranking input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustTier {
    High,
    Medium,
    Low,
}

impl TrustTier {
    /// Default provider weight used in the ranking step (§4.F step 9).
    pub fn provider_weight(self) -> f32 {
        match self {
            TrustTier::High => 0.95,
            TrustTier::Medium => 0.85,
            TrustTier::Low => 0.6,
        }
    }
}

/// Where a candidate came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSource {
    pub provider: String,
    pub trust_tier: TrustTier,
}

/// Raw per-candidate scoring inputs a provider supplies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Signals {
    pub score: f32,
    pub rank: Option<u32>,
    pub domain: Option<String>,
    pub freshness_days: Option<u32>,
}

/// Result of canonicalizing a candidate's title/snippet against the
/// ontology: the best-scoring concept match, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalMatch {
    pub concept_id: Uuid,
    pub preferred_term: String,
    pub confidence: f32,
}

/// Provenance attached to an enrichment record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub sources: Vec<String>,
    pub enriched_at: DateTime<Utc>,
}

/// The enrichment joined onto a candidate once it has a canonical concept:
/// synonyms, related concepts, and taxonomy memberships.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrichment {
    pub synonyms: Vec<String>,
    pub related: Vec<String>,
    pub taxonomies: Vec<String>,
    pub provenance: Provenance,
    pub confidence: f32,
}

/// A single line of the human-readable ranking breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplanationNote {
    pub note: String,
}

/// The full breakdown of a candidate's `rank_score`. Always produced by
/// the Rank step; surfaced to callers only when `explain=true`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Explanation {
    pub base_score: f32,
    pub provider_weight: f32,
    pub canonical_boost: f32,
    pub freshness_boost: f32,
    pub feedback_boost: f32,
    pub total_score: f32,
    pub notes: Vec<String>,
}

impl Explanation {
    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }
}

/// A single result from a federated provider, as it flows through
/// Retrieve -> Canonicalize -> Enrich -> Rank -> Explain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrpeiCandidate {
    pub candidate_id: String,
    pub source: CandidateSource,
    pub title: String,
    pub url: Option<String>,
    pub normalized_url: Option<String>,
    pub snippet: Option<String>,
    pub content_type: String,
    pub signals: Signals,
    pub canonical: Option<CanonicalMatch>,
    pub enrichment: Option<Enrichment>,
    pub rank_score: f32,
    pub explanation: Explanation,
}

/// Normalized feedback sentiment. `action` synonyms (`click|save|like|upvote`,
/// `hide|downvote|dismiss`) are mapped onto these three values before
/// storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSentiment {
    Positive,
    Negative,
    Neutral,
}

/// One append-only row in the `frpei_feedback` log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub candidate_id: String,
    pub request_id: Option<String>,
    pub provider: Option<String>,
    pub feedback: FeedbackSentiment,
    pub rating: Option<f32>,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl FrpeiCandidate {
    pub fn new(candidate_id: impl Into<String>, source: CandidateSource, title: impl Into<String>) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            source,
            title: title.into(),
            url: None,
            normalized_url: None,
            snippet: None,
            content_type: "unknown".into(),
            signals: Signals::default(),
            canonical: None,
            enrichment: None,
            rank_score: 0.0,
            explanation: Explanation::default(),
        }
    }

    /// Dedup grouping key: `normalized_url || url || lowercase(title)`.
    pub fn dedup_key(&self) -> String {
        self.normalized_url
            .clone()
            .or_else(|| self.url.clone())
            .unwrap_or_else(|| self.title.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_weights_match_spec() {
        assert_eq!(TrustTier::High.provider_weight(), 0.95);
        assert_eq!(TrustTier::Medium.provider_weight(), 0.85);
        assert_eq!(TrustTier::Low.provider_weight(), 0.6);
    }

    #[test]
    fn dedup_key_prefers_normalized_url() {
        let mut c = FrpeiCandidate::new(
            "c1",
            CandidateSource {
                provider: "web".into(),
                trust_tier: TrustTier::Low,
            },
            "Some Title",
        );
        assert_eq!(c.dedup_key(), "some title");
        c.url = Some("https://Example.com/A".into());
        assert_eq!(c.dedup_key(), "https://Example.com/A");
        c.normalized_url = Some("https://example.com/a".into());
        assert_eq!(c.dedup_key(), "https://example.com/a");
    }
}
