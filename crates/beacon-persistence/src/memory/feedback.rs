//! In-memory [`FeedbackRepository`]: an append-only feedback log plus a
//! recency-weighted boost aggregate consumed by FRPEI ranking.

use std::sync::Arc;

use async_trait::async_trait;
use beacon_types::frpei::{FeedbackEntry, FeedbackSentiment};
use beacon_types::ports::FeedbackRepository;
use beacon_types::Result;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::RwLock;

/// Ranking-boost upper bound.
const MAX_FEEDBACK_BOOST: f32 = 0.15;
/// Half-life, in days, of a feedback entry's contribution to the boost.
const RECENCY_HALF_LIFE_DAYS: f64 = 14.0;

#[derive(Default)]
pub struct InMemoryFeedbackStore {
    log: Arc<RwLock<Vec<FeedbackEntry>>>,
    by_candidate: DashMap<String, Vec<usize>>,
}

impl InMemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackRepository for InMemoryFeedbackStore {
    async fn record(&self, entry: FeedbackEntry) -> Result<()> {
        let mut log = self.log.write().await;
        let index = log.len();
        self.by_candidate
            .entry(entry.candidate_id.clone())
            .or_default()
            .push(index);
        log.push(entry);
        Ok(())
    }

    async fn boost_for(&self, candidate_id: &str) -> Result<f32> {
        let Some(indices) = self.by_candidate.get(candidate_id) else {
            return Ok(0.0);
        };
        let log = self.log.read().await;
        let now = Utc::now();

        let mut raw = 0.0f64;
        for &i in indices.iter() {
            let Some(entry) = log.get(i) else { continue };
            let sign = match entry.feedback {
                FeedbackSentiment::Positive => 1.0,
                FeedbackSentiment::Negative => -1.0,
                FeedbackSentiment::Neutral => 0.0,
            };
            let age_days = (now - entry.created_at).num_seconds().max(0) as f64 / 86_400.0;
            let decay = 0.5f64.powf(age_days / RECENCY_HALF_LIFE_DAYS);
            raw += sign * decay * 0.05;
        }

        Ok(raw.clamp(0.0, MAX_FEEDBACK_BOOST as f64) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_types::frpei::FeedbackEntry;

    fn entry(candidate_id: &str, sentiment: FeedbackSentiment) -> FeedbackEntry {
        FeedbackEntry {
            candidate_id: candidate_id.to_string(),
            request_id: None,
            provider: None,
            feedback: sentiment,
            rating: None,
            notes: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn unknown_candidate_has_zero_boost() {
        let store = InMemoryFeedbackStore::new();
        assert_eq!(store.boost_for("missing").await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn positive_feedback_increases_boost_within_bound() {
        let store = InMemoryFeedbackStore::new();
        for _ in 0..10 {
            store.record(entry("c1", FeedbackSentiment::Positive)).await.unwrap();
        }
        let boost = store.boost_for("c1").await.unwrap();
        assert!(boost > 0.0 && boost <= MAX_FEEDBACK_BOOST);
    }

    #[tokio::test]
    async fn negative_feedback_does_not_go_below_zero() {
        let store = InMemoryFeedbackStore::new();
        store.record(entry("c1", FeedbackSentiment::Negative)).await.unwrap();
        let boost = store.boost_for("c1").await.unwrap();
        assert_eq!(boost, 0.0);
    }
}
