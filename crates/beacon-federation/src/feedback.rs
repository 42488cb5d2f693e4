//! Feedback/Ingest, the fifth FRPEI operation: records a signal against
//! a candidate, normalizing the caller's `action` synonym
//! (`click|save|like|upvote` -> positive, `hide|downvote|dismiss` ->
//! negative) onto [`FeedbackSentiment`].

use beacon_events::{EventBus, FrpeiEvent};
use beacon_types::frpei::{FeedbackEntry, FeedbackSentiment};
use beacon_types::ports::FeedbackRepository;
use beacon_types::{BeaconError, Result};
use chrono::Utc;

/// Maps a free-form feedback action onto its normalized sentiment.
/// Unrecognized actions are rejected rather than silently defaulted to
/// neutral, since a caller typo should surface, not be absorbed.
pub fn sentiment_for_action(action: &str) -> Result<FeedbackSentiment> {
    match action.to_lowercase().as_str() {
        "click" | "save" | "like" | "upvote" | "positive" => Ok(FeedbackSentiment::Positive),
        "hide" | "downvote" | "dismiss" | "negative" => Ok(FeedbackSentiment::Negative),
        "neutral" | "view" => Ok(FeedbackSentiment::Neutral),
        other => Err(BeaconError::Custom(format!("unrecognized feedback action: {other}"))),
    }
}

pub struct FeedbackRequest {
    pub candidate_id: String,
    pub request_id: Option<String>,
    pub provider: Option<String>,
    pub action: String,
    pub rating: Option<f32>,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

pub async fn record_feedback(
    request: FeedbackRequest,
    repository: &dyn FeedbackRepository,
    events: &EventBus,
) -> Result<()> {
    let sentiment = sentiment_for_action(&request.action)?;
    let entry = FeedbackEntry {
        candidate_id: request.candidate_id.clone(),
        request_id: request.request_id,
        provider: request.provider,
        feedback: sentiment,
        rating: request.rating,
        notes: request.notes,
        metadata: request.metadata,
        created_at: Utc::now(),
    };
    repository.record(entry).await?;
    events.publish(FrpeiEvent::FeedbackRecorded {
        candidate_id: request.candidate_id,
        sentiment: format!("{sentiment:?}").to_lowercase(),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_persistence::InMemoryFeedbackStore;

    #[test]
    fn maps_known_action_synonyms() {
        assert_eq!(sentiment_for_action("upvote").unwrap(), FeedbackSentiment::Positive);
        assert_eq!(sentiment_for_action("DISMISS").unwrap(), FeedbackSentiment::Negative);
    }

    #[test]
    fn rejects_unknown_action() {
        assert!(sentiment_for_action("teleport").is_err());
    }

    #[tokio::test]
    async fn record_feedback_persists_and_publishes_event() {
        let store = InMemoryFeedbackStore::new();
        let events = EventBus::new();
        let mut rx = events.subscribe();

        record_feedback(
            FeedbackRequest {
                candidate_id: "c1".into(),
                request_id: None,
                provider: None,
                action: "like".into(),
                rating: None,
                notes: None,
                metadata: None,
            },
            &store,
            &events,
        )
        .await
        .unwrap();

        assert!(store.boost_for("c1").await.unwrap() > 0.0);
        let received = rx.recv().await.unwrap();
        assert!(matches!(received.event, beacon_events::BeaconEvent::Frpei(_)));
    }
}
