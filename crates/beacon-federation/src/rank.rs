//! Ranking and explanation:
//! `totalScore = baseScore * providerWeight + canonicalBoost + freshnessBoost + feedbackBoost`,
//! sorted descending. The breakdown is always computed; callers decide
//! whether to surface it (`explain=true`).

use beacon_types::frpei::FrpeiCandidate;
use beacon_types::ports::FeedbackRepository;
use beacon_types::Result;

const CANONICAL_BOOST_WEIGHT: f32 = 0.10;
const FRESHNESS_BOOST_WEIGHT: f32 = 0.08;
const FRESHNESS_WINDOW_DAYS: f32 = 30.0;

pub async fn rank_candidates(
    mut candidates: Vec<FrpeiCandidate>,
    feedback: &dyn FeedbackRepository,
) -> Result<Vec<FrpeiCandidate>> {
    for candidate in &mut candidates {
        let base_score = candidate.signals.score;
        let provider_weight = candidate.source.trust_tier.provider_weight();

        let canonical_boost = candidate
            .canonical
            .as_ref()
            .map(|c| CANONICAL_BOOST_WEIGHT * c.confidence)
            .unwrap_or(0.0);

        let freshness_boost = candidate
            .signals
            .freshness_days
            .filter(|&days| (days as f32) < FRESHNESS_WINDOW_DAYS)
            .map(|days| FRESHNESS_BOOST_WEIGHT * (1.0 - days as f32 / FRESHNESS_WINDOW_DAYS))
            .unwrap_or(0.0);

        let feedback_boost = feedback.boost_for(&candidate.candidate_id).await?;

        let total_score = base_score * provider_weight + canonical_boost + freshness_boost + feedback_boost;

        let mut explanation = beacon_types::frpei::Explanation {
            base_score,
            provider_weight,
            canonical_boost,
            freshness_boost,
            feedback_boost,
            total_score,
            notes: Vec::new(),
        };
        if let Some(canonical) = &candidate.canonical {
            explanation.push_note(format!("Matched ontology concept {}", canonical.preferred_term));
        }
        if freshness_boost > 0.0 {
            explanation.push_note("Freshness boost applied");
        }
        if feedback_boost > 0.0 {
            explanation.push_note("Positive feedback boost applied");
        } else if feedback_boost < 0.0 {
            explanation.push_note("Negative feedback penalty applied");
        }

        candidate.explanation = explanation;
        candidate.rank_score = total_score;
    }

    candidates.sort_by(|a, b| b.rank_score.partial_cmp(&a.rank_score).unwrap_or(std::cmp::Ordering::Equal));
    for (idx, candidate) in candidates.iter_mut().enumerate() {
        candidate.explanation.push_note(format!("Ranked #{}", idx + 1));
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_persistence::InMemoryFeedbackStore;
    use beacon_types::frpei::{CandidateSource, TrustTier};

    fn candidate(id: &str, score: f32, tier: TrustTier) -> FrpeiCandidate {
        let mut c = FrpeiCandidate::new(
            id,
            CandidateSource {
                provider: "x".into(),
                trust_tier: tier,
            },
            format!("title {id}"),
        );
        c.signals.score = score;
        c
    }

    #[tokio::test]
    async fn ranks_descending_by_total_score() {
        let feedback = InMemoryFeedbackStore::new();
        let candidates = vec![
            candidate("low", 0.5, TrustTier::Low),
            candidate("high", 0.9, TrustTier::High),
        ];
        let ranked = rank_candidates(candidates, &feedback).await.unwrap();
        assert_eq!(ranked[0].candidate_id, "high");
        assert!(ranked[0].rank_score > ranked[1].rank_score);
    }

    #[tokio::test]
    async fn freshness_boost_applies_only_within_window() {
        let feedback = InMemoryFeedbackStore::new();
        let mut fresh = candidate("fresh", 0.5, TrustTier::Low);
        fresh.signals.freshness_days = Some(1);
        let mut stale = candidate("stale", 0.5, TrustTier::Low);
        stale.signals.freshness_days = Some(60);

        let ranked = rank_candidates(vec![fresh, stale], &feedback).await.unwrap();
        let fresh_result = ranked.iter().find(|c| c.candidate_id == "fresh").unwrap();
        let stale_result = ranked.iter().find(|c| c.candidate_id == "stale").unwrap();
        assert!(fresh_result.explanation.freshness_boost > 0.0);
        assert_eq!(stale_result.explanation.freshness_boost, 0.0);
    }
}
