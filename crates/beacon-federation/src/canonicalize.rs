//! Canonicalization: match a candidate's title and snippet against the
//! ontology and keep the single best-scoring concept.

use beacon_types::frpei::{CanonicalMatch, FrpeiCandidate};
use beacon_types::ontology::MatchedBy;
use beacon_types::ports::OntologyRepository;
use beacon_types::Result;
use beacon_utils::tokenize::{normalize_text, tokenize};

fn base_weight(matched_by: &MatchedBy) -> f32 {
    match matched_by {
        MatchedBy::PreferredTerm => 0.9,
        MatchedBy::Synonym => 0.75,
        MatchedBy::Alias(_) => 0.65,
    }
}

pub async fn canonicalize(
    candidate: &FrpeiCandidate,
    ontology: &dyn OntologyRepository,
) -> Result<Option<CanonicalMatch>> {
    let title_lower = candidate.title.to_lowercase();
    let combined = format!("{} {}", candidate.title, candidate.snippet.clone().unwrap_or_default());
    let normalized = normalize_text(&combined);
    let tokens = tokenize(&normalized);

    let mut best: Option<CanonicalMatch> = None;
    for token in &tokens {
        for concept in ontology.find_by_term(token).await? {
            let Some(matched_by) = concept.matches(token) else {
                continue;
            };
            let alias_weight = match &matched_by {
                MatchedBy::Alias(_) => concept
                    .aliases
                    .iter()
                    .find(|a| a.alias.to_lowercase() == *token)
                    .map(|a| a.weight)
                    .unwrap_or(1.0),
                _ => 1.0,
            };
            let title_bonus = if title_lower.contains(token.as_str()) { 0.05 } else { 0.0 };
            let confidence = (base_weight(&matched_by) * alias_weight + title_bonus).min(1.0);

            if best.as_ref().map_or(true, |b| confidence > b.confidence) {
                best = Some(CanonicalMatch {
                    concept_id: concept.id,
                    preferred_term: concept.preferred_term.clone(),
                    confidence,
                });
            }
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_persistence::InMemoryOntologyStore;
    use beacon_types::frpei::{CandidateSource, TrustTier};
    use beacon_types::ontology::OntologyConcept;

    #[tokio::test]
    async fn matches_preferred_term_in_title_with_bonus() {
        let ontology = InMemoryOntologyStore::new();
        ontology.insert(OntologyConcept::new("Bitcoin")).await;

        let candidate = FrpeiCandidate::new(
            "c1",
            CandidateSource {
                provider: "web".into(),
                trust_tier: TrustTier::Low,
            },
            "Bitcoin price today",
        );

        let canonical = canonicalize(&candidate, &ontology).await.unwrap().unwrap();
        assert_eq!(canonical.preferred_term, "Bitcoin");
        assert!((canonical.confidence - 0.95).abs() < 0.001);
    }

    #[tokio::test]
    async fn no_match_returns_none() {
        let ontology = InMemoryOntologyStore::new();
        let candidate = FrpeiCandidate::new(
            "c1",
            CandidateSource {
                provider: "web".into(),
                trust_tier: TrustTier::Low,
            },
            "unrelated gardening tips",
        );
        assert!(canonicalize(&candidate, &ontology).await.unwrap().is_none());
    }
}
