//! Enrichment: join a canonicalized candidate against the ontology's
//! aliases/related concepts/taxonomies and the dictionary's synonyms of
//! its preferred term.

use beacon_types::frpei::{Enrichment, FrpeiCandidate, Provenance};
use beacon_types::ports::{DictionaryRepository, OntologyRepository};
use beacon_types::Result;
use chrono::Utc;

pub async fn enrich(
    candidate: &mut FrpeiCandidate,
    ontology: &dyn OntologyRepository,
    dictionary: &dyn DictionaryRepository,
) -> Result<()> {
    let Some(canonical) = candidate.canonical.clone() else {
        return Ok(());
    };
    let Some(concept) = ontology.get(canonical.concept_id).await? else {
        return Ok(());
    };

    let related: Vec<String> = ontology
        .related(concept.id)
        .await?
        .into_iter()
        .map(|c| c.preferred_term)
        .collect();
    let taxonomies: Vec<String> = concept.taxonomies.iter().cloned().collect();

    let mut synonyms: Vec<String> = concept.synonyms.iter().cloned().collect();
    synonyms.extend(concept.aliases.iter().map(|a| a.alias.clone()));
    if let Some(entry) = dictionary.find(&concept.preferred_term).await? {
        synonyms.extend(entry.synonyms);
    }
    synonyms.sort();
    synonyms.dedup();

    candidate.enrichment = Some(Enrichment {
        synonyms,
        related,
        taxonomies,
        provenance: Provenance {
            sources: vec![candidate.source.provider.clone()],
            enriched_at: Utc::now(),
        },
        confidence: canonical.confidence,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_persistence::{InMemoryDictionaryStore, InMemoryOntologyStore};
    use beacon_types::frpei::{CandidateSource, CanonicalMatch, TrustTier};
    use beacon_types::ontology::{Alias, AliasKind, OntologyConcept, Relation, RelationKind};

    #[tokio::test]
    async fn enriches_candidate_with_related_concepts_and_synonyms() {
        let ontology = InMemoryOntologyStore::new();
        let dictionary = InMemoryDictionaryStore::new();

        let crypto = OntologyConcept::new("Cryptocurrency");
        let crypto_id = crypto.id;
        let mut bitcoin = OntologyConcept::new("Bitcoin");
        bitcoin.synonyms.insert("digital gold".into());
        bitcoin.aliases.push(Alias {
            alias: "btc".into(),
            kind: AliasKind::Abbrev,
            weight: 0.6,
        });
        bitcoin.relations.push(Relation {
            target_id: crypto_id,
            kind: RelationKind::Broader,
            weight: 0.4,
        });
        let bitcoin_id = bitcoin.id;
        ontology.insert(crypto).await;
        ontology.insert(bitcoin).await;

        let mut candidate = FrpeiCandidate::new(
            "c1",
            CandidateSource {
                provider: "web".into(),
                trust_tier: TrustTier::Low,
            },
            "Bitcoin news",
        );
        candidate.canonical = Some(CanonicalMatch {
            concept_id: bitcoin_id,
            preferred_term: "Bitcoin".into(),
            confidence: 0.9,
        });

        enrich(&mut candidate, &ontology, &dictionary).await.unwrap();
        let enrichment = candidate.enrichment.unwrap();
        assert!(enrichment.related.contains(&"Cryptocurrency".to_string()));
        assert!(enrichment.synonyms.contains(&"digital gold".to_string()));
        assert!(enrichment.synonyms.contains(&"btc".to_string()));
    }

    #[tokio::test]
    async fn no_canonical_match_leaves_enrichment_empty() {
        let ontology = InMemoryOntologyStore::new();
        let dictionary = InMemoryDictionaryStore::new();
        let mut candidate = FrpeiCandidate::new(
            "c1",
            CandidateSource {
                provider: "web".into(),
                trust_tier: TrustTier::Low,
            },
            "uncategorized",
        );
        enrich(&mut candidate, &ontology, &dictionary).await.unwrap();
        assert!(candidate.enrichment.is_none());
    }
}
