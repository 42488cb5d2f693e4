//! `FederationRouter`: the public face of FRPEI, composing Retrieve with
//! Canonicalize, Enrich, Rank, and Explain into the one `retrieve()` call
//! the API host uses.

use std::collections::HashMap;
use std::sync::Arc;

use beacon_types::frpei::FrpeiCandidate;
use beacon_types::ports::{DictionaryRepository, FeedbackRepository, OntologyRepository};
use beacon_types::Result;

use crate::canonicalize::canonicalize;
use crate::enrich::enrich;
use crate::rank::rank_candidates;
use crate::retrieve::{cache_key, RetrieveOutcome, RetrievePipeline, RetrieveRequest};

pub struct RetrieveResult {
    pub candidates: Vec<FrpeiCandidate>,
    pub failures: Vec<crate::retrieve::ProviderFailure>,
    pub cache_hit: bool,
    pub fell_back_to_local: bool,
}

pub struct FederationRouter {
    pipeline: RetrievePipeline,
    ontology: Arc<dyn OntologyRepository>,
    dictionary: Arc<dyn DictionaryRepository>,
    feedback: Arc<dyn FeedbackRepository>,
}

impl FederationRouter {
    pub fn new(
        pipeline: RetrievePipeline,
        ontology: Arc<dyn OntologyRepository>,
        dictionary: Arc<dyn DictionaryRepository>,
        feedback: Arc<dyn FeedbackRepository>,
    ) -> Self {
        Self {
            pipeline,
            ontology,
            dictionary,
            feedback,
        }
    }

    /// Caches the fully canonicalized/enriched/ranked result set, not the
    /// raw fan-out, so that issuing the same request twice with
    /// `enableCache=true` returns an identically ordered `results[]` on
    /// both calls instead of re-deriving a fresh (and differently
    /// ordered) ranking from a cached pre-rank set.
    pub async fn retrieve(&self, request: &RetrieveRequest) -> Result<RetrieveResult> {
        let provider_names = self.pipeline.resolve_providers(request);
        let key = cache_key(&request.query, request.limit, &request.mode, &provider_names, &request.types, request.expand);

        if request.enable_cache {
            if let Some(cached) = self.pipeline.cache().get(&key).await? {
                if let Ok(candidates) = serde_json::from_slice::<Vec<FrpeiCandidate>>(&cached) {
                    return Ok(RetrieveResult {
                        candidates,
                        failures: Vec::new(),
                        cache_hit: true,
                        fell_back_to_local: false,
                    });
                }
            }
        }

        let RetrieveOutcome {
            mut candidates,
            failures,
            cache_hit: _,
            fell_back_to_local,
        } = self.pipeline.retrieve(request).await?;

        for candidate in &mut candidates {
            candidate.canonical = canonicalize(candidate, self.ontology.as_ref()).await?;
        }
        for candidate in &mut candidates {
            enrich(candidate, self.ontology.as_ref(), self.dictionary.as_ref()).await?;
        }
        candidates = rank_candidates(candidates, self.feedback.as_ref()).await?;

        if request.enable_cache {
            if let Ok(serialized) = serde_json::to_vec(&candidates) {
                self.pipeline.cache().set(&key, serialized, self.pipeline.cache_ttl()).await?;
            }
        }

        Ok(RetrieveResult {
            candidates,
            failures,
            cache_hit: false,
            fell_back_to_local,
        })
    }

    /// Per-provider breaker state, for the `/status` surface.
    pub fn breaker_states(&self) -> Vec<(String, beacon_types::ports::CircuitState)> {
        self.pipeline.breaker_states()
    }
}

pub type ProviderRegistry = HashMap<String, Arc<dyn beacon_types::ports::SearchProvider>>;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use beacon_config::FrpeiConfig;
    use beacon_events::EventBus;
    use beacon_persistence::{InMemoryCache, InMemoryDictionaryStore, InMemoryFeedbackStore, InMemoryOntologyStore};
    use beacon_types::frpei::{CandidateSource, TrustTier};
    use beacon_types::ontology::OntologyConcept;
    use beacon_types::ports::SearchProvider;

    struct StubProvider(Vec<FrpeiCandidate>);

    #[async_trait]
    impl SearchProvider for StubProvider {
        async fn search(&self, _query: &str, _limit: u32, _expand: bool) -> Result<Vec<FrpeiCandidate>> {
            Ok(self.0.clone())
        }
        fn name(&self) -> &str {
            "local"
        }
        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn retrieve_canonicalizes_enriches_and_ranks() {
        let ontology = InMemoryOntologyStore::new();
        ontology.insert(OntologyConcept::new("Bitcoin")).await;

        let mut candidate = FrpeiCandidate::new(
            "c1",
            CandidateSource {
                provider: "local".into(),
                trust_tier: TrustTier::High,
            },
            "Bitcoin price surges",
        );
        candidate.signals.score = 0.8;

        let mut providers: ProviderRegistry = HashMap::new();
        providers.insert("local".into(), Arc::new(StubProvider(vec![candidate])));

        let pipeline = RetrievePipeline::new(providers, Arc::new(InMemoryCache::new()), FrpeiConfig::default(), EventBus::new());
        let router = FederationRouter::new(
            pipeline,
            Arc::new(ontology),
            Arc::new(InMemoryDictionaryStore::new()),
            Arc::new(InMemoryFeedbackStore::new()),
        );

        let result = router
            .retrieve(&RetrieveRequest {
                query: "bitcoin".into(),
                providers: Some(vec!["local".into()]),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(result.candidates.len(), 1);
        assert!(result.candidates[0].canonical.is_some());
        assert!(result.candidates[0].rank_score > 0.0);
    }

    /// Issuing the same Retrieve twice with `enableCache=true` must
    /// yield identical `results[]` — same order, same ids.
    #[tokio::test]
    async fn repeated_cached_retrieve_returns_identically_ordered_results() {
        let ontology = InMemoryOntologyStore::new();
        ontology.insert(OntologyConcept::new("Bitcoin")).await;

        let mut low = FrpeiCandidate::new(
            "low",
            CandidateSource {
                provider: "local".into(),
                trust_tier: TrustTier::High,
            },
            "gardening tips",
        );
        low.signals.score = 0.2;
        let mut high = FrpeiCandidate::new(
            "high",
            CandidateSource {
                provider: "local".into(),
                trust_tier: TrustTier::High,
            },
            "Bitcoin price surges",
        );
        high.signals.score = 0.9;

        let mut providers: ProviderRegistry = HashMap::new();
        providers.insert("local".into(), Arc::new(StubProvider(vec![low, high])));

        let pipeline = RetrievePipeline::new(providers, Arc::new(InMemoryCache::new()), FrpeiConfig::default(), EventBus::new());
        let router = FederationRouter::new(
            pipeline,
            Arc::new(ontology),
            Arc::new(InMemoryDictionaryStore::new()),
            Arc::new(InMemoryFeedbackStore::new()),
        );

        let request = RetrieveRequest {
            query: "bitcoin".into(),
            providers: Some(vec!["local".into()]),
            enable_cache: true,
            ..Default::default()
        };

        let first = router.retrieve(&request).await.unwrap();
        assert!(!first.cache_hit);
        let second = router.retrieve(&request).await.unwrap();
        assert!(second.cache_hit);

        let first_ids: Vec<&str> = first.candidates.iter().map(|c| c.candidate_id.as_str()).collect();
        let second_ids: Vec<&str> = second.candidates.iter().map(|c| c.candidate_id.as_str()).collect();
        assert_eq!(first_ids, second_ids);
        assert_eq!(first_ids[0], "high");
    }
}
