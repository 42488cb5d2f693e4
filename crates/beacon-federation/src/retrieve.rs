//! The Retrieve pipeline: resolve providers, fan out concurrently behind
//! per-provider circuit breakers, collect, fall back to `local`, and
//! dedupe. The cache lookup and canonicalize/enrich/rank/explain steps
//! are composed by
//! [`crate::router::FederationRouter`], which caches the fully processed
//! result rather than this pipeline's raw fan-out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use beacon_config::FrpeiConfig;
use beacon_events::{EventBus, FrpeiEvent};
use beacon_reliability::circuit_breaker::{guarded_call, CircuitBreaker, Config as BreakerConfig};
use beacon_types::frpei::FrpeiCandidate;
use beacon_types::ports::{CacheStorage, SearchProvider};
use beacon_types::Result;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct RetrieveRequest {
    pub query: String,
    pub limit: u32,
    pub providers: Option<Vec<String>>,
    pub mode: String,
    pub types: Option<Vec<String>>,
    pub enable_cache: bool,
    pub dedupe: bool,
    pub timeout_ms: Option<u64>,
    /// Forwarded to each provider's own query-understanding stage (the
    /// `local` provider's ontology-aware rewrite); also part of the
    /// retrieve cache key so a plain vs. expanded request never shares a
    /// cached result.
    pub expand: bool,
}

impl Default for RetrieveRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            limit: 20,
            providers: None,
            mode: "hybrid".into(),
            types: None,
            enable_cache: true,
            dedupe: true,
            timeout_ms: None,
            expand: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: String,
    pub duration_ms: u64,
    pub timed_out: bool,
}

pub struct RetrieveOutcome {
    pub candidates: Vec<FrpeiCandidate>,
    pub failures: Vec<ProviderFailure>,
    pub cache_hit: bool,
    pub fell_back_to_local: bool,
}

/// Cache key covering every input that changes the result set:
/// `(query, limit, mode, providers, types, expand)`.
pub fn cache_key(query: &str, limit: u32, mode: &str, providers: &[String], types: &Option<Vec<String>>, expand: bool) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hasher.update(limit.to_le_bytes());
    hasher.update(mode.as_bytes());
    for provider in providers {
        hasher.update(provider.as_bytes());
    }
    if let Some(types) = types {
        for t in types {
            hasher.update(t.as_bytes());
        }
    }
    hasher.update([expand as u8]);
    hex::encode(hasher.finalize())
}

/// Owns the provider registry, one circuit breaker per provider, and the
/// retrieve cache. Canonicalize/enrich/rank run on top of its output.
pub struct RetrievePipeline {
    providers: HashMap<String, Arc<dyn SearchProvider>>,
    breakers: HashMap<String, Arc<CircuitBreaker>>,
    cache: Arc<dyn CacheStorage>,
    config: FrpeiConfig,
    events: EventBus,
}

impl RetrievePipeline {
    pub fn new(
        providers: HashMap<String, Arc<dyn SearchProvider>>,
        cache: Arc<dyn CacheStorage>,
        config: FrpeiConfig,
        events: EventBus,
    ) -> Self {
        let breaker_cfg = BreakerConfig {
            failure_threshold: config.breaker.failure_threshold,
            success_threshold: config.breaker.success_threshold,
            reset_timeout_ms: config.breaker.reset_timeout_ms,
        };
        let breakers = providers
            .keys()
            .map(|name| (name.clone(), CircuitBreaker::new(name.clone(), breaker_cfg.clone())))
            .collect();
        Self {
            providers,
            breakers,
            cache,
            config,
            events,
        }
    }

    /// Steps 1-6 only: resolve providers, fan out, fall back, dedupe. Does
    /// not touch the cache — [`crate::router::FederationRouter`] owns the
    /// cache so it can key it to the *final* (canonicalized/enriched/
    /// ranked) result set instead of the raw fan-out, keeping repeated
    /// cached reads identically ordered to the first response.
    pub async fn retrieve(&self, request: &RetrieveRequest) -> Result<RetrieveOutcome> {
        let provider_names = self.resolve_providers(request);
        let request_id = uuid::Uuid::new_v4().to_string();

        self.events.publish(FrpeiEvent::RetrieveStarted {
            request_id: request_id.clone(),
            providers: provider_names.clone(),
        });

        let (mut candidates, mut failures) = self.fan_out(request, &provider_names, &request_id).await;

        let mut fell_back_to_local = false;
        if candidates.is_empty() && !provider_names.iter().any(|p| p == "local") {
            if let Some(local) = self.providers.get("local") {
                self.events.publish(FrpeiEvent::ProviderFallback {
                    request_id: request_id.clone(),
                });
                fell_back_to_local = true;
                match local.search(&request.query, request.limit, request.expand).await {
                    Ok(hits) => candidates.extend(hits),
                    Err(e) => failures.push(ProviderFailure {
                        provider: "local".into(),
                        error: e.to_string(),
                        duration_ms: 0,
                        timed_out: false,
                    }),
                }
            }
        }

        if let Some(types) = &request.types {
            candidates.retain(|c| types.iter().any(|t| t == &c.content_type));
        }

        if request.dedupe {
            candidates = dedupe_candidates(candidates);
        }

        Ok(RetrieveOutcome {
            candidates,
            failures,
            cache_hit: false,
            fell_back_to_local,
        })
    }

    pub fn cache(&self) -> &Arc<dyn CacheStorage> {
        &self.cache
    }

    pub fn cache_ttl(&self) -> Duration {
        self.config.cache_ttl
    }

    /// The actual provider set a request resolves to, after applying
    /// config defaults and dropping any name with no registered provider.
    /// Part of the cache key (§4.F step 2), so exposed for callers that
    /// cache the *final* (post-rank) result rather than this pipeline's
    /// raw fan-out.
    pub fn resolve_providers(&self, request: &RetrieveRequest) -> Vec<String> {
        let requested = request.providers.clone().unwrap_or_else(|| self.config.default_providers.clone());
        requested.into_iter().filter(|name| self.providers.contains_key(name)).collect()
    }

    /// Per-provider breaker state, for the `/status` surface.
    pub fn breaker_states(&self) -> Vec<(String, beacon_types::ports::CircuitState)> {
        self.breakers
            .iter()
            .map(|(name, breaker)| (name.clone(), beacon_types::ports::CircuitBreaker::state(breaker.as_ref())))
            .collect()
    }

    async fn fan_out(
        &self,
        request: &RetrieveRequest,
        provider_names: &[String],
        request_id: &str,
    ) -> (Vec<FrpeiCandidate>, Vec<ProviderFailure>) {
        let request_timeout = Duration::from_millis(request.timeout_ms.unwrap_or(self.config.default_request_timeout_ms));

        let futures = provider_names.iter().map(|name| {
            let provider = self.providers.get(name).cloned();
            let breaker = self.breakers.get(name).cloned();
            let query = request.query.clone();
            let limit = request.limit;
            let expand = request.expand;
            let name = name.clone();
            let timeout = request_timeout.min(Duration::from_millis(self.config.default_provider_timeout_ms));
            async move {
                let (Some(provider), Some(breaker)) = (provider, breaker) else {
                    return (name, Err(("provider not registered".to_string(), 0, false)));
                };
                let started = std::time::Instant::now();
                let outcome = tokio::time::timeout(
                    timeout,
                    guarded_call(&breaker, || async { provider.search(&query, limit, expand).await }),
                )
                .await;
                let elapsed = started.elapsed().as_millis() as u64;
                match outcome {
                    Ok(Ok(hits)) => (name, Ok(hits)),
                    Ok(Err(e)) => (name, Err((e.to_string(), elapsed, false))),
                    Err(_) => (name, Err(("provider timed out".to_string(), elapsed, true))),
                }
            }
        });

        let results = futures::future::join_all(futures).await;

        let mut candidates = Vec::new();
        let mut failures = Vec::new();
        for (name, outcome) in results {
            match outcome {
                Ok(hits) => candidates.extend(hits),
                Err((error, duration_ms, timed_out)) => {
                    self.events.publish(FrpeiEvent::ProviderFailed {
                        request_id: request_id.to_string(),
                        provider: name.clone(),
                        reason: error.clone(),
                    });
                    failures.push(ProviderFailure {
                        provider: name,
                        error,
                        duration_ms,
                        timed_out,
                    });
                }
            }
        }
        (candidates, failures)
    }
}

/// Keeps the highest-signal candidate per dedup key (`normalized_url ||
/// url || lowercase(title)`).
fn dedupe_candidates(candidates: Vec<FrpeiCandidate>) -> Vec<FrpeiCandidate> {
    let mut best: HashMap<String, FrpeiCandidate> = HashMap::new();
    for candidate in candidates {
        let key = candidate.dedup_key();
        best.entry(key)
            .and_modify(|existing| {
                if candidate.signals.score > existing.signals.score {
                    *existing = candidate.clone();
                }
            })
            .or_insert(candidate);
    }
    best.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use beacon_persistence::InMemoryCache;
    use beacon_types::frpei::{CandidateSource, TrustTier};

    struct StubProvider {
        name: &'static str,
        hits: Vec<FrpeiCandidate>,
    }

    #[async_trait]
    impl SearchProvider for StubProvider {
        async fn search(&self, _query: &str, _limit: u32, _expand: bool) -> Result<Vec<FrpeiCandidate>> {
            Ok(self.hits.clone())
        }
        fn name(&self) -> &str {
            self.name
        }
        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    fn candidate(id: &str) -> FrpeiCandidate {
        FrpeiCandidate::new(
            id,
            CandidateSource {
                provider: "local".into(),
                trust_tier: TrustTier::High,
            },
            format!("title {id}"),
        )
    }

    fn pipeline(providers: HashMap<String, Arc<dyn SearchProvider>>) -> RetrievePipeline {
        RetrievePipeline::new(providers, Arc::new(InMemoryCache::new()), FrpeiConfig::default(), EventBus::new())
    }

    #[tokio::test]
    async fn collects_candidates_from_all_providers() {
        let mut providers: HashMap<String, Arc<dyn SearchProvider>> = HashMap::new();
        providers.insert(
            "local".into(),
            Arc::new(StubProvider {
                name: "local",
                hits: vec![candidate("c1")],
            }),
        );
        let p = pipeline(providers);
        let outcome = p
            .retrieve(&RetrieveRequest {
                query: "bitcoin".into(),
                providers: Some(vec!["local".into()]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(outcome.candidates.len(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_local_when_all_providers_empty() {
        let mut providers: HashMap<String, Arc<dyn SearchProvider>> = HashMap::new();
        providers.insert(
            "web".into(),
            Arc::new(StubProvider {
                name: "web",
                hits: vec![],
            }),
        );
        providers.insert(
            "local".into(),
            Arc::new(StubProvider {
                name: "local",
                hits: vec![candidate("fallback")],
            }),
        );
        let p = pipeline(providers);
        let outcome = p
            .retrieve(&RetrieveRequest {
                query: "bitcoin".into(),
                providers: Some(vec!["web".into()]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(outcome.fell_back_to_local);
        assert_eq!(outcome.candidates.len(), 1);
    }

    #[test]
    fn dedupe_keeps_highest_signal_candidate() {
        let mut low = candidate("c1");
        low.signals.score = 0.2;
        low.url = Some("https://x.example".into());
        low.normalized_url = Some("https://x.example".into());
        let mut high = candidate("c2");
        high.signals.score = 0.9;
        high.url = Some("https://x.example".into());
        high.normalized_url = Some("https://x.example".into());

        let deduped = dedupe_candidates(vec![low, high]);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].candidate_id, "c2");
    }
}
