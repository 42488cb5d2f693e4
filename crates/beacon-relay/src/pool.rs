//! Relay Pool Manager: `Discover`, `Fetch`, `SelectRelays` over a
//! `url -> RelayConfig` map, backed by the rate limiter, circuit breaker,
//! and reliable HTTP client from `beacon-reliability`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use beacon_config::RelayPoolConfig;
use beacon_events::{EventBus, RelayEvent};
use beacon_reliability::{
    CircuitBreaker, CircuitBreakerConfig, FetchOptions, HttpConfig, ReliableHttpClient, TokenBucketRateLimiter,
};
use beacon_types::relay::RelayConfig;
use beacon_types::{BeaconError, NostrEvent, NostrFilter, Result};
use dashmap::DashMap;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::ws::{RelayWireClient, WebsocketWireClient};

/// Capabilities learned via a relay's NIP-11 document.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Capabilities {
    pub limitation: Option<RelayLimitation>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RelayLimitation {
    pub max_subscriptions: Option<u32>,
    pub max_filters: Option<u32>,
    pub auth_required: Option<bool>,
}

struct PooledRelay {
    config: RwLock<RelayConfig>,
    breaker: Arc<CircuitBreaker>,
}

/// Maintains `url -> RelayConfig` and the machinery to discover, fetch
/// from, and rank relays.
pub struct RelayPoolManager {
    relays: DashMap<String, Arc<PooledRelay>>,
    rate_limiter: Arc<TokenBucketRateLimiter>,
    http: ReliableHttpClient,
    events: EventBus,
    pool_config: RelayPoolConfig,
    wire_client: Arc<dyn RelayWireClient>,
}

impl RelayPoolManager {
    pub fn new(pool_config: RelayPoolConfig, events: EventBus) -> Result<Self> {
        Self::with_wire_client(pool_config, events, Arc::new(WebsocketWireClient))
    }

    /// Used by tests to swap in a wire client that never touches the
    /// network; production code always goes through [`Self::new`].
    pub fn with_wire_client(
        pool_config: RelayPoolConfig,
        events: EventBus,
        wire_client: Arc<dyn RelayWireClient>,
    ) -> Result<Self> {
        let rate_limiter = Arc::new(TokenBucketRateLimiter::new(
            pool_config.default_max_events_per_second,
            pool_config.default_burst_size,
            pool_config.default_cooldown_ms,
        ));
        let http = ReliableHttpClient::new("relay-pool", HttpConfig::default())?;
        Ok(Self {
            relays: DashMap::new(),
            rate_limiter,
            http,
            events,
            pool_config,
            wire_client,
        })
    }

    /// Registers a relay URL with pool defaults if it isn't already known.
    /// Idempotent: a relay already in the pool is left untouched.
    pub fn register(&self, url: &str) {
        if self.relays.contains_key(url) {
            return;
        }
        let config = RelayConfig::new(
            url,
            self.pool_config.default_max_events_per_second,
            self.pool_config.default_burst_size,
            self.pool_config.default_cooldown_ms,
        );
        let breaker = CircuitBreaker::new(url.to_string(), CircuitBreakerConfig::default());
        self.relays.insert(
            url.to_string(),
            Arc::new(PooledRelay {
                config: RwLock::new(config),
                breaker,
            }),
        );
        self.events.publish(RelayEvent::Discovered {
            url: url.to_string(),
            source: "pool_register".into(),
        });
    }

    pub fn is_registered(&self, url: &str) -> bool {
        self.relays.contains_key(url)
    }

    /// `Discover(url) -> Capabilities`: HTTP GET replacing `wss://` with
    /// `https://`. Failure increments the relay's failure count but never
    /// removes it from the pool.
    #[instrument(skip(self))]
    pub async fn discover(&self, url: &str) -> Result<Capabilities> {
        self.register(url);
        let http_url = url.replacen("wss://", "https://", 1).replacen("ws://", "http://", 1);

        let entry = self.relays.get(url).expect("just registered").clone();
        let response = self
            .http
            .get(&http_url, FetchOptions::default().add_header("Accept", "application/nostr+json"))
            .await;

        match response {
            Ok(resp) => match resp.json::<Capabilities>().await {
                Ok(caps) => {
                    let mut config = entry.config.write().await;
                    if let Some(limitation) = &caps.limitation {
                        if let Some(auth) = limitation.auth_required {
                            config.require_auth = auth;
                        }
                        if let Some(max_filters) = limitation.max_filters {
                            config.max_filter_size = max_filters;
                        }
                    }
                    config.health.record_success(0.0, Instant::now());
                    self.events.publish(RelayEvent::Connected { url: url.to_string() });
                    Ok(caps)
                }
                Err(e) => {
                    entry.config.write().await.health.record_failure();
                    Err(BeaconError::MalformedEvent(format!("invalid NIP-11 document from {url}: {e}")))
                }
            },
            Err(e) => {
                entry.config.write().await.health.record_failure();
                self.events.publish(RelayEvent::Disconnected {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// `SelectRelays(k)`: rank by composite health score ascending, return
    /// the top `k` URLs.
    pub async fn select_relays(&self, k: usize) -> Vec<String> {
        let mut scored = Vec::with_capacity(self.relays.len());
        for entry in self.relays.iter() {
            let score = entry.value().config.read().await.health.score();
            scored.push((entry.key().clone(), score));
        }
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().take(k).map(|(url, _)| url).collect()
    }

    /// `Fetch(relays, filter, batch_size) -> events`: rate-limits per
    /// relay, issues the filtered fetch capped at `min(batch_size,
    /// burst_size)`, and deduplicates returned events by id across relays.
    pub async fn fetch(
        &self,
        relays: &[String],
        filter: &NostrFilter,
        batch_size: u32,
    ) -> Result<Vec<NostrEvent>> {
        let mut all_events = HashMap::new();

        for url in relays {
            let slept = self.rate_limiter.acquire(url).await;
            if let Some(signal) = beacon_reliability::as_rate_limit_signal(slept) {
                self.events.record_error(&signal);
                self.events.publish(RelayEvent::RateLimited {
                    url: url.clone(),
                    slept_ms: slept.as_millis() as u64,
                });
            }

            let Some(entry) = self.relays.get(url) else { continue };
            if !entry.breaker.allow_request() {
                continue;
            }

            let burst_size = entry.config.read().await.burst_size;
            let capped_batch = batch_size.min(burst_size);

            let started = Instant::now();
            match self.fetch_from_relay(url, filter, capped_batch).await {
                Ok(events) => {
                    entry.breaker.record_success();
                    let latency_ms = started.elapsed().as_millis() as f64;
                    entry.config.write().await.health.record_success(latency_ms, Instant::now());
                    self.rate_limiter.record_success(url, latency_ms).await;
                    for event in events {
                        all_events.entry(event.id.clone()).or_insert(event);
                    }
                }
                Err(e) => {
                    entry.breaker.record_failure();
                    entry.config.write().await.health.record_failure();
                    self.rate_limiter.record_failure(url).await;
                    self.events.record_error(&e);
                }
            }
        }

        Ok(all_events.into_values().collect())
    }

    /// Issues a NIP-01 `REQ` over a short-lived websocket to `url` and
    /// collects events until `EOSE`, `batch_size`, or the configured
    /// timeout, whichever comes first. Delegates to the injected
    /// [`RelayWireClient`] so tests can exercise `fetch`'s rate-limit/
    /// breaker/dedup bookkeeping without a live relay socket.
    async fn fetch_from_relay(&self, url: &str, filter: &NostrFilter, batch_size: u32) -> Result<Vec<NostrEvent>> {
        self.wire_client
            .fetch(url, filter, batch_size, self.pool_config.fetch_timeout_ms)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use beacon_config::RelayPoolConfig;

    /// Hands back the same canned event regardless of `url`, so a fetch
    /// across two relays is a dedup test rather than a network call.
    struct StubWireClient {
        event: NostrEvent,
    }

    #[async_trait]
    impl RelayWireClient for StubWireClient {
        async fn fetch(&self, _url: &str, _filter: &NostrFilter, _batch_size: u32, _timeout_ms: u64) -> Result<Vec<NostrEvent>> {
            Ok(vec![self.event.clone()])
        }
    }

    fn test_pool() -> RelayPoolManager {
        RelayPoolManager::new(RelayPoolConfig::default(), EventBus::new()).unwrap()
    }

    fn stub_event(id: &str) -> NostrEvent {
        NostrEvent {
            id: id.to_string(),
            pubkey: "p".into(),
            created_at: 1000,
            kind: 1,
            tags: vec![],
            content: "hello nostr".into(),
            sig: "s".into(),
        }
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let pool = test_pool();
        pool.register("wss://relay.example");
        pool.register("wss://relay.example");
        assert_eq!(pool.relays.len(), 1);
    }

    #[tokio::test]
    async fn select_relays_ranks_by_health_score_ascending() {
        let pool = test_pool();
        pool.register("wss://slow.example");
        pool.register("wss://fast.example");

        {
            let entry = pool.relays.get("wss://slow.example").unwrap();
            entry.config.write().await.health.record_failure();
            entry.config.write().await.health.record_failure();
            entry.config.write().await.health.record_failure();
            entry.config.write().await.health.record_failure();
        }

        let ranked = pool.select_relays(2).await;
        assert_eq!(ranked[0], "wss://fast.example");
    }

    #[tokio::test]
    async fn fetch_deduplicates_events_across_relays() {
        let pool = RelayPoolManager::with_wire_client(
            RelayPoolConfig::default(),
            EventBus::new(),
            Arc::new(StubWireClient { event: stub_event("a1") }),
        )
        .unwrap();
        pool.register("wss://a.example");
        pool.register("wss://b.example");

        let filter = NostrFilter::default();
        let events = pool
            .fetch(&["wss://a.example".to_string(), "wss://b.example".to_string()], &filter, 500)
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "a1");
    }
}
