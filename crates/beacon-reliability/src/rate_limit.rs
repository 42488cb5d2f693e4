//! Token-bucket rate limiting against a per-key rolling one-second window.
//!
//! Deliberately hand-rolled rather than built on `governor`: the pool
//! manager needs to drive [`beacon_types::relay::RelayConfig`]'s own
//! `recent_requests`/EMA/backoff bookkeeping directly, and `governor`'s
//! API has no hook for that shared state.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use beacon_types::relay::RelayConfig;
use beacon_types::BeaconError;
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Per-key token-bucket limiter implementing [`beacon_types::ports::RateLimiter`].
///
/// Each key (a relay URL, a provider name) gets its own
/// [`RelayConfig`]-shaped bucket so the crawler's burst/cooldown
/// parameters can differ per relay.
pub struct TokenBucketRateLimiter {
    buckets: Mutex<HashMap<String, RelayConfig>>,
    default_max_events_per_second: u32,
    default_burst_size: u32,
    default_cooldown_ms: u64,
}

impl TokenBucketRateLimiter {
    pub fn new(default_max_events_per_second: u32, default_burst_size: u32, default_cooldown_ms: u64) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            default_max_events_per_second,
            default_burst_size,
            default_cooldown_ms,
        }
    }

    /// Seeds or overwrites the bucket for `key` with relay-specific
    /// parameters (used once NIP-11 discovery learns a relay's advertised
    /// limits).
    pub async fn configure(&self, key: &str, max_events_per_second: u32, burst_size: u32, cooldown_ms: u64) {
        let mut buckets = self.buckets.lock().await;
        buckets.insert(
            key.to_string(),
            RelayConfig::new(key, max_events_per_second, burst_size, cooldown_ms),
        );
    }

    /// Blocks until `key` may issue another request: if the rolling
    /// window is at `burst_size`, sleep `cooldown_ms` and
    /// proceed; else if it is at `max_events_per_second`, sleep out the
    /// oldest entry's remaining lifetime in the window. Exponential
    /// backoff from repeated failures is checked first and re-evaluated
    /// after every sleep. Returns the total time spent sleeping,
    /// `Duration::ZERO` if the request went straight through.
    pub async fn acquire(&self, key: &str) -> Duration {
        let mut total_slept = Duration::ZERO;
        loop {
            let now = Instant::now();
            let mut buckets = self.buckets.lock().await;
            let bucket = buckets.entry(key.to_string()).or_insert_with(|| {
                RelayConfig::new(
                    key,
                    self.default_max_events_per_second,
                    self.default_burst_size,
                    self.default_cooldown_ms,
                )
            });
            bucket.prune_window(now);

            let backoff_ms = bucket.health.backoff_ms(bucket.cooldown_ms);
            if backoff_ms > 0 {
                drop(buckets);
                sleep(Duration::from_millis(backoff_ms)).await;
                total_slept += Duration::from_millis(backoff_ms);
                continue;
            }

            if bucket.recent_requests.len() >= bucket.burst_size as usize {
                let cooldown_ms = bucket.cooldown_ms;
                drop(buckets);
                sleep(Duration::from_millis(cooldown_ms)).await;
                total_slept += Duration::from_millis(cooldown_ms);
                self.record_request(key).await;
                return total_slept;
            }

            if bucket.recent_requests.len() >= bucket.max_events_per_second as usize {
                let oldest = *bucket.recent_requests.front().expect("window at max_events_per_second is non-empty");
                let elapsed_ms = now.duration_since(oldest).as_millis() as u64;
                let wait_ms = 1000u64.saturating_sub(elapsed_ms);
                drop(buckets);
                if wait_ms > 0 {
                    sleep(Duration::from_millis(wait_ms)).await;
                    total_slept += Duration::from_millis(wait_ms);
                }
                self.record_request(key).await;
                return total_slept;
            }

            bucket.recent_requests.push_back(now);
            return total_slept;
        }
    }

    /// Re-prunes and records a fresh request timestamp for `key` after a
    /// sleep; used once `acquire` has slept out a burst or rate limit so
    /// the recorded time reflects when the request actually proceeded.
    async fn record_request(&self, key: &str) {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        if let Some(bucket) = buckets.get_mut(key) {
            bucket.prune_window(now);
            bucket.recent_requests.push_back(now);
        }
    }

    pub async fn record_success(&self, key: &str, latency_ms: f64) {
        let mut buckets = self.buckets.lock().await;
        if let Some(bucket) = buckets.get_mut(key) {
            bucket.health.record_success(latency_ms, Instant::now());
        }
    }

    pub async fn record_failure(&self, key: &str) {
        let mut buckets = self.buckets.lock().await;
        if let Some(bucket) = buckets.get_mut(key) {
            bucket.health.record_failure();
        }
    }
}

#[async_trait]
impl beacon_types::ports::RateLimiter for TokenBucketRateLimiter {
    async fn acquire(&self, key: &str) -> Duration {
        let slept = TokenBucketRateLimiter::acquire(self, key).await;
        if !slept.is_zero() {
            tracing::debug!(key, slept_ms = slept.as_millis() as u64, "rate limiter slept");
        }
        slept
    }
}

/// Converts a non-zero sleep into the signal-only
/// [`BeaconError::RateLimitExhausted`] for callers that want to count it
/// rather than silently absorb it.
pub fn as_rate_limit_signal(slept: Duration) -> Option<BeaconError> {
    if slept.is_zero() {
        None
    } else {
        Some(BeaconError::RateLimitExhausted(slept.as_millis() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_request_does_not_wait() {
        let limiter = TokenBucketRateLimiter::new(10, 20, 100);
        let slept = limiter.acquire("wss://relay.example").await;
        assert!(slept < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn as_rate_limit_signal_only_for_nonzero_sleep() {
        assert!(as_rate_limit_signal(Duration::ZERO).is_none());
        let signal = as_rate_limit_signal(Duration::from_millis(50)).unwrap();
        assert!(matches!(signal, BeaconError::RateLimitExhausted(50)));
    }

    #[tokio::test]
    async fn configure_seeds_relay_specific_bucket() {
        let limiter = TokenBucketRateLimiter::new(10, 20, 100);
        limiter.configure("wss://fast.example", 50, 100, 10).await;
        let buckets = limiter.buckets.lock().await;
        let bucket = buckets.get("wss://fast.example").unwrap();
        assert_eq!(bucket.max_events_per_second, 50);
    }

    /// max_events_per_second=5, burst_size=10, cooldown_ms=100. Firing
    /// 20 requests back-to-back, the 11th is the
    /// first to hit the burst_size branch (fixed cooldown_ms sleep); no
    /// request is ever dropped, and total wall time advances by at least
    /// cooldown_ms once burst is exhausted.
    #[tokio::test(start_paused = true)]
    async fn rate_limit_burst_then_cooldown() {
        let limiter = TokenBucketRateLimiter::new(5, 10, 100);
        let mut slept = Vec::new();
        for _ in 0..20 {
            slept.push(limiter.acquire("wss://relay.example").await);
        }

        assert_eq!(slept.len(), 20, "no request is lost");
        assert!(
            slept[10] >= Duration::from_millis(100),
            "11th request should sleep out at least cooldown_ms, got {:?}",
            slept[10]
        );
        let total: Duration = slept.iter().sum();
        assert!(total >= Duration::from_millis(100));
    }
}
