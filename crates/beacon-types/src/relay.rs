//! Runtime-only relay configuration and health tracking.
//!
//! `RelayConfig` is never persisted across restarts: it is initialized on
//! first contact via NIP-11 discovery and mutated by crawler successes and
//! failures for the lifetime of the process.

use std::collections::VecDeque;
use std::time::Instant;

/// Health bookkeeping the Relay Pool Manager maintains per relay.
#[derive(Debug, Clone)]
pub struct RelayHealth {
    pub last_success: Option<Instant>,
    pub failure_count: u32,
    pub ema_latency_ms: f64,
}

impl Default for RelayHealth {
    fn default() -> Self {
        Self {
            last_success: None,
            failure_count: 0,
            ema_latency_ms: 0.0,
        }
    }
}

impl RelayHealth {
    /// Composite health score used by `SelectRelays`: lower is better.
    pub fn score(&self) -> f64 {
        (self.failure_count as f64) * 1000.0 + self.ema_latency_ms
    }

    /// EMA update on a successful request: `ema <- 0.9*ema + 0.1*latency`.
    pub fn record_success(&mut self, latency_ms: f64, now: Instant) {
        self.last_success = Some(now);
        self.ema_latency_ms = 0.9 * self.ema_latency_ms + 0.1 * latency_ms;
    }

    pub fn record_failure(&mut self) {
        self.failure_count += 1;
    }

    /// Exponential backoff once `failure_count` exceeds 3:
    /// `min(cooldown_ms * 2^(failure_count-3), 60_000)`.
    pub fn backoff_ms(&self, cooldown_ms: u64) -> u64 {
        if self.failure_count <= 3 {
            return 0;
        }
        let exponent = self.failure_count - 3;
        let scaled = (cooldown_ms as u128) << exponent.min(32);
        scaled.min(60_000) as u64
    }
}

/// Per-relay runtime configuration, including the token-bucket rate limit
/// parameters and the rolling request-timestamp window.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub url: String,
    pub max_events_per_second: u32,
    pub burst_size: u32,
    pub cooldown_ms: u64,
    pub max_filter_size: u32,
    pub require_auth: bool,
    pub health: RelayHealth,
    pub recent_requests: VecDeque<Instant>,
}

impl RelayConfig {
    pub fn new(url: impl Into<String>, max_events_per_second: u32, burst_size: u32, cooldown_ms: u64) -> Self {
        Self {
            url: url.into(),
            max_events_per_second,
            burst_size,
            cooldown_ms,
            max_filter_size: 500,
            require_auth: false,
            health: RelayHealth::default(),
            recent_requests: VecDeque::new(),
        }
    }

    /// Drop timestamps older than one second from the rolling window.
    pub fn prune_window(&mut self, now: Instant) {
        while let Some(&front) = self.recent_requests.front() {
            if now.duration_since(front).as_millis() >= 1000 {
                self.recent_requests.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_zero_until_fourth_failure() {
        let mut health = RelayHealth::default();
        for _ in 0..3 {
            health.record_failure();
            assert_eq!(health.backoff_ms(100), 0);
        }
        health.record_failure();
        assert_eq!(health.backoff_ms(100), 200);
    }

    #[test]
    fn backoff_is_capped_at_60_seconds() {
        let mut health = RelayHealth::default();
        for _ in 0..20 {
            health.record_failure();
        }
        assert_eq!(health.backoff_ms(100), 60_000);
    }

    #[test]
    fn score_penalizes_failures_heavily() {
        let mut a = RelayHealth::default();
        a.ema_latency_ms = 900.0;
        let mut b = RelayHealth::default();
        b.record_failure();
        b.ema_latency_ms = 10.0;
        assert!(b.score() > a.score());
    }
}
