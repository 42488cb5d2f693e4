//! Relay Pool Manager and Adaptive Crawler configuration (§4.A, §4.C).

use crate::env::EnvLoader;
use beacon_types::Result;

/// Defaults applied to a [`beacon_types::RelayConfig`] the first time a
/// relay is contacted, before NIP-11 discovery may override them.
#[derive(Debug, Clone)]
pub struct RelayPoolConfig {
    pub default_max_events_per_second: u32,
    pub default_burst_size: u32,
    pub default_cooldown_ms: u64,
    pub default_max_filter_size: u32,
    pub discovery_timeout_ms: u64,
    pub fetch_timeout_ms: u64,
}

impl RelayPoolConfig {
    pub fn from_env() -> Result<Self> {
        let env = EnvLoader::new("BEACON_RELAY_");
        Ok(Self {
            default_max_events_per_second: env.get_u32("MAX_EVENTS_PER_SECOND", 10)?,
            default_burst_size: env.get_u32("BURST_SIZE", 20)?,
            default_cooldown_ms: env.get_u64("COOLDOWN_MS", 100)?,
            default_max_filter_size: env.get_u32("MAX_FILTER_SIZE", 500)?,
            discovery_timeout_ms: env.get_u64("DISCOVERY_TIMEOUT_MS", 5_000)?,
            fetch_timeout_ms: env.get_u64("FETCH_TIMEOUT_MS", 10_000)?,
        })
    }
}

impl Default for RelayPoolConfig {
    fn default() -> Self {
        Self {
            default_max_events_per_second: 10,
            default_burst_size: 20,
            default_cooldown_ms: 100,
            default_max_filter_size: 500,
            discovery_timeout_ms: 5_000,
            fetch_timeout_ms: 10_000,
        }
    }
}

/// The priority list of Nostr event kinds the content crawl paginates over,
/// and the batch/cadence knobs for the two-phase crawl.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub content_kinds: Vec<u32>,
    pub batch_size: u32,
    pub schedule_interval_secs: u64,
}

impl CrawlerConfig {
    pub fn from_env() -> Result<Self> {
        let env = EnvLoader::new("BEACON_CRAWLER_");
        let kinds = env
            .get_list("CONTENT_KINDS", &["1", "30023", "30024", "30402", "30040", "1063", "30311"])
            .into_iter()
            .filter_map(|s| s.parse::<u32>().ok())
            .collect();
        Ok(Self {
            content_kinds: kinds,
            batch_size: env.get_u32("BATCH_SIZE", 500)?,
            schedule_interval_secs: env.get_u64("SCHEDULE_INTERVAL_SECS", 900)?,
        })
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            content_kinds: vec![1, 30023, 30024, 30402, 30040, 1063, 30311],
            batch_size: 500,
            schedule_interval_secs: 900,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_relay_pool_config_matches_spec_defaults() {
        let cfg = RelayPoolConfig::default();
        assert_eq!(cfg.default_max_filter_size, 500);
    }

    #[test]
    fn default_crawler_kinds_match_spec_priority_list() {
        let cfg = CrawlerConfig::default();
        assert_eq!(cfg.content_kinds, vec![1, 30023, 30024, 30402, 30040, 1063, 30311]);
        assert_eq!(cfg.batch_size, 500);
    }
}
