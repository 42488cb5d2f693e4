//! FRPEI configuration (§4.F): cache TTL, circuit breaker thresholds,
//! provider timeouts, and ranking weights.

use crate::env::EnvLoader;
use beacon_types::Result;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub reset_timeout_ms: u64,
}

impl BreakerConfig {
    pub fn from_env() -> Result<Self> {
        let env = EnvLoader::new("BEACON_FRPEI_BREAKER_");
        Ok(Self {
            failure_threshold: env.get_u32("FAILURE_THRESHOLD", 3)?,
            success_threshold: env.get_u32("SUCCESS_THRESHOLD", 2)?,
            reset_timeout_ms: env.get_u64("RESET_TIMEOUT_MS", 30_000)?,
        })
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 2,
            reset_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrpeiConfig {
    pub cache_ttl: Duration,
    pub default_request_timeout_ms: u64,
    pub default_provider_timeout_ms: u64,
    pub default_providers: Vec<String>,
    pub breaker: BreakerConfig,
}

impl FrpeiConfig {
    pub fn from_env() -> Result<Self> {
        let env = EnvLoader::new("BEACON_FRPEI_");
        Ok(Self {
            cache_ttl: Duration::from_secs(env.get_u64("CACHE_TTL_SECS", 300)?),
            default_request_timeout_ms: env.get_u64("REQUEST_TIMEOUT_MS", 2_000)?,
            default_provider_timeout_ms: env.get_u64("PROVIDER_TIMEOUT_MS", 1_500)?,
            default_providers: env.get_list("DEFAULT_PROVIDERS", &["local", "web", "media"]),
            breaker: BreakerConfig::from_env()?,
        })
    }
}

impl Default for FrpeiConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            default_request_timeout_ms: 2_000,
            default_provider_timeout_ms: 1_500,
            default_providers: vec!["local".into(), "web".into(), "media".into()],
            breaker: BreakerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_breaker_thresholds() {
        let cfg = FrpeiConfig::default();
        assert_eq!(cfg.breaker.failure_threshold, 3);
        assert_eq!(cfg.breaker.success_threshold, 2);
        assert_eq!(cfg.cache_ttl, Duration::from_secs(300));
    }
}
