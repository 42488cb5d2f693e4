//! Typed environment-variable loading.
//!
//! The engine consumes configuration via environment variables only:
//! database URL, embedding endpoint, FRPEI cache TTL and thresholds,
//! breaker thresholds, rate-limit defaults. No CLI is part of the core.

use beacon_types::{BeaconError, Result};
use std::env;
use std::time::Duration;

/// Reads `BEACON_`-prefixed environment variables with defaults and type
/// conversion, converting failures into [`BeaconError::Configuration`].
#[derive(Debug, Clone, Default)]
pub struct EnvLoader {
    prefix: &'static str,
}

impl EnvLoader {
    pub fn new(prefix: &'static str) -> Self {
        Self { prefix }
    }

    fn var_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        env::var(self.var_name(key)).unwrap_or_else(|_| default.to_string())
    }

    pub fn get_opt_string(&self, key: &str) -> Option<String> {
        env::var(self.var_name(key)).ok()
    }

    pub fn get_u32(&self, key: &str, default: u32) -> Result<u32> {
        match env::var(self.var_name(key)) {
            Ok(v) => v.parse().map_err(|_| {
                BeaconError::Configuration(format!("{} must be a u32, got {v:?}", self.var_name(key)))
            }),
            Err(_) => Ok(default),
        }
    }

    pub fn get_u64(&self, key: &str, default: u64) -> Result<u64> {
        match env::var(self.var_name(key)) {
            Ok(v) => v.parse().map_err(|_| {
                BeaconError::Configuration(format!("{} must be a u64, got {v:?}", self.var_name(key)))
            }),
            Err(_) => Ok(default),
        }
    }

    pub fn get_usize(&self, key: &str, default: usize) -> Result<usize> {
        match env::var(self.var_name(key)) {
            Ok(v) => v.parse().map_err(|_| {
                BeaconError::Configuration(format!(
                    "{} must be a usize, got {v:?}",
                    self.var_name(key)
                ))
            }),
            Err(_) => Ok(default),
        }
    }

    pub fn get_f32(&self, key: &str, default: f32) -> Result<f32> {
        match env::var(self.var_name(key)) {
            Ok(v) => v.parse().map_err(|_| {
                BeaconError::Configuration(format!("{} must be a f32, got {v:?}", self.var_name(key)))
            }),
            Err(_) => Ok(default),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match env::var(self.var_name(key)) {
            Ok(v) => match v.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(BeaconError::Configuration(format!(
                    "{} must be a bool, got {v:?}",
                    self.var_name(key)
                ))),
            },
            Err(_) => Ok(default),
        }
    }

    pub fn get_duration_ms(&self, key: &str, default_ms: u64) -> Result<Duration> {
        Ok(Duration::from_millis(self.get_u64(key, default_ms)?))
    }

    pub fn get_list(&self, key: &str, default: &[&str]) -> Vec<String> {
        match env::var(self.var_name(key)) {
            Ok(v) => v.split(',').map(|s| s.trim().to_string()).collect(),
            Err(_) => default.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_when_unset() {
        let loader = EnvLoader::new("BEACON_TEST_ENV_");
        assert_eq!(loader.get_u32("MISSING_KEY", 42).unwrap(), 42);
    }

    #[test]
    fn reads_and_parses_set_variable() {
        env::set_var("BEACON_TEST_ENV_SOME_INT", "7");
        let loader = EnvLoader::new("BEACON_TEST_ENV_");
        assert_eq!(loader.get_u32("SOME_INT", 0).unwrap(), 7);
        env::remove_var("BEACON_TEST_ENV_SOME_INT");
    }

    #[test]
    fn invalid_value_is_a_configuration_error() {
        env::set_var("BEACON_TEST_ENV_BAD_INT", "not-a-number");
        let loader = EnvLoader::new("BEACON_TEST_ENV_");
        let err = loader.get_u32("BAD_INT", 0).unwrap_err();
        assert!(matches!(err, BeaconError::Configuration(_)));
        env::remove_var("BEACON_TEST_ENV_BAD_INT");
    }
}
