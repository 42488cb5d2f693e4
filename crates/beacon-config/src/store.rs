//! Storage and embedding backend configuration, sourced from environment
//! variables at process start.

use crate::env::EnvLoader;
use beacon_types::{BeaconError, Result};

/// Connection and dimensionality settings for the persistence and
/// embedding backends. `embedding_dimension` is fixed per deployment: all
/// stored vectors and query embeddings must agree on `D`.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub embedding_endpoint: Option<String>,
    pub embedding_dimension: usize,
    pub cache_url: Option<String>,
    pub pool_max_connections: u32,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self> {
        let env = EnvLoader::new("BEACON_STORE_");
        let database_url = env.get_opt_string("DATABASE_URL").ok_or_else(|| {
            BeaconError::Configuration("BEACON_STORE_DATABASE_URL is required".to_string())
        })?;
        Ok(Self {
            database_url,
            embedding_endpoint: env.get_opt_string("EMBEDDING_ENDPOINT"),
            embedding_dimension: env.get_usize("EMBEDDING_DIMENSION", 384)?,
            cache_url: env.get_opt_string("CACHE_URL"),
            pool_max_connections: env.get_u32("POOL_MAX_CONNECTIONS", 10)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn missing_database_url_is_a_configuration_error() {
        env::remove_var("BEACON_STORE_DATABASE_URL");
        let err = StoreConfig::from_env().unwrap_err();
        assert!(matches!(err, BeaconError::Configuration(_)));
    }

    #[test]
    fn reads_database_url_and_applies_dimension_default() {
        env::set_var("BEACON_STORE_DATABASE_URL", "postgres://localhost/beacon");
        let cfg = StoreConfig::from_env().unwrap();
        assert_eq!(cfg.database_url, "postgres://localhost/beacon");
        assert_eq!(cfg.embedding_dimension, 384);
        env::remove_var("BEACON_STORE_DATABASE_URL");
    }
}
