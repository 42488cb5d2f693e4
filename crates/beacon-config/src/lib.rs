//! Environment-variable configuration loading for every Beacon Search
//! component, mirroring the layered config-crate pattern used across the
//! workspace: one typed struct per concern, a `from_env()` constructor per
//! struct, and a single [`BeaconConfig`] that aggregates them for the API
//! binary.

pub mod env;
pub mod frpei;
pub mod ingest;
pub mod query;
pub mod relay;
pub mod store;

pub use env::EnvLoader;
pub use frpei::{BreakerConfig, FrpeiConfig};
pub use ingest::SpamFilterConfig;
pub use query::{FacetConfig, QueryRewriteConfig};
pub use relay::{CrawlerConfig, RelayPoolConfig};
pub use store::StoreConfig;

use beacon_types::Result;

/// Bundles every component's configuration, loaded once at process start.
#[derive(Debug, Clone)]
pub struct BeaconConfig {
    pub relay_pool: RelayPoolConfig,
    pub crawler: CrawlerConfig,
    pub spam_filter: SpamFilterConfig,
    pub query_rewrite: QueryRewriteConfig,
    pub facets: FacetConfig,
    pub frpei: FrpeiConfig,
    pub store: StoreConfig,
}

impl BeaconConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            relay_pool: RelayPoolConfig::from_env()?,
            crawler: CrawlerConfig::from_env()?,
            spam_filter: SpamFilterConfig::from_env()?,
            query_rewrite: QueryRewriteConfig::from_env()?,
            facets: FacetConfig::from_env()?,
            frpei: FrpeiConfig::from_env()?,
            store: StoreConfig::from_env()?,
        })
    }
}
