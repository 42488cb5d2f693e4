//! Query Engine configuration (§4.E): rewriting budgets and facet caps.

use crate::env::EnvLoader;
use beacon_types::Result;

#[derive(Debug, Clone)]
pub struct QueryRewriteConfig {
    pub expand: bool,
    pub enable_fuzzy: bool,
    pub enable_abbrev: bool,
    pub max_expansions_per_term: usize,
    pub max_total_expansions: usize,
    pub max_fuzzy_matches: usize,
    pub fuzzy_max_distance: usize,
    pub vector_term_limit: usize,
}

impl QueryRewriteConfig {
    pub fn from_env() -> Result<Self> {
        let env = EnvLoader::new("BEACON_QUERY_");
        Ok(Self {
            expand: env.get_bool("EXPAND", true)?,
            enable_fuzzy: env.get_bool("ENABLE_FUZZY", true)?,
            enable_abbrev: env.get_bool("ENABLE_ABBREV", true)?,
            max_expansions_per_term: env.get_usize("MAX_EXPANSIONS_PER_TERM", 5)?,
            max_total_expansions: env.get_usize("MAX_TOTAL_EXPANSIONS", 32)?,
            max_fuzzy_matches: env.get_usize("MAX_FUZZY_MATCHES", 3)?,
            fuzzy_max_distance: env.get_usize("FUZZY_MAX_DISTANCE", 2)?,
            vector_term_limit: env.get_usize("VECTOR_TERM_LIMIT", 8)?,
        })
    }
}

impl Default for QueryRewriteConfig {
    fn default() -> Self {
        Self {
            expand: true,
            enable_fuzzy: true,
            enable_abbrev: true,
            max_expansions_per_term: 5,
            max_total_expansions: 32,
            max_fuzzy_matches: 3,
            fuzzy_max_distance: 2,
            vector_term_limit: 8,
        }
    }
}

/// Per-facet top-N caps: defaults to 30 tags, 30 authors, 20 entity
/// values per type.
#[derive(Debug, Clone)]
pub struct FacetConfig {
    pub tag_cap: usize,
    pub author_cap: usize,
    pub entity_cap: usize,
}

impl FacetConfig {
    pub fn from_env() -> Result<Self> {
        let env = EnvLoader::new("BEACON_FACET_");
        Ok(Self {
            tag_cap: env.get_usize("TAG_CAP", 30)?,
            author_cap: env.get_usize("AUTHOR_CAP", 30)?,
            entity_cap: env.get_usize("ENTITY_CAP", 20)?,
        })
    }
}

impl Default for FacetConfig {
    fn default() -> Self {
        Self {
            tag_cap: 30,
            author_cap: 30,
            entity_cap: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_facet_caps() {
        let cfg = FacetConfig::default();
        assert_eq!(cfg.tag_cap, 30);
        assert_eq!(cfg.author_cap, 30);
        assert_eq!(cfg.entity_cap, 20);
    }
}
