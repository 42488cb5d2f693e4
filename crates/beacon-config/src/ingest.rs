//! Ingestion Pipeline configuration (§4.D): spam-filter thresholds.
//!
//! Resolves the spec's Open Question ("spam-filter thresholds are
//! partially parameterized but partially hard-coded; treat all thresholds
//! as configuration") by sourcing every threshold from the environment.

use crate::env::EnvLoader;
use beacon_types::Result;

#[derive(Debug, Clone)]
pub struct SpamFilterConfig {
    /// Minimum content length (after stripping punctuation) to avoid the
    /// "too short" spam signal.
    pub min_content_length: usize,
    /// Maximum allowed ratio of the most frequent token's frequency to
    /// total token count.
    pub max_repetition_ratio: f32,
    /// Maximum allowed ratio of non-ASCII/emoji characters to total chars.
    pub max_non_ascii_ratio: f32,
    /// Maximum allowed ratio of URL characters to total text length.
    pub max_url_text_ratio: f32,
    /// Maximum posts per minute for a single pubkey before it is spam.
    pub max_posts_per_minute: u32,
}

impl SpamFilterConfig {
    pub fn from_env() -> Result<Self> {
        let env = EnvLoader::new("BEACON_SPAM_");
        Ok(Self {
            min_content_length: env.get_usize("MIN_CONTENT_LENGTH", 3)?,
            max_repetition_ratio: env.get_f32("MAX_REPETITION_RATIO", 0.5)?,
            max_non_ascii_ratio: env.get_f32("MAX_NON_ASCII_RATIO", 0.5)?,
            max_url_text_ratio: env.get_f32("MAX_URL_TEXT_RATIO", 0.6)?,
            max_posts_per_minute: env.get_u32("MAX_POSTS_PER_MINUTE", 10)?,
        })
    }
}

impl Default for SpamFilterConfig {
    fn default() -> Self {
        Self {
            min_content_length: 3,
            max_repetition_ratio: 0.5,
            max_non_ascii_ratio: 0.5,
            max_url_text_ratio: 0.6,
            max_posts_per_minute: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane_thresholds() {
        let cfg = SpamFilterConfig::default();
        assert!(cfg.max_repetition_ratio < 1.0);
        assert!(cfg.max_non_ascii_ratio < 1.0);
        assert!(cfg.max_posts_per_minute > 0);
    }
}
