//! Composite, all-or-nothing spam filter.
//!
//! Every threshold is sourced from [`beacon_config::SpamFilterConfig`] —
//! none are hard-coded.

use std::collections::VecDeque;

use beacon_config::SpamFilterConfig;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// The single signal that tripped the filter, for logging/metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpamReason {
    TooShort,
    Repetitive,
    NonAsciiHeavy,
    LinkHeavy,
    RateExceeded,
}

impl std::fmt::Display for SpamReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SpamReason::TooShort => "content too short",
            SpamReason::Repetitive => "repetition ratio exceeded",
            SpamReason::NonAsciiHeavy => "non-ASCII ratio exceeded",
            SpamReason::LinkHeavy => "URL-to-text ratio exceeded",
            SpamReason::RateExceeded => "per-minute post rate exceeded",
        };
        f.write_str(s)
    }
}

/// Tracks each pubkey's recent post timestamps for the per-minute rate
/// check, using the same sliding-window shape as the relay pool's rate
/// limiter for consistency.
#[derive(Default)]
pub struct SpamFilter {
    config: SpamFilterConfig,
    recent_posts: DashMap<String, VecDeque<DateTime<Utc>>>,
}

impl SpamFilter {
    pub fn new(config: SpamFilterConfig) -> Self {
        Self {
            config,
            recent_posts: DashMap::new(),
        }
    }

    /// Runs every check; returns the first failing reason, if any. All
    /// checks are evaluated against `body` and `pubkey`'s recent post
    /// history — none depend on each other.
    pub fn check(&self, pubkey: &str, body: &str, now: DateTime<Utc>) -> Option<SpamReason> {
        let stripped: String = body.chars().filter(|c| !c.is_ascii_punctuation()).collect();
        if stripped.trim().chars().count() < self.config.min_content_length {
            return Some(SpamReason::TooShort);
        }

        if let Some(ratio) = repetition_ratio(body) {
            if ratio > self.config.max_repetition_ratio {
                return Some(SpamReason::Repetitive);
            }
        }

        let total_chars = body.chars().count();
        if total_chars > 0 {
            let non_ascii = body.chars().filter(|c| !c.is_ascii()).count();
            if non_ascii as f32 / total_chars as f32 > self.config.max_non_ascii_ratio {
                return Some(SpamReason::NonAsciiHeavy);
            }
        }

        let url_chars: usize = body
            .split_whitespace()
            .filter(|w| w.starts_with("http://") || w.starts_with("https://"))
            .map(|w| w.chars().count())
            .sum();
        if total_chars > 0 && url_chars as f32 / total_chars as f32 > self.config.max_url_text_ratio {
            return Some(SpamReason::LinkHeavy);
        }

        if self.record_and_check_rate(pubkey, now) {
            return Some(SpamReason::RateExceeded);
        }

        None
    }

    /// Records `now` against `pubkey`'s rolling one-minute window and
    /// returns `true` if the post exceeds the configured rate.
    fn record_and_check_rate(&self, pubkey: &str, now: DateTime<Utc>) -> bool {
        let mut window = self.recent_posts.entry(pubkey.to_string()).or_default();
        while let Some(&front) = window.front() {
            if (now - front).num_seconds() >= 60 {
                window.pop_front();
            } else {
                break;
            }
        }
        window.push_back(now);
        window.len() as u32 > self.config.max_posts_per_minute
    }
}

/// Ratio of the most frequent whitespace token's frequency to the total
/// token count, or `None` if there is no content to measure.
fn repetition_ratio(body: &str) -> Option<f32> {
    let tokens: Vec<&str> = body.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }
    let mut counts: std::collections::HashMap<&str, u32> = std::collections::HashMap::new();
    for t in &tokens {
        *counts.entry(*t).or_insert(0) += 1;
    }
    let max_count = counts.values().copied().max().unwrap_or(0);
    Some(max_count as f32 / tokens.len() as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> SpamFilter {
        SpamFilter::new(SpamFilterConfig::default())
    }

    #[test]
    fn rejects_content_below_min_length() {
        let f = filter();
        assert_eq!(f.check("pk", "hi", Utc::now()), Some(SpamReason::TooShort));
    }

    #[test]
    fn rejects_highly_repetitive_content() {
        let f = filter();
        let body = "spam spam spam spam spam spam spam spam";
        assert_eq!(f.check("pk", body, Utc::now()), Some(SpamReason::Repetitive));
    }

    #[test]
    fn rejects_link_heavy_content() {
        let f = filter();
        let body = "https://a.example https://b.example https://c.example";
        assert_eq!(f.check("pk", body, Utc::now()), Some(SpamReason::LinkHeavy));
    }

    #[test]
    fn accepts_normal_content() {
        let f = filter();
        assert_eq!(f.check("pk", "just a normal thought about bitcoin today", Utc::now()), None);
    }

    #[test]
    fn rejects_once_post_rate_exceeded() {
        let f = filter();
        let mut cfg = SpamFilterConfig::default();
        cfg.max_posts_per_minute = 2;
        let f = SpamFilter::new(cfg);
        let now = Utc::now();
        assert_eq!(f.check("pk", "a normal first post here", now), None);
        assert_eq!(f.check("pk", "a normal second post here", now), None);
        assert_eq!(
            f.check("pk", "a normal third post here", now),
            Some(SpamReason::RateExceeded)
        );
    }

    #[test]
    fn rate_window_forgets_old_posts() {
        let mut cfg = SpamFilterConfig::default();
        cfg.max_posts_per_minute = 1;
        let f = SpamFilter::new(cfg);
        let t0 = Utc::now();
        assert_eq!(f.check("pk", "first normal post here", t0), None);
        let t1 = t0 + chrono::Duration::seconds(61);
        assert_eq!(f.check("pk", "second normal post here", t1), None);
    }
}
