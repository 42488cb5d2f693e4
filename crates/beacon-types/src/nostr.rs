//! Wire-format Nostr types: the raw event as fetched from a relay, and the
//! subscription filter used to request it, per NIP-01.
//!
//! Distinct from [`crate::document::NostrEventRecord`], which is the
//! post-ingest record stored alongside the [`crate::document::Document`]
//! it produced — `NostrEvent` carries everything on the wire (`content`,
//! `sig`) before classification has run.

use serde::{Deserialize, Serialize};

/// A raw Nostr event as received from a relay's `EVENT` message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NostrEvent {
    pub id: String,
    pub pubkey: String,
    pub created_at: i64,
    pub kind: u32,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    pub sig: String,
}

impl NostrEvent {
    /// Every value of a tag matching `name` (the tag's own name, `tag[0]`,
    /// is excluded) — e.g. `tags_named("r")` on a kind 10002 event yields
    /// the relay URLs.
    pub fn tags_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.tags
            .iter()
            .filter(move |t| t.first().map(|n| n == name).unwrap_or(false))
            .filter_map(|t| t.get(1))
            .map(|s| s.as_str())
    }
}

/// A NIP-01 `REQ` subscription filter. All fields are conjunctive (AND'd
/// together); within a field, values are disjunctive (OR'd).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NostrFilter {
    pub ids: Option<Vec<String>>,
    pub authors: Option<Vec<String>>,
    pub kinds: Option<Vec<u32>>,
    #[serde(rename = "#r")]
    pub r_tags: Option<Vec<String>>,
    pub since: Option<i64>,
    pub until: Option<i64>,
    pub limit: Option<u32>,
}

impl NostrFilter {
    pub fn by_kinds(kinds: Vec<u32>) -> Self {
        Self {
            kinds: Some(kinds),
            ..Self::default()
        }
    }

    pub fn with_until(mut self, until: i64) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = Some(authors);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_named_extracts_values_ignoring_other_tag_names() {
        let event = NostrEvent {
            id: "abc".into(),
            pubkey: "pk".into(),
            created_at: 0,
            kind: 10002,
            tags: vec![
                vec!["r".into(), "wss://a.example".into(), "read".into()],
                vec!["r".into(), "wss://b.example".into()],
                vec!["t".into(), "nostr".into()],
            ],
            content: String::new(),
            sig: String::new(),
        };
        let relays: Vec<&str> = event.tags_named("r").collect();
        assert_eq!(relays, vec!["wss://a.example", "wss://b.example"]);
    }

    #[test]
    fn by_kinds_builder_sets_only_kinds() {
        let filter = NostrFilter::by_kinds(vec![1, 30023]).with_until(1000).with_limit(500);
        assert_eq!(filter.kinds, Some(vec![1, 30023]));
        assert_eq!(filter.until, Some(1000));
        assert_eq!(filter.limit, Some(500));
        assert!(filter.authors.is_none());
    }
}
