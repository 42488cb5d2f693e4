//! Relay Discovery: extracts candidate relay URLs from NIP-65 `r` tags,
//! any other `r` tag, and bare `wss?://` URLs embedded in event content,
//! then normalizes and deduplicates them against what has already been
//! seen.

use std::collections::HashSet;
use std::sync::Arc;

use beacon_types::NostrEvent;
use dashmap::DashSet;
use once_cell::sync::Lazy;
use regex::Regex;

const NIP65_RELAY_LIST_KIND: u32 = 10002;

static WS_URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"wss?://[^\s<>\x22']+").expect("valid regex"));

/// Idempotent accumulator of discovered relay URLs and processed event
/// ids, so re-crawling the same events never re-emits a URL.
#[derive(Default)]
pub struct DiscoveryState {
    discovered_urls: DashSet<String>,
    processed_event_ids: DashSet<String>,
}

impl DiscoveryState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn has_seen_event(&self, event_id: &str) -> bool {
        self.processed_event_ids.contains(event_id)
    }

    pub fn discovered_urls(&self) -> HashSet<String> {
        self.discovered_urls.iter().map(|e| e.clone()).collect()
    }

    /// Extracts, normalizes, and records every relay URL found in `event`.
    /// Returns only the URLs newly added in this call (already-known URLs
    /// are silently skipped so callers can react just to genuinely new
    /// relays).
    pub fn process_event(&self, event: &NostrEvent) -> Vec<String> {
        if !self.processed_event_ids.insert(event.id.clone()) {
            return Vec::new();
        }

        let mut candidates: Vec<String> = event.tags_named("r").map(str::to_string).collect();
        candidates.extend(WS_URL_RE.find_iter(&event.content).map(|m| m.as_str().to_string()));

        let mut newly_discovered = Vec::new();
        for raw in candidates {
            if let Some(normalized) = beacon_utils::url_normalize::normalize_relay_url(&raw) {
                if self.discovered_urls.insert(normalized.clone()) {
                    newly_discovered.push(normalized);
                }
            }
        }
        newly_discovered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: u32, tags: Vec<Vec<String>>, content: &str) -> NostrEvent {
        NostrEvent {
            id: format!("evt-{kind}-{content}"),
            pubkey: "pk".into(),
            created_at: 0,
            kind,
            tags,
            content: content.into(),
            sig: String::new(),
        }
    }

    #[test]
    fn extracts_relay_list_from_kind_10002() {
        let state = DiscoveryState::new();
        let e = event(
            10002,
            vec![
                vec!["r".into(), "wss://relay-a.example".into()],
                vec!["r".into(), "wss://relay-b.example/".into()],
            ],
            "",
        );
        let mut found = state.process_event(&e);
        found.sort();
        assert_eq!(found, vec!["wss://relay-a.example", "wss://relay-b.example"]);
    }

    #[test]
    fn extracts_bare_urls_from_content() {
        let state = DiscoveryState::new();
        let e = event(1, vec![], "check out wss://mentioned.example for more notes");
        let found = state.process_event(&e);
        assert_eq!(found, vec!["wss://mentioned.example"]);
    }

    #[test]
    fn same_event_processed_twice_yields_nothing_the_second_time() {
        let state = DiscoveryState::new();
        let e = event(1, vec![vec!["r".into(), "wss://once.example".into()]], "");
        assert_eq!(state.process_event(&e).len(), 1);
        assert_eq!(state.process_event(&e).len(), 0);
    }

    #[test]
    fn rejects_private_and_local_candidates() {
        let state = DiscoveryState::new();
        let e = event(1, vec![vec!["r".into(), "ws://127.0.0.1:4848".into()]], "");
        assert!(state.process_event(&e).is_empty());
    }

    #[test]
    fn already_known_url_is_not_reported_again_from_a_different_event() {
        let state = DiscoveryState::new();
        let e1 = event(1, vec![vec!["r".into(), "wss://dup.example".into()]], "");
        let e2 = event(1, vec![vec!["r".into(), "wss://dup.example".into()]], "distinct-content");
        assert_eq!(state.process_event(&e1).len(), 1);
        assert_eq!(state.process_event(&e2).len(), 0);
    }
}
