//! Classifies a raw Nostr event by its `kind` into a category, priority,
//! and the extractors that should run over it.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// The extraction passes a [`KindRule`] can declare. Several may run over
/// the same event; their outputs merge into one [`crate::extract::ExtractedContent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractorKind {
    Text,
    Markdown,
    Hashtags,
    Links,
    Longform,
    Profile,
    Contacts,
    Structured,
    Video,
    FileMetadata,
}

#[derive(Debug, Clone)]
pub struct KindRule {
    pub category: &'static str,
    pub priority: u8,
    pub extractors: Vec<ExtractorKind>,
}

/// Ephemeral event kinds (NIP-01's `[20000, 30000)` range) never produce
/// documents regardless of any explicit rule.
fn is_ephemeral(kind: u32) -> bool {
    (20_000..30_000).contains(&kind)
}

static RULES: Lazy<HashMap<u32, KindRule>> = Lazy::new(|| {
    use ExtractorKind::*;
    let mut m = HashMap::new();
    m.insert(1, KindRule { category: "note", priority: 5, extractors: vec![Text, Hashtags, Links] });
    m.insert(6, KindRule { category: "repost", priority: 3, extractors: vec![Text] });
    m.insert(7, KindRule { category: "reaction", priority: 2, extractors: vec![Text] });
    m.insert(0, KindRule { category: "profile", priority: 4, extractors: vec![Profile] });
    m.insert(3, KindRule { category: "contacts", priority: 3, extractors: vec![Contacts] });
    m.insert(1063, KindRule { category: "file_metadata", priority: 6, extractors: vec![FileMetadata] });
    m.insert(30023, KindRule { category: "long_form_article", priority: 9, extractors: vec![Markdown, Longform, Hashtags, Links] });
    m.insert(30024, KindRule { category: "long_form_draft", priority: 7, extractors: vec![Markdown, Longform] });
    m.insert(30040, KindRule { category: "structured_publication", priority: 8, extractors: vec![Structured, Links] });
    m.insert(30311, KindRule { category: "live_event", priority: 6, extractors: vec![Structured, Text] });
    m.insert(30402, KindRule { category: "classified_listing", priority: 7, extractors: vec![Structured, Links] });
    m.insert(21, KindRule { category: "video", priority: 7, extractors: vec![Video, Hashtags] });
    m.insert(22, KindRule { category: "video_short", priority: 6, extractors: vec![Video, Hashtags] });
    m
});

/// A kind rule registry, cheaply clonable (just a static table lookup; the
/// struct exists so future per-deployment overrides have somewhere to
/// live without changing every call site).
#[derive(Debug, Clone, Default)]
pub struct Classifier;

impl Classifier {
    pub fn new() -> Self {
        Self
    }

    /// `None` means the event is dropped silently: either its kind has no
    /// rule, its rule's priority is below the `3` cutoff, or it falls in
    /// the ephemeral range.
    pub fn classify(&self, kind: u32) -> Option<KindRule> {
        if is_ephemeral(kind) {
            return None;
        }
        RULES.get(&kind).filter(|rule| rule.priority >= 3).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_ephemeral_kinds() {
        let c = Classifier::new();
        assert!(c.classify(20_000).is_none());
        assert!(c.classify(25_000).is_none());
        assert!(c.classify(29_999).is_none());
    }

    #[test]
    fn drops_low_priority_reactions() {
        let c = Classifier::new();
        assert!(c.classify(7).is_none());
    }

    #[test]
    fn keeps_notes_and_articles() {
        let c = Classifier::new();
        assert_eq!(c.classify(1).unwrap().category, "note");
        assert_eq!(c.classify(30023).unwrap().category, "long_form_article");
    }

    #[test]
    fn unknown_kind_is_dropped() {
        let c = Classifier::new();
        assert!(c.classify(99_999).is_none());
    }
}
