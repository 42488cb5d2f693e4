//! Extractors turn a raw Nostr event into the title/body/tags/metadata
//! that seed a [`beacon_types::Document`]. A [`crate::classify::KindRule`]
//! names which extractors run; their outputs are merged in declaration
//! order into one [`ExtractedContent`] accumulator.

use beacon_types::NostrEvent;
use beacon_utils::tokenize::normalize_text;
use serde_json::{json, Map, Value};

/// Accumulated extraction output, pre-spam-filter.
#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
    pub title: Option<String>,
    pub body: String,
    pub tags: Vec<String>,
    pub metadata: Map<String, Value>,
    pub quality_score: f32,
}

impl ExtractedContent {
    fn merge_metadata(&mut self, key: &str, value: Value) {
        self.metadata.insert(key.to_string(), value);
    }
}

pub trait Extractor: Send + Sync {
    fn extract(&self, event: &NostrEvent, acc: &mut ExtractedContent);
}

/// Plain-text note body: content as-is, with a coarse quality score based
/// on length (longer, non-trivial notes score higher, capped at 1.0).
pub struct TextExtractor;

impl Extractor for TextExtractor {
    fn extract(&self, event: &NostrEvent, acc: &mut ExtractedContent) {
        acc.body = event.content.clone();
        acc.quality_score = acc.quality_score.max((event.content.len() as f32 / 280.0).min(1.0));
    }
}

/// Long-form Markdown body (kind 30023/30024): strips a leading `# Title`
/// heading into `title` if present, keeps the rest as `body`.
pub struct MarkdownExtractor;

impl Extractor for MarkdownExtractor {
    fn extract(&self, event: &NostrEvent, acc: &mut ExtractedContent) {
        let content = &event.content;
        if let Some(rest) = content.strip_prefix("# ") {
            if let Some((heading, body)) = rest.split_once('\n') {
                acc.title = Some(heading.trim().to_string());
                acc.body = body.trim_start().to_string();
                return;
            }
        }
        acc.body = content.clone();
    }
}

/// Pulls a long-form article's declared title from its `title` tag
/// (NIP-23), preferring it over any Markdown heading.
pub struct LongformExtractor;

impl Extractor for LongformExtractor {
    fn extract(&self, event: &NostrEvent, acc: &mut ExtractedContent) {
        if let Some(title) = event.tags_named("title").next() {
            acc.title = Some(title.to_string());
        }
        if let Some(summary) = event.tags_named("summary").next() {
            acc.merge_metadata("summary", json!(summary));
        }
        acc.quality_score = acc.quality_score.max(0.8);
    }
}

/// Collects `t` tags (NIP-12 hashtags) plus any `#word` tokens found
/// inline in the content.
pub struct HashtagsExtractor;

impl Extractor for HashtagsExtractor {
    fn extract(&self, event: &NostrEvent, acc: &mut ExtractedContent) {
        for tag in event.tags_named("t") {
            let normalized = normalize_text(tag);
            if !acc.tags.contains(&normalized) {
                acc.tags.push(normalized);
            }
        }
        for word in event.content.split_whitespace() {
            if let Some(stripped) = word.strip_prefix('#') {
                let normalized = normalize_text(stripped.trim_matches(|c: char| !c.is_alphanumeric()));
                if !normalized.is_empty() && !acc.tags.contains(&normalized) {
                    acc.tags.push(normalized);
                }
            }
        }
    }
}

/// Collects `r` tags that are not relay URLs (plain links referenced by a
/// note) plus bare `http(s)://` URLs found in the content.
pub struct LinksExtractor;

impl Extractor for LinksExtractor {
    fn extract(&self, event: &NostrEvent, acc: &mut ExtractedContent) {
        let mut links: Vec<String> = event
            .tags_named("r")
            .filter(|u| u.starts_with("http://") || u.starts_with("https://"))
            .map(str::to_string)
            .collect();
        for word in event.content.split_whitespace() {
            if word.starts_with("http://") || word.starts_with("https://") {
                links.push(word.trim_end_matches(|c: char| ",.;)".contains(c)).to_string());
            }
        }
        links.dedup();
        if !links.is_empty() {
            acc.merge_metadata("links", json!(links));
        }
    }
}

/// Kind 0 profile metadata: the event's content is itself a JSON object
/// (`name`, `about`, `picture`, ...).
pub struct ProfileExtractor;

impl Extractor for ProfileExtractor {
    fn extract(&self, event: &NostrEvent, acc: &mut ExtractedContent) {
        if let Ok(Value::Object(profile)) = serde_json::from_str::<Value>(&event.content) {
            if let Some(name) = profile.get("name").and_then(Value::as_str) {
                acc.title = Some(name.to_string());
            }
            if let Some(about) = profile.get("about").and_then(Value::as_str) {
                acc.body = about.to_string();
            }
            for (key, value) in profile {
                acc.merge_metadata(&key, value);
            }
        }
        acc.quality_score = acc.quality_score.max(0.3);
    }
}

/// Kind 3 contact list: the `p` tags name followed pubkeys.
pub struct ContactsExtractor;

impl Extractor for ContactsExtractor {
    fn extract(&self, event: &NostrEvent, acc: &mut ExtractedContent) {
        let followed: Vec<&str> = event.tags_named("p").collect();
        acc.body = format!("follows {} pubkeys", followed.len());
        acc.merge_metadata("followed_pubkeys", json!(followed));
    }
}

/// Structured publications (classified listings, live events, NIP-B0
/// indices): surfaces every single-value tag as metadata and treats
/// `content` as the body verbatim.
pub struct StructuredExtractor;

impl Extractor for StructuredExtractor {
    fn extract(&self, event: &NostrEvent, acc: &mut ExtractedContent) {
        acc.body = event.content.clone();
        for tag in &event.tags {
            if let [name, value] = tag.as_slice() {
                acc.merge_metadata(name, json!(value));
            }
        }
        acc.quality_score = acc.quality_score.max(0.6);
    }
}

/// Kind 21/22 video events (NIP-71): title from the `title` tag,
/// duration/dimensions from `imeta`.
pub struct VideoExtractor;

impl Extractor for VideoExtractor {
    fn extract(&self, event: &NostrEvent, acc: &mut ExtractedContent) {
        if let Some(title) = event.tags_named("title").next() {
            acc.title = Some(title.to_string());
        }
        acc.body = event.content.clone();
        let durations: Vec<&str> = event.tags_named("duration").collect();
        if let Some(duration) = durations.first() {
            acc.merge_metadata("duration_seconds", json!(duration));
        }
        acc.quality_score = acc.quality_score.max(0.7);
    }
}

/// Kind 1063 file metadata (NIP-94): `url`, `m` (mime type), `x` (hash).
pub struct FileMetadataExtractor;

impl Extractor for FileMetadataExtractor {
    fn extract(&self, event: &NostrEvent, acc: &mut ExtractedContent) {
        acc.body = event.content.clone();
        if let Some(url) = event.tags_named("url").next() {
            acc.merge_metadata("file_url", json!(url));
        }
        if let Some(mime) = event.tags_named("m").next() {
            acc.merge_metadata("mime_type", json!(mime));
        }
        if let Some(hash) = event.tags_named("x").next() {
            acc.merge_metadata("sha256", json!(hash));
        }
        acc.quality_score = acc.quality_score.max(0.5);
    }
}

use crate::classify::ExtractorKind;

pub fn extractor_for(kind: ExtractorKind) -> &'static dyn Extractor {
    match kind {
        ExtractorKind::Text => &TextExtractor,
        ExtractorKind::Markdown => &MarkdownExtractor,
        ExtractorKind::Hashtags => &HashtagsExtractor,
        ExtractorKind::Links => &LinksExtractor,
        ExtractorKind::Longform => &LongformExtractor,
        ExtractorKind::Profile => &ProfileExtractor,
        ExtractorKind::Contacts => &ContactsExtractor,
        ExtractorKind::Structured => &StructuredExtractor,
        ExtractorKind::Video => &VideoExtractor,
        ExtractorKind::FileMetadata => &FileMetadataExtractor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: u32, tags: Vec<Vec<String>>, content: &str) -> NostrEvent {
        NostrEvent {
            id: "evt".into(),
            pubkey: "pk".into(),
            created_at: 0,
            kind,
            tags,
            content: content.into(),
            sig: String::new(),
        }
    }

    #[test]
    fn markdown_extractor_splits_heading_into_title() {
        let e = event(30023, vec![], "# My Article\n\nBody text here.");
        let mut acc = ExtractedContent::default();
        MarkdownExtractor.extract(&e, &mut acc);
        assert_eq!(acc.title, Some("My Article".to_string()));
        assert_eq!(acc.body, "Body text here.");
    }

    #[test]
    fn longform_extractor_prefers_title_tag() {
        let e = event(30023, vec![vec!["title".into(), "Tagged Title".into()]], "# Heading\n\nBody");
        let mut acc = ExtractedContent::default();
        MarkdownExtractor.extract(&e, &mut acc);
        LongformExtractor.extract(&e, &mut acc);
        assert_eq!(acc.title, Some("Tagged Title".to_string()));
    }

    #[test]
    fn hashtags_extractor_collects_tag_and_inline_hashtags() {
        let e = event(1, vec![vec!["t".into(), "nostr".into()]], "loving #rust today");
        let mut acc = ExtractedContent::default();
        HashtagsExtractor.extract(&e, &mut acc);
        assert!(acc.tags.contains(&"nostr".to_string()));
        assert!(acc.tags.contains(&"rust".to_string()));
    }

    #[test]
    fn links_extractor_collects_bare_urls_from_content() {
        let e = event(1, vec![], "see https://example.com/post for details.");
        let mut acc = ExtractedContent::default();
        LinksExtractor.extract(&e, &mut acc);
        let links = acc.metadata.get("links").unwrap().as_array().unwrap();
        assert_eq!(links[0], "https://example.com/post");
    }

    #[test]
    fn profile_extractor_parses_json_content() {
        let e = event(0, vec![], r#"{"name":"alice","about":"hello world"}"#);
        let mut acc = ExtractedContent::default();
        ProfileExtractor.extract(&e, &mut acc);
        assert_eq!(acc.title, Some("alice".to_string()));
        assert_eq!(acc.body, "hello world");
    }
}
