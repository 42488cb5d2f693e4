//! Query/text normalization and tokenization shared by the Query Engine's
//! rewriter and FRPEI's canonicalization step.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// A minimal English stopword list. Deliberately small: the rewriter's job
/// is to drop obviously content-free function words, not to replicate a
/// full NLP stopword corpus.
pub static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "the", "of", "in", "on", "at", "to", "for", "and", "or", "is", "are", "was",
        "were", "be", "been", "by", "with", "as", "it", "this", "that", "these", "those", "from",
        "but", "not", "no", "do", "does", "did", "has", "have", "had", "will", "would", "can",
        "could", "should", "i", "you", "he", "she", "they", "we",
    ]
    .into_iter()
    .collect()
});

/// Stage 1 of query rewriting: Unicode NFKC, smart-quote unification,
/// lowercasing, underscore-to-space, whitespace collapse.
pub fn normalize_text(input: &str) -> String {
    let nfkc: String = input.nfkc().collect();
    let quotes_unified: String = nfkc
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201B}' | '\u{FF07}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201F}' | '\u{FF02}' => '"',
            _ => c,
        })
        .collect();
    let lowered = quotes_unified.to_lowercase();
    let underscored = lowered.replace('_', " ");
    underscored.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Stage 3 of query rewriting: split on whitespace, drop stopwords and
/// tokens shorter than 2 characters. Expects input already stripped of
/// quoted phrases.
pub fn tokenize(input: &str) -> Vec<String> {
    input
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| c.is_ascii_punctuation()))
        .filter(|t| t.chars().count() >= 2 && !STOPWORDS.contains(t))
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_collapses_whitespace() {
        assert_eq!(normalize_text("  Bitcoin   Network  "), "bitcoin network");
    }

    #[test]
    fn normalize_unifies_smart_quotes() {
        assert_eq!(normalize_text("\u{201C}hello\u{201D}"), "\"hello\"");
        assert_eq!(normalize_text("it\u{2019}s"), "it's");
    }

    #[test]
    fn normalize_converts_underscores_to_spaces() {
        assert_eq!(normalize_text("lightning_network"), "lightning network");
    }

    #[test]
    fn tokenize_drops_stopwords_and_short_tokens() {
        let tokens = tokenize("the bitcoin is a currency of today");
        assert_eq!(tokens, vec!["bitcoin", "currency", "today"]);
    }

    #[test]
    fn tokenize_drops_single_char_tokens() {
        let tokens = tokenize("a b bitcoin");
        assert_eq!(tokens, vec!["bitcoin"]);
    }
}
