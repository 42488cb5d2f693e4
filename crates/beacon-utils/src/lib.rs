//! # Beacon Utils
//!
//! Small, dependency-light helpers shared across the ingestion and
//! retrieval core: relay URL normalization, Levenshtein distance for fuzzy
//! query expansion, and text tokenization.

pub mod fuzzy;
pub mod tokenize;
pub mod url_normalize;

pub use fuzzy::levenshtein;
pub use tokenize::{normalize_text, tokenize, STOPWORDS};
pub use url_normalize::{is_private_or_local, normalize_relay_url};
