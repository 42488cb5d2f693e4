//! Query rewriting: normalize → phrase extraction →
//! tokenize → concept match → relation expansion → dictionary expansion →
//! abbreviation expansion → fuzzy expansion → weighting/capping.
//!
//! Every stage's output is folded into [`QueryRewriteExplanation`] — the
//! rewriter never discards how it arrived at the final query.

use std::collections::HashMap;
use std::sync::Arc;

use beacon_config::QueryRewriteConfig;
use beacon_types::ontology::{AliasKind, MatchedBy};
use beacon_types::ports::{DictionaryRepository, OntologyRepository};
use beacon_types::Result;
use beacon_utils::fuzzy::best_fuzzy_match;
use beacon_utils::tokenize::{normalize_text, tokenize};
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

static PHRASE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)"|'([^']+)'"#).unwrap());

/// How a query term matched an ontology concept, and what it contributed.
#[derive(Debug, Clone)]
pub struct ConceptMatch {
    pub concept_id: Uuid,
    pub matched_by: MatchedBy,
    pub preferred_term: String,
    pub aliases: Vec<String>,
    pub taxonomies: Vec<String>,
}

/// A token that had no exact match but resolved via edit distance.
#[derive(Debug, Clone)]
pub struct FuzzyMatch {
    pub term: String,
    pub matched_term: String,
    pub distance: usize,
}

/// The full, never-hidden record of how a raw query became its rewritten
/// form.
#[derive(Debug, Clone, Default)]
pub struct QueryRewriteExplanation {
    pub phrases: Vec<String>,
    pub concept_matches: Vec<ConceptMatch>,
    pub fuzzy_matches: Vec<FuzzyMatch>,
    /// Every expansion term with the weight it was kept at, in the
    /// already-capped, descending-weight order used to build the queries.
    pub expansions: Vec<(String, f32)>,
}

#[derive(Debug, Clone)]
pub struct RewrittenQuery {
    pub vector_query: String,
    pub lexical_query: String,
    pub explanation: QueryRewriteExplanation,
}

/// Per-request overrides of [`QueryRewriteConfig`]; any field left `None`
/// falls back to the configured default.
#[derive(Debug, Clone, Default)]
pub struct RewriteOptions {
    pub expand: Option<bool>,
    pub enable_fuzzy: Option<bool>,
    pub enable_abbrev: Option<bool>,
}

pub struct QueryRewriter {
    ontology: Arc<dyn OntologyRepository>,
    dictionary: Arc<dyn DictionaryRepository>,
    config: QueryRewriteConfig,
}

impl QueryRewriter {
    pub fn new(
        ontology: Arc<dyn OntologyRepository>,
        dictionary: Arc<dyn DictionaryRepository>,
        config: QueryRewriteConfig,
    ) -> Self {
        Self {
            ontology,
            dictionary,
            config,
        }
    }

    pub async fn rewrite(&self, raw_query: &str, options: &RewriteOptions) -> Result<RewrittenQuery> {
        let expand = options.expand.unwrap_or(self.config.expand);
        let enable_fuzzy = options.enable_fuzzy.unwrap_or(self.config.enable_fuzzy);
        let enable_abbrev = options.enable_abbrev.unwrap_or(self.config.enable_abbrev);

        // 1. Normalize.
        let normalized = normalize_text(raw_query);

        // 2. Phrase extraction.
        let mut phrases = Vec::new();
        let remainder = PHRASE_RE.replace_all(&normalized, |caps: &regex::Captures| {
            let phrase = caps.get(1).or_else(|| caps.get(2)).unwrap().as_str();
            phrases.push(phrase.to_string());
            " "
        });

        // 3. Tokenize the remainder.
        let tokens = tokenize(&remainder);

        // Literal query terms start below preferred-term expansion weight
        // (0.90) so that a term's own concept match always outranks it, but
        // above every other expansion tier (alias 0.70, relation 0.40-0.45,
        // fuzzy 0.35) so an unexpanded literal term still leads the pack.
        const LITERAL_TERM_WEIGHT: f32 = 0.80;
        let mut weights: HashMap<String, f32> = HashMap::new();
        for token in &tokens {
            weights.entry(token.clone()).or_insert(LITERAL_TERM_WEIGHT);
        }
        for phrase in &phrases {
            weights.entry(phrase.clone()).or_insert(LITERAL_TERM_WEIGHT);
        }

        let mut concept_matches = Vec::new();
        let mut fuzzy_matches = Vec::new();

        if expand {
            // 4. Concept match + 5. Relation expansion.
            let mut matched_terms: Vec<String> = Vec::new();
            for token in tokens.iter().chain(phrases.iter()) {
                let concepts = self.ontology.find_by_term(token).await?;
                for concept in concepts {
                    let matched_by = match concept.matches(token) {
                        Some(m) => m,
                        None => continue,
                    };
                    matched_terms.push(token.clone());

                    weights
                        .entry(concept.preferred_term.to_lowercase())
                        .and_modify(|w| *w = w.max(0.90))
                        .or_insert(0.90);
                    for alias in &concept.aliases {
                        weights
                            .entry(alias.alias.to_lowercase())
                            .and_modify(|w| *w = w.max(0.70))
                            .or_insert(0.70);
                    }
                    for relation in &concept.relations {
                        if let Ok(Some(related)) = self.ontology.get(relation.target_id).await {
                            let weight = relation.kind.base_weight();
                            weights
                                .entry(related.preferred_term.to_lowercase())
                                .and_modify(|w| *w = w.max(weight))
                                .or_insert(weight);
                        }
                    }

                    concept_matches.push(ConceptMatch {
                        concept_id: concept.id,
                        matched_by,
                        preferred_term: concept.preferred_term.clone(),
                        aliases: concept.aliases.iter().map(|a| a.alias.clone()).collect(),
                        taxonomies: concept.taxonomies.iter().cloned().collect(),
                    });

                    // 7. Abbreviation expansion from ontology aliases.
                    if enable_abbrev {
                        for alias in concept
                            .aliases
                            .iter()
                            .filter(|a| a.kind == AliasKind::Abbrev)
                        {
                            weights
                                .entry(alias.alias.to_lowercase())
                                .and_modify(|w| *w = w.max(0.60))
                                .or_insert(0.60);
                        }
                    }
                }
            }

            // 6. Dictionary expansion (+ abbreviation expansion for
            // acronym_for entries).
            for token in tokens.iter().chain(phrases.iter()) {
                if let Some(entry) = self.dictionary.find(token).await? {
                    let weight = (entry.boost_weight * 0.70).min(1.0);
                    for synonym in &entry.synonyms {
                        weights
                            .entry(synonym.to_lowercase())
                            .and_modify(|w| *w = w.max(weight))
                            .or_insert(weight);
                    }
                    if enable_abbrev {
                        if let Some(expansion) = &entry.acronym_for {
                            weights
                                .entry(expansion.to_lowercase())
                                .and_modify(|w| *w = w.max(0.60))
                                .or_insert(0.60);
                        }
                    }
                }
            }

            // 8. Fuzzy expansion for tokens that matched nothing above.
            if enable_fuzzy {
                let lexicon = self.ontology.all_terms().await?;
                let lexicon_refs: Vec<&str> = lexicon.iter().map(String::as_str).collect();
                let mut fuzzy_count = 0;
                for token in &tokens {
                    if matched_terms.contains(token) || fuzzy_count >= self.config.max_fuzzy_matches {
                        continue;
                    }
                    if let Some((candidate, distance)) =
                        best_fuzzy_match(token, lexicon_refs.iter().copied(), self.config.fuzzy_max_distance)
                    {
                        weights
                            .entry(candidate.to_lowercase())
                            .and_modify(|w| *w = w.max(0.35))
                            .or_insert(0.35);
                        fuzzy_matches.push(FuzzyMatch {
                            term: token.clone(),
                            matched_term: candidate.to_string(),
                            distance,
                        });
                        fuzzy_count += 1;
                    }
                }
            }
        }

        // 9. Weighting and capping.
        let mut expansions: Vec<(String, f32)> = weights.into_iter().collect();
        expansions.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        expansions.truncate(self.config.max_total_expansions);

        let vector_query = expansions
            .iter()
            .take(self.config.vector_term_limit)
            .map(|(term, _)| term.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let lexical_query = expansions
            .iter()
            .map(|(term, _)| term.as_str())
            .collect::<Vec<_>>()
            .join(" OR ");

        Ok(RewrittenQuery {
            vector_query,
            lexical_query,
            explanation: QueryRewriteExplanation {
                phrases,
                concept_matches,
                fuzzy_matches,
                expansions,
            },
        })
    }
}
