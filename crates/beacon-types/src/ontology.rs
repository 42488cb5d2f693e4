//! Ontology concepts and the dictionary entries the Query Engine and FRPEI
//! canonicalization both read from.
//!
//! The relation graph is stored id-keyed with adjacency lookups rather than
//! as a pointer graph, per this system's "arena + index for graph
//! structures" design note.

use std::collections::HashSet;
use uuid::Uuid;

/// How an alias relates to its concept's preferred term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AliasKind {
    Synonym,
    Abbrev,
    Phrase,
    Alt,
}

#[derive(Debug, Clone)]
pub struct Alias {
    pub alias: String,
    pub kind: AliasKind,
    pub weight: f32,
}

/// The kind of relation an edge in the ontology graph represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Broader,
    Narrower,
    Related,
}

#[derive(Debug, Clone)]
pub struct Relation {
    pub target_id: Uuid,
    pub kind: RelationKind,
    pub weight: f32,
}

impl RelationKind {
    /// Base expansion weight per spec: related 0.45, broader 0.40, narrower 0.40.
    pub fn base_weight(self) -> f32 {
        match self {
            RelationKind::Related => 0.45,
            RelationKind::Broader => 0.40,
            RelationKind::Narrower => 0.40,
        }
    }
}

/// A canonical, ontology-managed term with its synonyms, aliases, relations,
/// and taxonomy memberships. Mutated only via import/export admin
/// operations — never by the Query Engine or FRPEI at request time.
#[derive(Debug, Clone)]
pub struct OntologyConcept {
    pub id: Uuid,
    pub preferred_term: String,
    pub synonyms: HashSet<String>,
    pub parent_id: Option<Uuid>,
    pub aliases: Vec<Alias>,
    pub relations: Vec<Relation>,
    pub taxonomies: HashSet<String>,
}

impl OntologyConcept {
    pub fn new(preferred_term: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            preferred_term: preferred_term.into(),
            synonyms: HashSet::new(),
            parent_id: None,
            aliases: Vec::new(),
            relations: Vec::new(),
            taxonomies: HashSet::new(),
        }
    }

    /// Whether `term` matches this concept's preferred term, a synonym, or
    /// an alias (case-insensitively), and by what.
    pub fn matches(&self, term: &str) -> Option<MatchedBy> {
        let lower = term.to_lowercase();
        if self.preferred_term.to_lowercase() == lower {
            return Some(MatchedBy::PreferredTerm);
        }
        if self.synonyms.iter().any(|s| s.to_lowercase() == lower) {
            return Some(MatchedBy::Synonym);
        }
        if let Some(alias) = self
            .aliases
            .iter()
            .find(|a| a.alias.to_lowercase() == lower)
        {
            return Some(MatchedBy::Alias(alias.kind));
        }
        None
    }
}

/// How a query term matched an ontology concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    PreferredTerm,
    Synonym,
    Alias(AliasKind),
}

/// A flat dictionary entry, independent of the ontology graph, used for
/// synonym and acronym expansion.
#[derive(Debug, Clone)]
pub struct DictionaryEntry {
    pub term: String,
    pub synonyms: Vec<String>,
    pub acronym_for: Option<String>,
    pub boost_weight: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_preferred_term_case_insensitively() {
        let concept = OntologyConcept::new("Bitcoin");
        assert_eq!(concept.matches("bitcoin"), Some(MatchedBy::PreferredTerm));
        assert_eq!(concept.matches("BITCOIN"), Some(MatchedBy::PreferredTerm));
    }

    #[test]
    fn matches_alias_with_kind() {
        let mut concept = OntologyConcept::new("Bitcoin");
        concept.aliases.push(Alias {
            alias: "xbt".into(),
            kind: AliasKind::Abbrev,
            weight: 0.6,
        });
        assert_eq!(
            concept.matches("xbt"),
            Some(MatchedBy::Alias(AliasKind::Abbrev))
        );
    }

    #[test]
    fn relation_base_weights_match_spec() {
        assert_eq!(RelationKind::Related.base_weight(), 0.45);
        assert_eq!(RelationKind::Broader.base_weight(), 0.40);
        assert_eq!(RelationKind::Narrower.base_weight(), 0.40);
    }
}
