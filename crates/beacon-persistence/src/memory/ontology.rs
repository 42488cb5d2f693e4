//! In-memory [`OntologyRepository`]/[`DictionaryRepository`] adapter,
//! loaded once at startup from a fixed concept/dictionary set (the
//! ontology graph is admin-managed, never mutated by query-time code).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use beacon_types::ontology::{DictionaryEntry, OntologyConcept};
use beacon_types::ports::{DictionaryRepository, OntologyRepository};
use beacon_types::Result;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InMemoryOntologyStore {
    concepts: Arc<RwLock<HashMap<Uuid, OntologyConcept>>>,
}

impl InMemoryOntologyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, concept: OntologyConcept) {
        self.concepts.write().await.insert(concept.id, concept);
    }
}

#[async_trait]
impl OntologyRepository for InMemoryOntologyStore {
    async fn find_by_term(&self, term: &str) -> Result<Vec<OntologyConcept>> {
        let concepts = self.concepts.read().await;
        Ok(concepts
            .values()
            .filter(|c| c.matches(term).is_some())
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<OntologyConcept>> {
        Ok(self.concepts.read().await.get(&id).cloned())
    }

    async fn related(&self, id: Uuid) -> Result<Vec<OntologyConcept>> {
        let concepts = self.concepts.read().await;
        let Some(concept) = concepts.get(&id) else {
            return Ok(Vec::new());
        };
        Ok(concept
            .relations
            .iter()
            .filter_map(|rel| concepts.get(&rel.target_id))
            .cloned()
            .collect())
    }

    async fn all_terms(&self) -> Result<Vec<String>> {
        let concepts = self.concepts.read().await;
        let mut terms: Vec<String> = concepts.values().map(|c| c.preferred_term.clone()).collect();
        terms.sort();
        terms.dedup();
        Ok(terms)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryDictionaryStore {
    entries: Arc<RwLock<HashMap<String, DictionaryEntry>>>,
}

impl InMemoryDictionaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, entry: DictionaryEntry) {
        self.entries.write().await.insert(entry.term.to_lowercase(), entry);
    }
}

#[async_trait]
impl DictionaryRepository for InMemoryDictionaryStore {
    async fn find(&self, term: &str) -> Result<Option<DictionaryEntry>> {
        Ok(self.entries.read().await.get(&term.to_lowercase()).cloned())
    }

    async fn all_terms(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn find_by_term_matches_preferred_term_case_insensitively() {
        let store = InMemoryOntologyStore::new();
        store.insert(OntologyConcept::new("Bitcoin")).await;
        let found = store.find_by_term("bitcoin").await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn related_resolves_relation_targets() {
        let store = InMemoryOntologyStore::new();
        let parent = OntologyConcept::new("Cryptocurrency");
        let parent_id = parent.id;
        let mut child = OntologyConcept::new("Bitcoin");
        child.relations.push(beacon_types::ontology::Relation {
            target_id: parent_id,
            kind: beacon_types::ontology::RelationKind::Broader,
            weight: 0.4,
        });
        store.insert(parent).await;
        store.insert(child.clone()).await;

        let related = store.related(child.id).await.unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].preferred_term, "Cryptocurrency");
    }

    #[tokio::test]
    async fn dictionary_lookup_is_case_insensitive() {
        let store = InMemoryDictionaryStore::new();
        store
            .insert(DictionaryEntry {
                term: "BTC".into(),
                synonyms: vec!["bitcoin".into()],
                acronym_for: Some("Bitcoin".into()),
                boost_weight: 0.7,
            })
            .await;
        let found = store.find("btc").await.unwrap();
        assert!(found.is_some());
    }
}
