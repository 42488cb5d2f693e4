//! Hybrid retrieval: execute a rewritten query against the
//! document store in `vector`, `text`, or `hybrid` mode and return
//! ranked, paginated results.

use std::sync::Arc;

use beacon_types::ports::{DocumentFilter, DocumentRepository, Embedder, Page};
use beacon_types::{Document, Result};

use crate::rewrite::RewrittenQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMode {
    Vector,
    Text,
    Hybrid,
}

impl Default for RetrievalMode {
    fn default() -> Self {
        RetrievalMode::Hybrid
    }
}

/// One scored, ranked search hit.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

/// Weight given to the vector component in `hybrid` mode; the lexical
/// component gets `1.0 - VECTOR_WEIGHT`.
const VECTOR_WEIGHT: f32 = 0.7;

pub struct Retriever<R> {
    repository: Arc<R>,
    embedder: Option<Arc<dyn Embedder>>,
}

impl<R> Retriever<R>
where
    R: DocumentRepository + Send + Sync + 'static,
{
    pub fn new(repository: Arc<R>, embedder: Option<Arc<dyn Embedder>>) -> Self {
        Self { repository, embedder }
    }

    /// Exposes the backing repository for callers that need to run their
    /// own queries against it (e.g. a health check), without re-deriving
    /// retrieval logic.
    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub async fn retrieve(
        &self,
        rewritten: &RewrittenQuery,
        mode: RetrievalMode,
        filter: &DocumentFilter,
        page: Page,
    ) -> Result<Vec<ScoredDocument>> {
        match mode {
            RetrievalMode::Vector => self.vector_only(rewritten, filter, page).await,
            RetrievalMode::Text => self.text_only(rewritten, filter, page).await,
            RetrievalMode::Hybrid => self.hybrid(rewritten, filter, page).await,
        }
    }

    async fn vector_only(
        &self,
        rewritten: &RewrittenQuery,
        filter: &DocumentFilter,
        page: Page,
    ) -> Result<Vec<ScoredDocument>> {
        let Some(embedder) = &self.embedder else {
            return Ok(Vec::new());
        };
        let embedding = embedder.embed(&rewritten.vector_query).await?;
        let hits = self.repository.vector_search(&embedding, filter, page).await?;
        Ok(hits
            .into_iter()
            .map(|(document, cos_dist)| ScoredDocument {
                document,
                score: 1.0 - cos_dist,
            })
            .collect())
    }

    async fn text_only(
        &self,
        rewritten: &RewrittenQuery,
        filter: &DocumentFilter,
        page: Page,
    ) -> Result<Vec<ScoredDocument>> {
        let hits = self.repository.text_search(&rewritten.lexical_query, filter, page).await?;
        Ok(hits
            .into_iter()
            .map(|(document, rank)| ScoredDocument { document, score: rank })
            .collect())
    }

    /// Combines per-document `0.7 * (1 - cos_dist) + 0.3 * lex_rank`,
    /// fetching an unpaginated superset of each leg so pagination is
    /// applied to the already-blended ranking rather than to either leg
    /// in isolation.
    async fn hybrid(
        &self,
        rewritten: &RewrittenQuery,
        filter: &DocumentFilter,
        page: Page,
    ) -> Result<Vec<ScoredDocument>> {
        let superset = Page {
            offset: 0,
            limit: page.offset + page.limit.max(1) * 4,
        };

        let text_hits = self.repository.text_search(&rewritten.lexical_query, filter, superset).await?;
        let mut scores: std::collections::HashMap<uuid::Uuid, (Document, f32)> = text_hits
            .into_iter()
            .map(|(doc, rank)| {
                let id = doc.id;
                (id, (doc, (1.0 - VECTOR_WEIGHT) * rank))
            })
            .collect();

        if let Some(embedder) = &self.embedder {
            let embedding = embedder.embed(&rewritten.vector_query).await?;
            let vector_hits = self.repository.vector_search(&embedding, filter, superset).await?;
            for (doc, cos_dist) in vector_hits {
                let contribution = VECTOR_WEIGHT * (1.0 - cos_dist);
                scores
                    .entry(doc.id)
                    .and_modify(|(_, score)| *score += contribution)
                    .or_insert((doc, contribution));
            }
        }

        let mut combined: Vec<ScoredDocument> = scores
            .into_values()
            .map(|(document, score)| ScoredDocument { document, score })
            .collect();
        combined.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.document.updated_at.cmp(&a.document.updated_at))
                .then_with(|| a.document.id.cmp(&b.document.id))
        });

        Ok(combined
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }
}
