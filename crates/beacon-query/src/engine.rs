//! The Query Engine facade: rewrite the raw query, run hybrid retrieval,
//! and compute facets over the same filter, as one component.

use std::sync::Arc;

use beacon_types::ports::{DictionaryRepository, DocumentFilter, DocumentRepository, Embedder, OntologyRepository, Page};
use beacon_types::Result;

use crate::facets::{FacetComputer, FacetCounts};
use crate::retrieval::{Retriever, RetrievalMode, ScoredDocument};
use crate::rewrite::{QueryRewriter, RewriteOptions, RewrittenQuery};

pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub mode: RetrievalMode,
    pub filter: DocumentFilter,
    pub page: Page,
    pub rewrite_options: RewriteOptions,
}

pub struct SearchResponse {
    pub hits: Vec<ScoredDocument>,
    pub rewritten: RewrittenQuery,
}

pub struct QueryEngine<R> {
    rewriter: QueryRewriter,
    retriever: Retriever<R>,
    facets: FacetComputer<R>,
}

impl<R> QueryEngine<R>
where
    R: DocumentRepository + Send + Sync + 'static,
{
    pub fn new(
        repository: Arc<R>,
        ontology: Arc<dyn OntologyRepository>,
        dictionary: Arc<dyn DictionaryRepository>,
        embedder: Option<Arc<dyn Embedder>>,
        rewrite_config: beacon_config::QueryRewriteConfig,
        facet_config: beacon_config::FacetConfig,
    ) -> Self {
        Self {
            rewriter: QueryRewriter::new(ontology, dictionary, rewrite_config),
            retriever: Retriever::new(repository.clone(), embedder),
            facets: FacetComputer::new(repository, facet_config),
        }
    }

    pub async fn search(&self, request: SearchRequest<'_>) -> Result<SearchResponse> {
        let rewritten = self.rewriter.rewrite(request.query, &request.rewrite_options).await?;
        let hits = self
            .retriever
            .retrieve(&rewritten, request.mode, &request.filter, request.page)
            .await?;
        Ok(SearchResponse { hits, rewritten })
    }

    pub async fn facets(&self, filter: &DocumentFilter) -> Result<FacetCounts> {
        self.facets.compute(filter).await
    }
}
