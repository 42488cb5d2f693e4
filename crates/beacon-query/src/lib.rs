//! Query rewriting over the ontology/dictionary, hybrid lexical+vector
//! retrieval, and facet computation — the Query Engine.
//!
//! Read-only over the document store: every write to [`beacon_types::Document`]
//! flows through `beacon-ingest` or `beacon-federation`'s feedback step.

pub mod engine;
pub mod facets;
pub mod retrieval;
pub mod rewrite;

pub use engine::{QueryEngine, SearchRequest, SearchResponse};
pub use facets::{FacetBucket, FacetComputer, FacetCounts};
pub use retrieval::{RetrievalMode, Retriever, ScoredDocument};
pub use rewrite::{ConceptMatch, FuzzyMatch, QueryRewriteExplanation, QueryRewriter, RewriteOptions, RewrittenQuery};
