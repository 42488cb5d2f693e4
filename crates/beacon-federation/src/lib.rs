//! FRPEI: the Federated Retrieve-Enrich-Rank-Explain-Ingest provider
//! router. Fans a query out to `local`/`web`/`media`
//! search providers behind per-provider circuit breakers, canonicalizes
//! and enriches results against the ontology, ranks them, and records
//! feedback back into the ranking loop.

pub mod canonicalize;
pub mod enrich;
pub mod feedback;
pub mod providers;
pub mod rank;
pub mod retrieve;
pub mod router;

pub use feedback::{record_feedback, sentiment_for_action, FeedbackRequest};
pub use providers::{HttpSearchProvider, LocalProvider};
pub use retrieve::{ProviderFailure, RetrievePipeline, RetrieveRequest};
pub use router::{FederationRouter, ProviderRegistry, RetrieveResult};
