//! In-memory adapters for every persistence port, always available
//! regardless of which storage features are compiled in. Used directly by
//! component tests across the workspace and by deployments that haven't
//! opted into `postgres`/`redis-cache`.

pub mod cache;
pub mod document;
pub mod feedback;
pub mod ontology;

pub use cache::InMemoryCache;
pub use document::InMemoryDocumentStore;
pub use feedback::InMemoryFeedbackStore;
pub use ontology::{InMemoryDictionaryStore, InMemoryOntologyStore};
