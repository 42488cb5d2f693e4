//! Document/event relational store, pgvector cosine search, and TTL cache
//! adapters for Beacon Search. In-memory implementations are always
//! available; `postgres` and `redis-cache` are additive feature flags for
//! the backing stores used in a real deployment.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "redis-cache")]
pub mod redis_cache;

pub use memory::{InMemoryCache, InMemoryDictionaryStore, InMemoryDocumentStore, InMemoryFeedbackStore, InMemoryOntologyStore};

#[cfg(feature = "postgres")]
pub use postgres::PostgresDocumentStore;

#[cfg(feature = "redis-cache")]
pub use redis_cache::RedisCacheStorage;
