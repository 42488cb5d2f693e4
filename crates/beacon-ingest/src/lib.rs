//! Classification, extraction, spam filtering, and dedupe/index for the
//! Ingestion Pipeline.
//!
//! Raw [`beacon_types::NostrEvent`]s arrive from the Adaptive Crawler via
//! [`beacon_relay::IngestSink`] and are turned into [`beacon_types::Document`]s
//! through [`pipeline::IngestionPipeline`]: classify by kind, run the
//! kind's declared extractors, reject spam, then upsert in one transaction.

pub mod classify;
pub mod extract;
pub mod pipeline;
pub mod spam;

pub use classify::{Classifier, ExtractorKind, KindRule};
pub use extract::{ExtractedContent, Extractor};
pub use pipeline::IngestionPipeline;
pub use spam::{SpamFilter, SpamReason};
