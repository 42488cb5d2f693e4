//! Relay Pool Manager, Relay Discovery, and the Adaptive Crawler.
//!
//! `beacon-relay` owns everything that talks to Nostr relays directly:
//! maintaining the pool of known relays and their health, discovering new
//! relays from NIP-65 lists and event content, and driving the two-phase
//! crawl that feeds raw events to whatever ingestion sink the caller
//! supplies.

pub mod crawler;
pub mod discovery;
pub mod pool;
pub mod ws;

pub use crawler::{AdaptiveCrawler, CrawlReport, CrawlState, IngestSink};
pub use discovery::DiscoveryState;
pub use pool::{Capabilities, RelayLimitation, RelayPoolManager};
