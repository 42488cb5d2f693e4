//! The Adaptive Crawler: a bootstrap phase that seeds the pool from
//! NIP-65 relay lists, followed by a per-kind content crawl that paginates
//! backwards in time and feeds newly discovered relays back into the
//! pool as it goes.

use std::sync::Arc;

use beacon_config::CrawlerConfig;
use beacon_events::{EventBus, RelayEvent};
use beacon_types::{NostrEvent, NostrFilter, Result};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{info, warn};

use crate::discovery::DiscoveryState;
use crate::pool::RelayPoolManager;

const BOOTSTRAP_KIND: u32 = 10002;

/// State of a single kind's content-crawl pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlState {
    Idle,
    Paging { until: i64 },
    Done,
    Error(String),
}

/// Progress report sent from a per-kind crawl task to the supervisor.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub kind: u32,
    pub state: CrawlState,
    pub events_ingested: usize,
}

/// A single page of events handed to the ingestion pipeline. `beacon-relay`
/// does not ingest directly — it hands pages to whatever sink the caller
/// wires up (normally `beacon-ingest`'s pipeline entry point), keeping the
/// crawl loop decoupled from classification/spam-filtering/storage.
#[async_trait::async_trait]
pub trait IngestSink: Send + Sync {
    async fn ingest_page(&self, events: &[NostrEvent]) -> Result<()>;
}

/// Drives the bootstrap and content-crawl phases over a shared
/// [`RelayPoolManager`].
pub struct AdaptiveCrawler {
    pool: Arc<RelayPoolManager>,
    discovery: Arc<DiscoveryState>,
    config: CrawlerConfig,
    events: EventBus,
}

impl AdaptiveCrawler {
    pub fn new(pool: Arc<RelayPoolManager>, discovery: Arc<DiscoveryState>, config: CrawlerConfig, events: EventBus) -> Self {
        Self {
            pool,
            discovery,
            config,
            events,
        }
    }

    /// Bootstrap: fetch every known kind 10002 event, feeding every `r`
    /// tag into the pool. Best-effort — a relay that fails to answer is
    /// simply not added; it does not abort the bootstrap.
    pub async fn bootstrap(&self, seed_relays: &[String], sink: &dyn IngestSink) -> Result<usize> {
        let filter = NostrFilter::by_kinds(vec![BOOTSTRAP_KIND]).with_limit(self.config.batch_size);
        let events = self.pool.fetch(seed_relays, &filter, self.config.batch_size).await?;

        let mut new_relay_count = 0;
        for event in &events {
            for url in self.discovery.process_event(event) {
                self.pool.register(&url);
                new_relay_count += 1;
            }
        }

        if !events.is_empty() {
            sink.ingest_page(&events).await?;
        }
        info!(seed_count = seed_relays.len(), new_relay_count, "bootstrap complete");
        Ok(new_relay_count)
    }

    /// Content crawl: one task per configured kind, paginating backwards
    /// via `until` until a batch comes back strictly smaller than the
    /// configured batch size.
    pub async fn crawl_content(&self, relays: &[String], sink: Arc<dyn IngestSink>) -> Vec<CrawlReport> {
        let (tx, mut rx) = mpsc::channel(self.config.content_kinds.len().max(1));

        for &kind in &self.config.content_kinds {
            let pool = self.pool.clone();
            let discovery = self.discovery.clone();
            let relays = relays.to_vec();
            let batch_size = self.config.batch_size;
            let sink = sink.clone();
            let tx = tx.clone();

            tokio::spawn(async move {
                let report = crawl_kind(pool, discovery, relays, kind, batch_size, sink.as_ref()).await;
                let _ = tx.send(report).await;
            });
        }
        drop(tx);

        let mut reports = Vec::new();
        while let Some(report) = rx.recv().await {
            reports.push(report);
        }
        reports
    }

    /// Author-centric mode: identical pagination, scoped to a fixed set
    /// of authors rather than the kind priority list.
    pub async fn crawl_authors(&self, relays: &[String], authors: Vec<String>, kinds: Vec<u32>, sink: &dyn IngestSink) -> CrawlReport {
        let batch_size = self.config.batch_size;
        let mut until = now_unix();
        let mut total = 0;

        loop {
            let filter = NostrFilter::by_kinds(kinds.clone())
                .with_authors(authors.clone())
                .with_until(until)
                .with_limit(batch_size);

            let events = match self.pool.fetch(relays, &filter, batch_size).await {
                Ok(events) => events,
                Err(e) => return CrawlReport { kind: 0, state: CrawlState::Error(e.to_string()), events_ingested: total },
            };

            if events.is_empty() {
                break;
            }

            for event in &events {
                for url in self.discovery.process_event(event) {
                    self.pool.register(&url);
                    self.events.publish(RelayEvent::Discovered { url, source: "author_crawl".into() });
                }
            }

            let oldest = events.iter().map(|e| e.created_at).min().unwrap_or(until);
            let batch_len = events.len();
            if let Err(e) = sink.ingest_page(&events).await {
                return CrawlReport { kind: 0, state: CrawlState::Error(e.to_string()), events_ingested: total };
            }
            total += batch_len;

            if batch_len < batch_size as usize {
                break;
            }
            until = oldest - 1;
        }

        CrawlReport { kind: 0, state: CrawlState::Done, events_ingested: total }
    }

    /// Runs `crawl_content` on a fixed schedule until the returned handle
    /// is dropped or the process signals shutdown via `shutdown`.
    pub async fn run_scheduled(self: Arc<Self>, relays: Vec<String>, sink: Arc<dyn IngestSink>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = interval(std::time::Duration::from_secs(self.config.schedule_interval_secs));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let reports = self.crawl_content(&relays, sink.clone()).await;
                    for report in &reports {
                        if let CrawlState::Error(reason) = &report.state {
                            warn!(kind = report.kind, reason, "crawl task for kind failed");
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }
}

async fn crawl_kind(
    pool: Arc<RelayPoolManager>,
    discovery: Arc<DiscoveryState>,
    relays: Vec<String>,
    kind: u32,
    batch_size: u32,
    sink: &dyn IngestSink,
) -> CrawlReport {
    let mut until = now_unix();
    let mut total = 0;

    loop {
        let filter = NostrFilter::by_kinds(vec![kind]).with_until(until).with_limit(batch_size);

        let events = match pool.fetch(&relays, &filter, batch_size).await {
            Ok(events) => events,
            Err(e) => return CrawlReport { kind, state: CrawlState::Error(e.to_string()), events_ingested: total },
        };

        if events.is_empty() {
            return CrawlReport { kind, state: CrawlState::Done, events_ingested: total };
        }

        for event in &events {
            for url in discovery.process_event(event) {
                pool.register(&url);
            }
        }

        let oldest = events.iter().map(|e| e.created_at).min().unwrap_or(until);
        let batch_len = events.len();
        if let Err(e) = sink.ingest_page(&events).await {
            return CrawlReport { kind, state: CrawlState::Error(e.to_string()), events_ingested: total };
        }
        total += batch_len;

        if batch_len < batch_size as usize {
            return CrawlReport { kind, state: CrawlState::Done, events_ingested: total };
        }
        until = oldest - 1;
    }
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_config::RelayPoolConfig;
    use tokio::sync::Mutex;

    struct RecordingSink {
        pages: Mutex<Vec<usize>>,
    }

    #[async_trait::async_trait]
    impl IngestSink for RecordingSink {
        async fn ingest_page(&self, events: &[NostrEvent]) -> Result<()> {
            self.pages.lock().await.push(events.len());
            Ok(())
        }
    }

    #[tokio::test]
    async fn bootstrap_with_no_relays_ingests_nothing() {
        let pool = Arc::new(RelayPoolManager::new(RelayPoolConfig::default(), EventBus::new()).unwrap());
        let discovery = DiscoveryState::new();
        let crawler = AdaptiveCrawler::new(pool, discovery, CrawlerConfig::default(), EventBus::new());
        let sink = RecordingSink { pages: Mutex::new(Vec::new()) };

        let new_relays = crawler.bootstrap(&[], &sink).await.unwrap();
        assert_eq!(new_relays, 0);
        assert!(sink.pages.lock().await.is_empty());
    }

    #[tokio::test]
    async fn crawl_content_terminates_per_kind_when_fetch_is_empty() {
        let pool = Arc::new(RelayPoolManager::new(RelayPoolConfig::default(), EventBus::new()).unwrap());
        let discovery = DiscoveryState::new();
        let mut config = CrawlerConfig::default();
        config.content_kinds = vec![1, 30023];
        let crawler = Arc::new(AdaptiveCrawler::new(pool, discovery, config, EventBus::new()));
        let sink: Arc<dyn IngestSink> = Arc::new(RecordingSink { pages: Mutex::new(Vec::new()) });

        let reports = crawler.crawl_content(&["wss://relay.example".to_string()], sink).await;
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.state == CrawlState::Done));
    }
}
