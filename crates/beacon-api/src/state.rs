//! Shared application state: the document store, the Query Engine, the
//! Federation Router, and the relay crawler, all built once at startup
//! from [`beacon_config::BeaconConfig`] and handed to every route as an
//! `Arc<AppState>`, grounded on the teacher's `AppState` (`riptide-api`'s
//! `state.rs`) but sized to this host's much smaller surface.

use std::collections::HashMap;
use std::sync::Arc;

use beacon_config::BeaconConfig;
use beacon_events::EventBus;
use beacon_federation::{FederationRouter, HttpSearchProvider, LocalProvider, ProviderRegistry, RetrievePipeline};
use beacon_ingest::IngestionPipeline;
use beacon_persistence::{InMemoryCache, InMemoryDictionaryStore, InMemoryDocumentStore, InMemoryFeedbackStore, InMemoryOntologyStore};
use beacon_query::{QueryEngine, QueryRewriter};
use beacon_reliability::http_client::{HttpConfig, ReliableHttpClient};
use beacon_relay::{AdaptiveCrawler, DiscoveryState, RelayPoolManager};
use beacon_types::ports::{DictionaryRepository, Embedder, FeedbackRepository, OntologyRepository, SearchProvider};
use beacon_types::Result;

/// Everything a route handler needs. Every store is the in-memory
/// adapter unless the host binary is built with the `postgres`/
/// `redis-cache` features, in which case `beacon-api`'s `main.rs` swaps
/// the concrete type in at construction time — the trait objects here
/// never change.
pub struct AppState {
    pub config: BeaconConfig,
    pub events: EventBus,
    pub documents: Arc<InMemoryDocumentStore>,
    pub ontology: Arc<InMemoryOntologyStore>,
    pub dictionary: Arc<InMemoryDictionaryStore>,
    pub feedback: Arc<InMemoryFeedbackStore>,
    pub query_engine: QueryEngine<InMemoryDocumentStore>,
    /// `None` when no `Embed(text) -> vector` backend is configured —
    /// an external collaborator by design. Routes use
    /// this to attach the `EmbeddingUnavailable` warning on `vector`/
    /// `hybrid` searches instead of silently returning a text-only
    /// ranking with no explanation.
    pub embedder: Option<Arc<dyn Embedder>>,
    pub router: FederationRouter,
    pub pool: Arc<RelayPoolManager>,
    pub discovery: Arc<DiscoveryState>,
    pub crawler: Arc<AdaptiveCrawler>,
}

impl AppState {
    /// Wires every component crate together exactly once, at process
    /// start. No route handler constructs infrastructure of its own.
    pub fn build(config: BeaconConfig, embedder: Option<Arc<dyn Embedder>>) -> Result<Arc<Self>> {
        let events = EventBus::new();

        let documents = Arc::new(InMemoryDocumentStore::new());
        let ontology = Arc::new(InMemoryOntologyStore::new());
        let dictionary = Arc::new(InMemoryDictionaryStore::new());
        let feedback = Arc::new(InMemoryFeedbackStore::new());
        let cache = Arc::new(InMemoryCache::new());

        let query_engine = QueryEngine::new(
            documents.clone(),
            ontology.clone() as Arc<dyn OntologyRepository>,
            dictionary.clone() as Arc<dyn DictionaryRepository>,
            embedder.clone(),
            config.query_rewrite.clone(),
            config.facets.clone(),
        );

        let rewriter = Arc::new(QueryRewriter::new(
            ontology.clone() as Arc<dyn OntologyRepository>,
            dictionary.clone() as Arc<dyn DictionaryRepository>,
            config.query_rewrite.clone(),
        ));

        let mut providers: ProviderRegistry = HashMap::new();
        providers.insert(
            "local".into(),
            Arc::new(LocalProvider::new(documents.clone(), embedder.clone(), rewriter.clone())) as Arc<dyn SearchProvider>,
        );
        if let Some(web_url) = std::env::var("BEACON_FRPEI_WEB_URL").ok() {
            let client = ReliableHttpClient::new("web", HttpConfig::default())?;
            providers.insert("web".into(), Arc::new(HttpSearchProvider::web(web_url, client)) as Arc<dyn SearchProvider>);
        }
        if let Some(media_url) = std::env::var("BEACON_FRPEI_MEDIA_URL").ok() {
            let client = ReliableHttpClient::new("media", HttpConfig::default())?;
            providers.insert("media".into(), Arc::new(HttpSearchProvider::media(media_url, client)) as Arc<dyn SearchProvider>);
        }

        let pipeline = RetrievePipeline::new(providers, cache, config.frpei.clone(), events.clone());
        let router = FederationRouter::new(
            pipeline,
            ontology.clone() as Arc<dyn OntologyRepository>,
            dictionary.clone() as Arc<dyn DictionaryRepository>,
            feedback.clone() as Arc<dyn FeedbackRepository>,
        );

        let pool = Arc::new(RelayPoolManager::new(config.relay_pool.clone(), events.clone())?);
        let discovery = DiscoveryState::new();
        let crawler = Arc::new(AdaptiveCrawler::new(pool.clone(), discovery.clone(), config.crawler.clone(), events.clone()));

        Ok(Arc::new(Self {
            config,
            events,
            documents,
            ontology,
            dictionary,
            feedback,
            query_engine,
            embedder,
            router,
            pool,
            discovery,
            crawler,
        }))
    }

    /// An [`IngestionPipeline`] bound to this state's document store,
    /// for the host's background crawl task to drive.
    pub fn ingestion_pipeline(&self, source_id: impl Into<String>, spam_filter: beacon_ingest::SpamFilter) -> IngestionPipeline<InMemoryDocumentStore> {
        IngestionPipeline::new(source_id, spam_filter, self.documents.clone(), self.events.clone())
    }
}
