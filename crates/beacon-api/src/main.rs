mod dto;
mod error;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use beacon_config::BeaconConfig;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "beacon-api")]
#[command(about = "Beacon Search FRPEI and Query Engine HTTP host")]
struct Args {
    #[arg(long, env = "BEACON_API_BIND", default_value = "0.0.0.0:8088")]
    bind: String,

    /// Comma-separated seed relay URLs for the Adaptive Crawler's
    /// bootstrap phase. Optional: a host may run only the query/FRPEI
    /// surface with no crawler at all.
    #[arg(long, env = "BEACON_CRAWLER_SEED_RELAYS", value_delimiter = ',')]
    seed_relays: Vec<String>,

    /// Disables the background crawl loop entirely, for hosts that only
    /// serve queries against an already-populated store.
    #[arg(long, env = "BEACON_CRAWLER_DISABLED")]
    no_crawl: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    tracing::info!(bind = %args.bind, "starting beacon-api");

    let config = BeaconConfig::from_env()?;
    tracing::info!(
        default_providers = ?config.frpei.default_providers,
        embedding_dimension = config.store.embedding_dimension,
        content_kinds = ?config.crawler.content_kinds,
        "configuration loaded"
    );

    // `Embed(text) -> vector` is an external collaborator.
    // No production embedder ships in this workspace; running without
    // `BEACON_STORE_EMBEDDING_ENDPOINT` set degrades vector/hybrid
    // search to text mode (`EmbeddingUnavailable`).
    let embedder: Option<Arc<dyn beacon_types::ports::Embedder>> = None;

    let state = AppState::build(config, embedder)?;

    if !args.no_crawl && !args.seed_relays.is_empty() {
        spawn_crawler(state.clone(), args.seed_relays);
    } else {
        tracing::info!("no seed relays configured; crawler is idle");
    }

    let app: Router = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = args.bind.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "beacon-api listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Runs the bootstrap phase once, then the scheduled content crawl loop,
/// on a detached task. A crawl failure is logged and retried on the next
/// scheduled tick by the crawl-per-kind state machine; it never brings
/// down the HTTP host.
fn spawn_crawler(state: Arc<AppState>, seed_relays: Vec<String>) {
    tokio::spawn(async move {
        let spam_filter = beacon_ingest::SpamFilter::new(state.config.spam_filter.clone());
        let sink: Arc<dyn beacon_relay::IngestSink> = Arc::new(state.ingestion_pipeline("nostr", spam_filter));

        match state.crawler.bootstrap(&seed_relays, sink.as_ref()).await {
            Ok(discovered) => tracing::info!(discovered, "bootstrap complete"),
            Err(err) => tracing::warn!(%err, "bootstrap failed; continuing with seed relays only"),
        }

        let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        state.crawler.clone().run_scheduled(seed_relays, sink, shutdown_rx).await;
    });
}
