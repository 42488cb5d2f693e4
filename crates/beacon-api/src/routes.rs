//! Route table and handlers for both HTTP contracts: the
//! FRPEI router (`/retrieve`, `/enrich`, `/rank`, `/explain`,
//! `/feedback`) and the Query Engine (`/search`, `/facets`), plus the
//! shared `/metrics` and `/status` snapshots.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use beacon_federation::RetrieveRequest;
use beacon_query::{RetrievalMode, RewriteOptions, SearchRequest};
use beacon_types::ports::Page;

use crate::dto::{
    EnrichBody, EnrichResponse, ExplainBody, ExplainResponse, FacetsQuery, FacetsResponse, FeedbackBody, FeedbackResponse,
    MetricsResponse, ProviderOutcome, ProviderStatus, QueryRewriteExplanationDto, RankBody, RankResponse, RetrieveBody,
    RetrieveMetrics, RetrieveResponse, SearchHit, SearchQuery, SearchResponse, StatusResponse,
};
use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/retrieve", post(retrieve))
        .route("/enrich", post(enrich))
        .route("/rank", post(rank))
        .route("/explain", post(explain))
        .route("/feedback", post(feedback))
        .route("/search", get(search))
        .route("/facets", get(facets))
        .route("/metrics", get(metrics))
        .route("/status", get(status))
        .with_state(state)
}

async fn retrieve(State(state): State<Arc<AppState>>, Json(body): Json<RetrieveBody>) -> Result<Json<RetrieveResponse>, ApiError> {
    if body.query.trim().is_empty() {
        return Err(ApiError::bad_request("`query` must not be empty"));
    }
    let request_id = uuid::Uuid::new_v4().to_string();
    let request: RetrieveRequest = body.into_request();
    let query = request.query.clone();

    let result = state.router.retrieve(&request).await?;

    let mut providers: Vec<ProviderOutcome> = state
        .router
        .breaker_states()
        .into_iter()
        .map(|(name, _)| ProviderOutcome { name, ok: true, error: None })
        .collect();
    for failure in &result.failures {
        if let Some(outcome) = providers.iter_mut().find(|p| p.name == failure.provider) {
            outcome.ok = false;
            outcome.error = Some(failure.error.clone());
        } else {
            providers.push(ProviderOutcome {
                name: failure.provider.clone(),
                ok: false,
                error: Some(failure.error.clone()),
            });
        }
    }

    let errors: Vec<String> = result
        .failures
        .iter()
        .map(|f| format!("{}: {}", f.provider, f.error))
        .collect();

    Ok(Json(RetrieveResponse {
        request_id,
        query,
        metrics: RetrieveMetrics {
            cache_hit: result.cache_hit,
            fell_back_to_local: result.fell_back_to_local,
            candidate_count: result.candidates.len(),
        },
        results: result.candidates,
        providers,
        errors,
    }))
}

async fn enrich(State(state): State<Arc<AppState>>, Json(body): Json<EnrichBody>) -> Result<Json<EnrichResponse>, ApiError> {
    let mut enriched = body.candidates;
    for candidate in &mut enriched {
        candidate.canonical = beacon_federation::canonicalize::canonicalize(candidate, state.ontology.as_ref()).await?;
    }
    for candidate in &mut enriched {
        beacon_federation::enrich::enrich(candidate, state.ontology.as_ref(), state.dictionary.as_ref()).await?;
    }
    Ok(Json(EnrichResponse { enriched }))
}

async fn rank(State(state): State<Arc<AppState>>, Json(body): Json<RankBody>) -> Result<Json<RankResponse>, ApiError> {
    let ranked = beacon_federation::rank::rank_candidates(body.candidates, state.feedback.as_ref()).await?;
    Ok(Json(RankResponse { ranked }))
}

async fn explain(Json(body): Json<ExplainBody>) -> Json<ExplainResponse> {
    Json(ExplainResponse {
        candidate_id: body.candidate.candidate_id.clone(),
        explanation: body.candidate.explanation.clone(),
    })
}

async fn feedback(State(state): State<Arc<AppState>>, Json(body): Json<FeedbackBody>) -> Result<(axum::http::StatusCode, Json<FeedbackResponse>), ApiError> {
    let request = body.into_request()?;
    let created_at = chrono::Utc::now();
    beacon_federation::feedback::record_feedback(request, state.feedback.as_ref(), &state.events).await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(FeedbackResponse {
            id: uuid::Uuid::new_v4(),
            created_at,
        }),
    ))
}

async fn search(State(state): State<Arc<AppState>>, Query(params): Query<SearchQuery>) -> Result<Json<SearchResponse>, ApiError> {
    if params.q.trim().is_empty() {
        return Err(ApiError::bad_request("`q` must not be empty"));
    }
    let mode = params.mode();
    let filter = params.filter();
    let rewrite_options = RewriteOptions {
        expand: Some(params.expand),
        enable_fuzzy: Some(params.enable_fuzzy),
        enable_abbrev: Some(params.enable_abbrev),
    };

    // `EmbeddingUnavailable`: with no embedder configured,
    // `vector`/`hybrid` degrade to a text-only ranking (the retriever
    // itself treats a missing embedder as zero vector contribution); the
    // route layer is responsible for surfacing that degradation as an
    // explicit warning rather than a silent score change.
    let warning = if state.embedder.is_none() && mode != RetrievalMode::Text {
        Some("embedding unavailable; degraded to text-only ranking".to_string())
    } else {
        None
    };

    let response = state
        .query_engine
        .search(SearchRequest {
            query: &params.q,
            mode,
            filter,
            page: Page {
                offset: params.offset,
                limit: params.limit,
            },
            rewrite_options,
        })
        .await?;

    let explanation = params.explain.then(|| QueryRewriteExplanationDto::from(&response.rewritten.explanation));

    Ok(Json(SearchResponse {
        hits: response
            .hits
            .into_iter()
            .map(|scored| SearchHit {
                document: scored.document,
                score: scored.score,
            })
            .collect(),
        vector_query: response.rewritten.vector_query,
        lexical_query: response.rewritten.lexical_query,
        explanation,
        warning,
    }))
}

async fn facets(State(state): State<Arc<AppState>>, Query(params): Query<FacetsQuery>) -> Result<Json<FacetsResponse>, ApiError> {
    let counts = state.query_engine.facets(&params.filter()).await?;
    Ok(Json(FacetsResponse::from(counts)))
}

async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsResponse> {
    let providers = state
        .router
        .breaker_states()
        .into_iter()
        .map(|(name, circuit_state)| ProviderStatus { name, circuit_state })
        .collect();
    Json(MetricsResponse {
        errors: state.events.metrics().snapshot(),
        providers,
    })
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let providers = state
        .router
        .breaker_states()
        .into_iter()
        .map(|(name, circuit_state)| ProviderStatus { name, circuit_state })
        .collect();
    Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        providers,
    })
}
