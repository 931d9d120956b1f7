// HTTP API routes: catalog lookups, health, and metrics.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::db::{CatalogStore, CreatureRecord, MoveRecord};
use crate::error::SyncError;
use crate::metrics;
use crate::sync::Synchronizer;

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub sync: Arc<Synchronizer>,
    pub sync_timeout: Duration,
}

// ── Response types ────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct PokemonMovesResponse {
    pub pokemon: CreatureRecord,
    pub moves: Vec<MoveRecord>,
}

// ── Error helper ──────────────────────────────────────────────────────

fn json_error(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "error": msg }))).into_response()
}

fn sync_error(e: SyncError) -> Response {
    match &e {
        SyncError::InvalidIdentifier(_) => json_error(StatusCode::BAD_REQUEST, &e.to_string()),
        SyncError::NotFound(_) => json_error(StatusCode::NOT_FOUND, &e.to_string()),
        SyncError::Validation(_) => json_error(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string()),
        SyncError::Fetch(_) => {
            tracing::warn!("Provider error: {e}");
            json_error(StatusCode::BAD_GATEWAY, "Failed to fetch pokemon from provider")
        }
        SyncError::TimedOut(_) => json_error(StatusCode::GATEWAY_TIMEOUT, &e.to_string()),
        SyncError::Store(_) => {
            tracing::error!("Database error: {e}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .route("/api/pokemon", get(list_pokemon))
        .route("/api/pokemon/{identifier}", get(get_pokemon))
        .route("/api/pokemon/{identifier}/moves", get(get_pokemon_moves))
        .layer(middleware::from_fn(track_metrics))
        .with_state(state)
}

async fn track_metrics(req: Request<Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let endpoint = metrics::normalize_path(req.uri().path());
    let started = Instant::now();

    let response = next.run(req).await;

    metrics::API_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint])
        .observe(started.elapsed().as_secs_f64());
    metrics::API_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), endpoint, response.status().as_str()])
        .inc();
    response
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "pokedex-backend" }))
}

async fn get_metrics() -> impl IntoResponse {
    (
        [("content-type", "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

async fn list_pokemon(State(state): State<AppState>) -> Response {
    match state.store.list_creatures().await {
        Ok(all) => (StatusCode::OK, Json(json!(all))).into_response(),
        Err(e) => sync_error(e.into()),
    }
}

async fn get_pokemon(State(state): State<AppState>, Path(identifier): Path<String>) -> Response {
    match state
        .sync
        .resolve_with_timeout(&identifier, state.sync_timeout)
        .await
    {
        Ok(pokemon) => (StatusCode::OK, Json(json!(pokemon))).into_response(),
        Err(e) => sync_error(e),
    }
}

async fn get_pokemon_moves(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Response {
    match state
        .sync
        .moves_for_with_timeout(&identifier, state.sync_timeout)
        .await
    {
        Ok((pokemon, moves)) => {
            (StatusCode::OK, Json(PokemonMovesResponse { pokemon, moves })).into_response()
        }
        Err(e) => sync_error(e),
    }
}
