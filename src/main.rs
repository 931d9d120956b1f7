use std::sync::Arc;

use tower_http::cors::CorsLayer;

use pokedex_backend::api::{self, AppState};
use pokedex_backend::config::Config;
use pokedex_backend::db::{CatalogStore, Database};
use pokedex_backend::metrics;
use pokedex_backend::provider::{HttpProvider, ProviderClient};
use pokedex_backend::sync::Synchronizer;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    metrics::register_metrics();

    let config = Config::load();

    let db = Database::new(&config.database_url)
        .await
        .expect("Failed to initialize database");
    let store: Arc<dyn CatalogStore> = Arc::new(db);
    let provider: Arc<dyn ProviderClient> = Arc::new(
        HttpProvider::new(&config.provider_base_url, config.provider_timeout)
            .expect("Failed to initialize provider client"),
    );
    let sync = Arc::new(Synchronizer::new(
        store.clone(),
        provider,
        config.selection,
    ));

    if !config.prefetch.is_empty() {
        let resolved = sync.prefetch(&config.prefetch).await;
        tracing::info!(
            "Prefetched {resolved} of {} pokemon",
            config.prefetch.len()
        );
    }

    let app = api::router(AppState {
        store,
        sync,
        sync_timeout: config.sync_timeout,
    })
    .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!(
        provider = %config.provider_base_url,
        "Pokedex backend listening on port {}",
        config.port
    );
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
