mod aggregator;
mod cache;
mod config;
pub mod provider;
mod provider_http;
pub mod runtime;
mod routes_data;
mod routes_search;
mod state;
mod store_exec;
#[cfg(test)]
mod testutil;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use kvstore::{FileBackedStorage, Storage, UnreachableStorage};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::aggregator::Aggregator;
use crate::cache::CacheStore;
use crate::config::AppConfig;
use crate::provider::Endpoints;
use crate::provider_http::HttpFetcher;
use crate::runtime::SystemClock;
use crate::state::{DataContext, SharedState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env()?;
    info!(
        base_url = %cfg.data_base_url,
        cache_enabled = cfg.cache_enabled,
        start_year = cfg.start_year,
        "dashboard config loaded"
    );

    let storage: Arc<dyn Storage> = match FileBackedStorage::new(&cfg.cache_file) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            warn!(path = %cfg.cache_file.display(), error = %e, "cache file unusable, running without cache");
            Arc::new(UnreachableStorage)
        }
    };
    let cache = CacheStore::probe(storage).await;

    let aggregator = Aggregator::new(
        Arc::new(HttpFetcher::new()),
        Endpoints::new(&cfg.data_base_url),
        cache,
        cfg.cache_policy(),
        Arc::new(SystemClock),
        cfg.start_year,
    );
    let ctx: SharedState = Arc::new(DataContext::new(aggregator));

    tokio::spawn({
        let ctx = ctx.clone();
        async move { ctx.load_data().await }
    });

    let addr = &cfg.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("dashboard listening on http://{addr}");
    axum::serve(listener, app(ctx)).await.context("server error")?;

    Ok(())
}

pub fn app(state: SharedState) -> Router {
    Router::new()
        .route("/data", get(routes_data::get_data))
        .route("/data/refetch", post(routes_data::post_refetch))
        .route("/summary", get(routes_data::get_summary))
        .route("/votes", get(routes_search::get_votes))
        .route("/proposals", get(routes_search::get_proposals))
        .route("/stats", get(routes_search::get_stats))
        .route("/search", get(routes_search::get_search))
        .route("/filters/:page", get(routes_search::get_filters))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
