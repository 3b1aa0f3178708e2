//! listing-cache server entry point.
//!
//! Wires the storage tiers, caches, aggregation worker and bucket service,
//! then serves the REST and WebSocket endpoints.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use listing_cache::api;
use listing_cache::app_state::AppState;
use listing_cache::cache::{BucketCache, CacheTiers, ListingCache};
use listing_cache::config::CacheConfig;
use listing_cache::domain::EventBus;
use listing_cache::persistence::{
    DurableStore, FallbackStore, FileFallbackStore, NoFallbackStore, SqliteDurableStore,
    UnsupportedStore,
};
use listing_cache::service::{BucketService, ServiceSettings};
use listing_cache::worker::AggregationWorker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = CacheConfig::from_env().map_err(|err| anyhow::anyhow!("{err}"))?;
    tracing::info!(addr = %config.listen_addr, "starting listing-cache");

    let fallback: Arc<dyn FallbackStore> = match &config.fallback_dir {
        Some(dir) => Arc::new(FileFallbackStore::new(dir)),
        None => Arc::new(NoFallbackStore),
    };
    let event_bus = EventBus::new(config.event_bus_capacity);
    let durable = open_durable(&config).await;
    let tiers = CacheTiers::new(durable, fallback).with_events(event_bus.clone());

    let listings = Arc::new(ListingCache::new(tiers.clone()));
    let buckets = Arc::new(BucketCache::new(tiers));
    if let Some(warm) = listings.peek() {
        tracing::info!(
            count = warm.len(),
            updated_at = %warm.updated_at,
            "warm start from fallback"
        );
    }

    let worker = Arc::new(AggregationWorker::from_config(&config));
    let bucket_service = Arc::new(BucketService::new(
        listings,
        buckets,
        worker,
        ServiceSettings::from(&config),
    ));

    let app = api::build_app(AppState {
        bucket_service,
        event_bus,
    });

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Opens the SQLite tier, or reports an environment without durable storage.
async fn open_durable(config: &CacheConfig) -> Arc<dyn DurableStore> {
    let Some(url) = &config.database_url else {
        tracing::info!("durable store disabled");
        return Arc::new(UnsupportedStore);
    };
    let store = SqliteDurableStore::new(url.as_str(), config.database_max_connections);
    match store.open().await {
        Ok(()) => {
            tracing::info!(%url, "durable store opened");
            Arc::new(store)
        }
        Err(err) => {
            tracing::warn!(%err, %url, "durable store unavailable, continuing without it");
            Arc::new(UnsupportedStore)
        }
    }
}
