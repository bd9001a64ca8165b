use crate::{
    cache::CacheStore,
    config::Config,
    metrics,
    origin::OriginFetcher,
    playlist::{PlaylistExtractor, PlaylistService},
};
use metrics_exporter_prometheus::PrometheusHandle;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// The one cache instance every component writes to
    pub store: CacheStore,
    /// Fetch/extract pipeline for the configured playlist URL
    pub playlist: PlaylistService,
    /// Prometheus handle, if metrics are enabled and the recorder installed
    pub metrics: Option<PrometheusHandle>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
    /// Build stamp reported by `/health` (`YYYY.MM.DD-HH:MM:SS` at startup)
    pub build: String,
}

impl AppState {
    /// Create a new AppState with a fresh system-clock cache
    pub fn new(config: Config) -> Self {
        Self::with_store(config, CacheStore::system())
    }

    /// Create a new AppState around an existing cache
    pub fn with_store(config: Config, store: CacheStore) -> Self {
        let http_client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .timeout(config.fetch_timeout)
            .build()
            .expect("Failed to create HTTP client");

        let fetcher = OriginFetcher::new(http_client, store.clone(), config.cache_ttls);
        let extractor = PlaylistExtractor::new(store.clone(), config.cache_ttls.playlist);
        let playlist = PlaylistService::new(
            config.playlist_url.clone(),
            fetcher,
            extractor,
            store.clone(),
        );

        let metrics = if config.metrics_enabled {
            metrics::init()
        } else {
            None
        };

        Self {
            config: Arc::new(config),
            store,
            playlist,
            metrics,
            started_at: Instant::now(),
            build: chrono::Local::now().format("%Y.%m.%d-%H:%M:%S").to_string(),
        }
    }
}
