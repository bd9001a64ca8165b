pub mod conditional;
pub mod handlers;
pub mod state;

use crate::{cache, config::Config};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    response::Response,
    routing::get,
};
use state::AppState;
use tokio_util::sync::CancellationToken;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::{error, info};

/// Response header carrying the crate version
pub const VERSION_HEADER: &str = "x-konsti-playlist-version";

async fn add_version_header(mut response: Response) -> Response {
    response.headers_mut().insert(
        VERSION_HEADER,
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    response
}

/// Build the router around an existing state
pub fn build_router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::health_check))
        .route("/health", get(handlers::health::health_check))
        .route("/api/playlist", get(handlers::playlist::serve_playlist))
        .route("/manifest.json", get(handlers::manifest::serve_manifest))
        .route("/metrics", get(handlers::metrics::serve_metrics))
        .layer(middleware::map_response(add_version_header))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the router with all routes and middleware
pub async fn build_router(config: Config) -> Router {
    build_router_with_state(AppState::new(config))
}

/// Resolve once Ctrl-C or SIGTERM arrives, then cancel `shutdown`
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    shutdown.cancel();
}

/// Start the Axum HTTP server
pub async fn start(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.listen_addr();

    // Create shared application state
    let state = AppState::new(config);
    let shutdown = CancellationToken::new();

    if let Some(interval) = state.config.purge_interval {
        cache::spawn_purge_task(state.store.clone(), interval, shutdown.clone());
    }

    info!("Serving playlist from {}", state.config.playlist_url);
    let app = build_router_with_state(state);

    // Bind TCP listener
    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("Server listening on http://{}", addr);

    // Start serving
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
    {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    shutdown.cancel();
    Ok(())
}
