pub mod config;
pub mod error;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;

pub use config::Config;
pub use state::AppState;

use axum::Router;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Assemble the full axum app: routes + middleware stack, mirroring the
/// teacher's per-module `Router<AppState>` functions merged in `main.rs`
/// (here merged directly since this crate owns both lib and bin targets).
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::chat::chat_routes())
        .merge(routes::stream::stream_routes())
        .merge(routes::health::health_routes())
        .layer(axum::middleware::from_fn(middleware::security_headers_middleware))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    middleware::governor_layer(api)
}

/// Process entrypoint lifecycle (spec §4.14): `init()` opens pooled
/// connections and builds the breaker/cache stack, serves until a shutdown
/// signal, then drains in-flight requests (bounded) and flushes L3.
pub async fn run_server() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    observability::init_tracing(config.json_logs)?;

    let metrics_addr = config.metrics_addr.parse()?;
    observability::init_metrics(metrics_addr)?;

    let bind_addr = config.bind_addr.clone();
    let state = AppState::init(config).await?;
    let breakers_for_publisher = state.breakers.clone();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(15));
        loop {
            interval.tick().await;
            observability::metrics::publish_breaker_states(&breakers_for_publisher).await;
        }
    });

    let app = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tokio::time::timeout(Duration::from_secs(10), state.shutdown()).await.ok();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
