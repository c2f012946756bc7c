//! Predictive Maintenance API Server
//!
//! HTTP boundary over the inference engine, with the SQLite prediction log
//! and Prometheus metrics behind it.

use axum::{
    routing::{get, post},
    Router,
};
use inference_engine::InferenceEngine;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use storage::PredictionLog;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod error;
mod rate_limit;
pub mod routes;
mod settings;

pub use error::ApiError;
pub use rate_limit::{create_governor_config, RateLimitConfig};
pub use settings::{LoggingConfig, ServerConfig, Settings};

/// Application state shared across handlers. Read-only after startup.
pub struct AppState {
    pub engine: InferenceEngine,
    /// Prediction log, when a database is configured
    pub log: Option<PredictionLog>,
    /// Prometheus handle, when the recorder is installed
    pub metrics: Option<PrometheusHandle>,
    pub version: String,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        engine: InferenceEngine,
        log: Option<PredictionLog>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            engine,
            log,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>, settings: &Settings) -> Result<Router, ApiError> {
    let mut predictions = Router::new()
        .route("/predecir", post(routes::predictions::predict_one))
        .route("/predecir-lote", post(routes::predictions::predict_batch));
    if settings.rate_limit.enabled {
        let config = create_governor_config(&settings.rate_limit)?;
        predictions = predictions.layer(GovernorLayer { config });
    }

    let mut router = Router::new()
        .route("/", get(routes::info::root))
        .route("/health", get(routes::info::health))
        .route("/info-modelo", get(routes::info::model_info))
        .route("/ejemplo-datos", get(routes::info::example_input))
        .route("/estadisticas", get(routes::history::statistics))
        .route("/predicciones", get(routes::history::recent))
        .route("/metrics", get(routes::info::metrics))
        .merge(predictions)
        .layer(TraceLayer::new_for_http());
    if settings.server.permissive_cors {
        router = router.layer(CorsLayer::permissive());
    }

    Ok(router.with_state(state))
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), ApiError> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| ApiError::Config(format!("invalid log level '{}'", config.level)))?;
    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);

    if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
    .map_err(|e| ApiError::Config(format!("failed to set tracing subscriber: {e}")))
}

/// Install the global Prometheus recorder
pub fn install_metrics_recorder() -> Result<PrometheusHandle, ApiError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ApiError::Config(format!("failed to install metrics recorder: {e}")))
}

/// Run the server until Ctrl-C
pub async fn run_server(state: Arc<AppState>, settings: &Settings) -> Result<(), ApiError> {
    let app = create_router(state, settings)?;

    info!("Starting API server on {}", settings.server.bind);
    let listener = tokio::net::TcpListener::bind(&settings.server.bind).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutting down");
    })
    .await?;

    Ok(())
}
