//! Predictive Maintenance API - Main Entry Point

use alerting::AlertPolicy;
use anyhow::{Context, Result};
use api::{init_logging, install_metrics_recorder, run_server, AppState, Settings};
use inference_engine::InferenceEngine;
use std::sync::Arc;
use storage::PredictionLog;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config_file = std::env::args().nth(1);
    let settings = Settings::load(config_file.as_deref().or(Some("servicio")))
        .context("failed to load service settings")?;
    init_logging(&settings.logging)?;

    info!("=== Predictive Maintenance API v{} ===", env!("CARGO_PKG_VERSION"));

    let policy = AlertPolicy::new(settings.alerts)?;
    // No model, no service
    let engine = InferenceEngine::load(&settings.artifact_path, policy).with_context(|| {
        format!(
            "failed to load model artifact {}",
            settings.artifact_path.display()
        )
    })?;

    let log = match &settings.database_url {
        Some(url) => match PredictionLog::connect(url).await {
            Ok(log) => Some(log),
            Err(e) => {
                warn!("Prediction log disabled: {}", e);
                None
            }
        },
        None => None,
    };

    let metrics = if settings.metrics {
        Some(install_metrics_recorder()?)
    } else {
        None
    };

    let state = Arc::new(AppState::new(engine, log, metrics));
    run_server(state, &settings).await?;

    Ok(())
}
