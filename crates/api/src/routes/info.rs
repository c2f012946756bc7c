//! Service and Model Information Routes

use axum::{extract::State, Json};
use chrono::Utc;
use inference_engine::SensorInput;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{ApiError, AppState};
use alerting::AlertThresholds;

/// Service banner
pub async fn root(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "mensaje": "API de Mantenimiento Predictivo",
        "version": state.version,
        "estado": "operacional",
        "modelo_cargado": true,
    }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let artifact = state.engine.artifact();
    Json(json!({
        "status": "healthy",
        "modelo": artifact.model_name,
        "auc_modelo": artifact.metrics.auc,
        "uptime_segundos": state.start_time.elapsed().as_secs(),
        "timestamp": Utc::now(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    #[serde(rename = "nombre_modelo")]
    pub model_name: String,
    #[serde(rename = "metricas")]
    pub metrics: ModelInfoMetrics,
    #[serde(rename = "caracteristicas")]
    pub features: Vec<String>,
    #[serde(rename = "total_caracteristicas")]
    pub n_features: usize,
    #[serde(rename = "umbrales")]
    pub thresholds: AlertThresholds,
    #[serde(rename = "fecha_entrenamiento")]
    pub trained_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ModelInfoMetrics {
    pub auc: f64,
    pub accuracy: f64,
    pub cross_validation_mean: f64,
    pub cross_validation_std: f64,
}

/// Metrics, feature list and thresholds of the loaded model
pub async fn model_info(State(state): State<Arc<AppState>>) -> Json<ModelInfo> {
    let artifact = state.engine.artifact();
    let metrics = artifact.metrics;
    Json(ModelInfo {
        model_name: artifact.model_name.clone(),
        metrics: ModelInfoMetrics {
            auc: metrics.auc,
            accuracy: metrics.accuracy,
            cross_validation_mean: metrics.cv_mean,
            cross_validation_std: metrics.cv_std,
        },
        features: artifact.schema.names().to_vec(),
        n_features: artifact.n_features(),
        thresholds: state.engine.thresholds(),
        trained_at: artifact.trained_at,
    })
}

/// Sample payload for `/predecir`
pub async fn example_input() -> Json<SensorInput> {
    Json(SensorInput::example())
}

/// Prometheus exposition text
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<String, ApiError> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or_else(|| ApiError::Unavailable("Métricas no habilitadas".into()))
}
