//! Prediction Log Routes

use axum::{
    extract::{Query, State},
    Json,
};
use alerting::AlertLevel;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{PredictionLog, PredictionRecord, PredictionStatistics, MAX_RECENT};

use crate::{ApiError, AppState};

/// Query parameters for `/predicciones`
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// NORMAL, ADVERTENCIA or CRÍTICO
    pub nivel: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    #[serde(rename = "predicciones")]
    pub predictions: Vec<PredictionRecord>,
    pub total: usize,
}

fn prediction_log(state: &AppState) -> Result<&PredictionLog, ApiError> {
    state
        .log
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("Registro de predicciones no disponible".into()))
}

/// Totals over the prediction log
pub async fn statistics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PredictionStatistics>, ApiError> {
    let stats = prediction_log(&state)?.statistics().await?;
    Ok(Json(stats))
}

/// Most recent logged predictions
pub async fn recent(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let level = match params.nivel.as_deref() {
        Some(label) => Some(AlertLevel::parse(label).ok_or_else(|| {
            ApiError::BadRequest(format!("Nivel de alerta desconocido: {label}"))
        })?),
        None => None,
    };
    if params.limit > MAX_RECENT {
        return Err(ApiError::BadRequest(format!(
            "limit must be at most {MAX_RECENT}"
        )));
    }

    let predictions = prediction_log(&state)?.recent(level, params.limit).await?;
    Ok(Json(HistoryResponse {
        total: predictions.len(),
        predictions,
    }))
}
