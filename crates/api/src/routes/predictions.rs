//! Prediction Routes

use axum::{extract::State, Json};
use chrono::Utc;
use inference_engine::{BatchOutcome, BatchPrediction, Prediction, PredictionOutcome, SensorInput};
use metrics::{counter, histogram};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use storage::PredictionRecord;
use tracing::warn;

use crate::{ApiError, AppState};

/// Body of `/predecir-lote`
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    #[serde(rename = "datos")]
    pub rows: Vec<SensorInput>,
}

/// Score one reading and append it to the prediction log
pub async fn predict_one(
    State(state): State<Arc<AppState>>,
    Json(input): Json<SensorInput>,
) -> Result<Json<Prediction>, ApiError> {
    let start = Instant::now();
    let prediction = match state.engine.predict_one(&input) {
        PredictionOutcome::Success(prediction) => prediction,
        PredictionOutcome::Failure(failure) => {
            counter!("prediction_failures_total").increment(1);
            return Err(ApiError::BadRequest(failure.error));
        }
    };
    let elapsed = start.elapsed().as_secs_f64();

    counter!("predictions_total", "nivel" => prediction.level.as_str()).increment(1);
    histogram!("prediction_duration_seconds").record(elapsed);

    // A failed log write never fails the request
    if let Some(log) = &state.log {
        let record = PredictionRecord {
            id: 0,
            timestamp: Utc::now(),
            vibration: input.get("vibracion").unwrap_or(0.0),
            temperature: input.get("temperatura").unwrap_or(0.0),
            pressure: input.get("presion").unwrap_or(0.0),
            current: input.get("corriente").unwrap_or(0.0),
            probability: prediction.probability,
            level: prediction.level,
            recommendation: prediction.recommendation.clone(),
            model_name: prediction.model_name.clone(),
            response_time: elapsed,
        };
        if let Err(e) = log.record(&record).await {
            warn!("Could not log prediction: {}", e);
        }
    }

    Ok(Json(prediction))
}

/// Score a batch on a blocking worker thread
pub async fn predict_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchPrediction>, ApiError> {
    let start = Instant::now();
    let worker = state.clone();
    let outcome = tokio::task::spawn_blocking(move || worker.engine.predict_batch(&request.rows))
        .await
        .map_err(|e| ApiError::Internal(format!("batch worker failed: {e}")))?;

    match outcome {
        BatchOutcome::Success(batch) => {
            for item in &batch.predictions {
                counter!("predictions_total", "nivel" => item.level.as_str()).increment(1);
            }
            histogram!("batch_duration_seconds").record(start.elapsed().as_secs_f64());
            Ok(Json(batch))
        }
        BatchOutcome::Failure(failure) => {
            counter!("prediction_failures_total").increment(1);
            Err(ApiError::BadRequest(failure.error))
        }
    }
}
