//! Request Payloads and Prediction Results

use alerting::{AlertLevel, AlertSummary, AlertThresholds};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named numeric fields of one request row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorInput(pub BTreeMap<String, f64>);

impl SensorInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    pub fn fields(&self) -> &BTreeMap<String, f64> {
        &self.0
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Sample payload with every standard feature populated
    pub fn example() -> Self {
        let fields = [
            ("vibracion", 3.2),
            ("temperatura", 80.0),
            ("presion", 110.0),
            ("corriente", 16.0),
            ("tiempo_desde_mantenimiento", 500.0),
            ("vibracion_media_10", 3.0),
            ("vibracion_std_10", 0.3),
            ("vibracion_max_10", 3.5),
            ("vibracion_min_10", 2.8),
            ("vibracion_tendencia", 0.1),
            ("temperatura_media_10", 78.0),
            ("temperatura_std_10", 2.0),
            ("temperatura_max_10", 81.0),
            ("temperatura_min_10", 76.0),
            ("temperatura_tendencia", 1.0),
            ("presion_media_10", 105.0),
            ("presion_std_10", 5.0),
            ("presion_max_10", 112.0),
            ("presion_min_10", 100.0),
            ("presion_tendencia", 1.5),
            ("corriente_media_10", 15.5),
            ("corriente_std_10", 0.8),
            ("corriente_max_10", 16.5),
            ("corriente_min_10", 14.8),
            ("corriente_tendencia", 0.3),
            ("indice_degradacion", 1.8),
            ("hora", 14.0),
            ("dia_semana", 2.0),
        ];
        Self(
            fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, f64>> for SensorInput {
    fn from(fields: BTreeMap<String, f64>) -> Self {
        Self(fields)
    }
}

/// Probability and alert for one scored row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub probability: f64,
    pub level: AlertLevel,
    pub recommendation: &'static str,
}

/// Successful single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "exito")]
    pub success: bool,
    #[serde(rename = "probabilidad_falla")]
    pub probability: f64,
    #[serde(rename = "nivel_alerta")]
    pub level: AlertLevel,
    #[serde(rename = "recomendacion")]
    pub recommendation: String,
    #[serde(rename = "modelo_utilizado")]
    pub model_name: String,
    #[serde(rename = "timestamp_prediccion")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "umbrales")]
    pub thresholds: AlertThresholds,
}

/// Failed prediction, single or batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionFailure {
    #[serde(rename = "exito")]
    pub success: bool,
    pub error: String,
    #[serde(rename = "timestamp_prediccion")]
    pub timestamp: DateTime<Utc>,
}

impl PredictionFailure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Result of `predict_one`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionOutcome {
    Success(Prediction),
    Failure(PredictionFailure),
}

impl PredictionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PredictionOutcome::Success(_))
    }

    pub fn into_result(self) -> Result<Prediction, PredictionFailure> {
        match self {
            PredictionOutcome::Success(p) => Ok(p),
            PredictionOutcome::Failure(f) => Err(f),
        }
    }
}

/// One row of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    #[serde(rename = "indice")]
    pub index: usize,
    #[serde(rename = "probabilidad_falla")]
    pub probability: f64,
    #[serde(rename = "nivel_alerta")]
    pub level: AlertLevel,
    #[serde(rename = "recomendacion")]
    pub recommendation: String,
    #[serde(rename = "modelo_utilizado")]
    pub model_name: String,
    #[serde(rename = "timestamp_prediccion")]
    pub timestamp: DateTime<Utc>,
}

/// Successful batch prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPrediction {
    #[serde(rename = "exito")]
    pub success: bool,
    #[serde(rename = "total_registros")]
    pub total: usize,
    #[serde(rename = "predicciones")]
    pub predictions: Vec<BatchItem>,
    #[serde(rename = "resumen_alertas")]
    pub summary: AlertSummary,
    #[serde(rename = "umbrales")]
    pub thresholds: AlertThresholds,
}

/// Result of `predict_batch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchOutcome {
    Success(BatchPrediction),
    Failure(PredictionFailure),
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Success(_))
    }

    pub fn into_result(self) -> Result<BatchPrediction, PredictionFailure> {
        match self {
            BatchOutcome::Success(b) => Ok(b),
            BatchOutcome::Failure(f) => Err(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_payload_is_complete() {
        let example = SensorInput::example();
        assert_eq!(example.fields().len(), 28);
        assert_eq!(example.get("hora"), Some(14.0));
    }

    #[test]
    fn test_input_is_a_plain_json_object() {
        let input: SensorInput =
            serde_json::from_str(r#"{"vibracion": 2.1, "tiempo_desde_mantenimiento": 100}"#).unwrap();
        assert_eq!(input.get("vibracion"), Some(2.1));
        assert_eq!(input.get("tiempo_desde_mantenimiento"), Some(100.0));
        let back = serde_json::to_value(&input).unwrap();
        assert_eq!(back["vibracion"], 2.1);
    }

    #[test]
    fn test_failure_wire_shape() {
        let outcome = PredictionOutcome::Failure(PredictionFailure::new("bad input"));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["exito"], false);
        assert_eq!(json["error"], "bad input");
        assert!(json["timestamp_prediccion"].is_string());
        assert!(!outcome.is_success());
    }
}
