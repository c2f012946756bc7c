//! Prediction Log Repository

use crate::StorageError;
use alerting::{AlertLevel, AlertSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Upper bound on rows returned by [`PredictionLog::recent`]
pub const MAX_RECENT: u32 = 500;

/// One served prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Assigned by the database
    #[serde(default)]
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "vibracion")]
    pub vibration: f64,
    #[serde(rename = "temperatura")]
    pub temperature: f64,
    #[serde(rename = "presion")]
    pub pressure: f64,
    #[serde(rename = "corriente")]
    pub current: f64,
    #[serde(rename = "probabilidad_falla")]
    pub probability: f64,
    #[serde(rename = "nivel_alerta")]
    pub level: AlertLevel,
    #[serde(rename = "recomendacion")]
    pub recommendation: String,
    #[serde(rename = "modelo_utilizado")]
    pub model_name: String,
    /// Seconds spent serving the request
    #[serde(rename = "tiempo_respuesta")]
    pub response_time: f64,
}

/// Aggregates over the whole log
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionStatistics {
    #[serde(rename = "total_predicciones")]
    pub total: u64,
    #[serde(rename = "tiempo_respuesta_promedio")]
    pub mean_response_time: f64,
    #[serde(rename = "alertas_distribucion")]
    pub distribution: AlertSummary,
}

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS predicciones (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    vibracion REAL NOT NULL,
    temperatura REAL NOT NULL,
    presion REAL NOT NULL,
    corriente REAL NOT NULL,
    probabilidad_falla REAL NOT NULL,
    nivel_alerta TEXT NOT NULL,
    recomendacion TEXT NOT NULL,
    modelo_utilizado TEXT NOT NULL,
    tiempo_respuesta REAL NOT NULL
)
"#;

const CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_predicciones_nivel ON predicciones (nivel_alerta)";

/// SQLite-backed prediction log
#[derive(Debug, Clone)]
pub struct PredictionLog {
    pool: SqlitePool,
}

impl PredictionLog {
    /// Open (creating if missing) the database at `url` and apply the schema.
    /// `sqlite::memory:` keeps a single connection so the data survives.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let in_memory = url.contains(":memory:");
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 4 });
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;

        let log = Self { pool };
        log.migrate().await?;
        info!("Prediction log ready at {}", url);
        Ok(log)
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        for statement in [CREATE_TABLE, CREATE_INDEX] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Append a prediction and return its id
    pub async fn record(&self, record: &PredictionRecord) -> Result<i64, StorageError> {
        let id = sqlx::query(
            "INSERT INTO predicciones (timestamp, vibracion, temperatura, presion, corriente, \
             probabilidad_falla, nivel_alerta, recomendacion, modelo_utilizado, tiempo_respuesta) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.timestamp.to_rfc3339())
        .bind(record.vibration)
        .bind(record.temperature)
        .bind(record.pressure)
        .bind(record.current)
        .bind(record.probability)
        .bind(record.level.as_str())
        .bind(&record.recommendation)
        .bind(&record.model_name)
        .bind(record.response_time)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        debug!("Logged prediction {} ({})", id, record.level);
        Ok(id)
    }

    /// Most recent predictions first, optionally of one level.
    /// `limit` is capped at [`MAX_RECENT`].
    pub async fn recent(
        &self,
        level: Option<AlertLevel>,
        limit: u32,
    ) -> Result<Vec<PredictionRecord>, StorageError> {
        let limit = i64::from(limit.min(MAX_RECENT));
        let rows = match level {
            Some(level) => {
                sqlx::query(
                    "SELECT * FROM predicciones WHERE nivel_alerta = ? ORDER BY id DESC LIMIT ?",
                )
                .bind(level.as_str())
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT * FROM predicciones ORDER BY id DESC LIMIT ?")
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(record_from_row).collect()
    }

    /// Count, mean response time and per-level distribution
    pub async fn statistics(&self) -> Result<PredictionStatistics, StorageError> {
        let (total, mean): (i64, Option<f64>) =
            sqlx::query_as("SELECT COUNT(*), AVG(tiempo_respuesta) FROM predicciones")
                .fetch_one(&self.pool)
                .await?;

        let counts: Vec<(String, i64)> = sqlx::query_as(
            "SELECT nivel_alerta, COUNT(*) FROM predicciones GROUP BY nivel_alerta",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut distribution = AlertSummary::default();
        for (label, count) in counts {
            let count = usize::try_from(count).unwrap_or(0);
            match AlertLevel::parse(&label) {
                Some(AlertLevel::Normal) => distribution.normal = count,
                Some(AlertLevel::Warning) => distribution.warning = count,
                Some(AlertLevel::Critical) => distribution.critical = count,
                None => warn!("Ignoring unknown alert level '{}' in log", label),
            }
        }

        Ok(PredictionStatistics {
            total: u64::try_from(total).unwrap_or(0),
            mean_response_time: mean.unwrap_or(0.0),
            distribution,
        })
    }
}

fn record_from_row(row: &SqliteRow) -> Result<PredictionRecord, StorageError> {
    let timestamp: String = row.try_get("timestamp")?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp)
        .map_err(|e| StorageError::InvalidRecord(format!("timestamp '{timestamp}': {e}")))?
        .with_timezone(&Utc);

    let label: String = row.try_get("nivel_alerta")?;
    let level = AlertLevel::parse(&label)
        .ok_or_else(|| StorageError::InvalidRecord(format!("alert level '{label}'")))?;

    Ok(PredictionRecord {
        id: row.try_get("id")?,
        timestamp,
        vibration: row.try_get("vibracion")?,
        temperature: row.try_get("temperatura")?,
        pressure: row.try_get("presion")?,
        current: row.try_get("corriente")?,
        probability: row.try_get("probabilidad_falla")?,
        level,
        recommendation: row.try_get("recomendacion")?,
        model_name: row.try_get("modelo_utilizado")?,
        response_time: row.try_get("tiempo_respuesta")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_log() -> PredictionLog {
        PredictionLog::connect("sqlite::memory:").await.unwrap()
    }

    fn record(level: AlertLevel, probability: f64, response_time: f64) -> PredictionRecord {
        PredictionRecord {
            id: 0,
            timestamp: Utc::now(),
            vibration: 2.1,
            temperature: 72.0,
            pressure: 95.0,
            current: 14.5,
            probability,
            level,
            recommendation: level.recommendation().to_string(),
            model_name: "Random Forest".into(),
            response_time,
        }
    }

    #[tokio::test]
    async fn test_record_and_recent() {
        let log = memory_log().await;
        let first = log.record(&record(AlertLevel::Normal, 0.1, 0.01)).await.unwrap();
        let second = log.record(&record(AlertLevel::Critical, 0.9, 0.03)).await.unwrap();
        assert!(second > first);

        let recent = log.recent(None, 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, second);
        assert_eq!(recent[0].level, AlertLevel::Critical);
        assert_eq!(recent[1].probability, 0.1);
    }

    #[tokio::test]
    async fn test_recent_filters_by_level() {
        let log = memory_log().await;
        for level in [AlertLevel::Normal, AlertLevel::Warning, AlertLevel::Normal] {
            log.record(&record(level, 0.2, 0.01)).await.unwrap();
        }

        let normal = log.recent(Some(AlertLevel::Normal), 10).await.unwrap();
        assert_eq!(normal.len(), 2);
        assert!(normal.iter().all(|r| r.level == AlertLevel::Normal));

        let limited = log.recent(None, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_statistics() {
        let log = memory_log().await;
        assert_eq!(log.statistics().await.unwrap(), PredictionStatistics::default());

        log.record(&record(AlertLevel::Normal, 0.1, 0.010)).await.unwrap();
        log.record(&record(AlertLevel::Critical, 0.8, 0.030)).await.unwrap();
        log.record(&record(AlertLevel::Critical, 0.9, 0.020)).await.unwrap();

        let stats = log.statistics().await.unwrap();
        assert_eq!(stats.total, 3);
        assert!((stats.mean_response_time - 0.02).abs() < 1e-12);
        assert_eq!(stats.distribution.critical, 2);
        assert_eq!(stats.distribution.normal, 1);
        assert_eq!(stats.distribution.warning, 0);

        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["total_predicciones"], 3);
        assert_eq!(json["alertas_distribucion"]["CRÍTICO"], 2);
    }
}
