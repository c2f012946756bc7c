//! Streaming Feature Accumulator
//!
//! Keeps a sliding window per machine and emits one feature row per reading.
//! Rows produced before a machine has enough history are held back and
//! released backward-filled (each missing value takes the next value of the
//! same column in that machine's series) once the window is full. Rows still
//! held when the stream ends are forward-filled, and columns with no value at
//! all fall back to 0.0.

use crate::features::{derive_row, ChannelMeans, FeatureConfig, FeatureVector};
use crate::schema::FeatureSchema;
use crate::FeatureError;
use chrono::NaiveDateTime;
use sensor_window::{SensorReading, WindowRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Feature row for one reading
#[derive(Debug, Clone, PartialEq)]
pub struct EngineeredRow {
    /// Position of the reading in push order
    pub sequence: u64,
    pub machine_id: String,
    pub timestamp: NaiveDateTime,
    pub features: FeatureVector,
}

#[derive(Debug)]
struct PendingRow {
    sequence: u64,
    machine_id: String,
    timestamp: NaiveDateTime,
    values: Vec<Option<f64>>,
}

/// Per-machine rolling feature computation
pub struct FeatureAccumulator {
    config: FeatureConfig,
    means: ChannelMeans,
    schema: Arc<FeatureSchema>,
    windows: WindowRegistry,
    /// Rows waiting for a later value to backward-fill from, per machine
    backlog: HashMap<String, Vec<PendingRow>>,
    next_sequence: u64,
}

impl FeatureAccumulator {
    pub fn new(config: FeatureConfig, means: ChannelMeans) -> Result<Self, FeatureError> {
        config.validate()?;
        Ok(Self {
            config,
            means,
            schema: Arc::new(FeatureSchema::standard(&config)),
            windows: WindowRegistry::new(config.history_len())?,
            backlog: HashMap::new(),
            next_sequence: 0,
        })
    }

    /// Schema of every emitted row
    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    /// Number of rows held back, over all machines
    pub fn pending(&self) -> usize {
        self.backlog.values().map(Vec::len).sum()
    }

    /// Add a reading; returns the rows that became complete
    pub fn push(&mut self, reading: SensorReading) -> Result<Vec<EngineeredRow>, FeatureError> {
        let sequence = self.next_sequence;
        let machine_id = reading.machine_id.clone();
        let timestamp = reading.timestamp;

        let window = self.windows.push(reading)?;
        let values = derive_row(window, &self.config, &self.means);
        self.next_sequence += 1;

        let complete = values.iter().all(Option::is_some);
        let pending = PendingRow {
            sequence,
            machine_id: machine_id.clone(),
            timestamp,
            values,
        };

        let backlog = self.backlog.entry(machine_id).or_default();
        if complete && backlog.is_empty() {
            return Ok(vec![Self::materialize(&self.schema, pending)]);
        }

        backlog.push(pending);
        if !complete {
            return Ok(Vec::new());
        }

        debug!(
            "Machine {} warmed up, releasing {} rows",
            backlog[0].machine_id,
            backlog.len()
        );
        let mut rows = std::mem::take(backlog);
        fill_missing(&mut rows);
        Ok(rows
            .into_iter()
            .map(|row| Self::materialize(&self.schema, row))
            .collect())
    }

    /// Flush every held row (end of stream), ordered by sequence
    pub fn finish(&mut self) -> Vec<EngineeredRow> {
        let mut out = Vec::new();
        for (_, mut rows) in self.backlog.drain() {
            if rows.is_empty() {
                continue;
            }
            fill_missing(&mut rows);
            out.extend(rows.into_iter().map(|row| Self::materialize(&self.schema, row)));
        }
        out.sort_by_key(|row| row.sequence);
        out
    }

    fn materialize(schema: &Arc<FeatureSchema>, row: PendingRow) -> EngineeredRow {
        let values = row.values.into_iter().map(|v| v.unwrap_or(0.0)).collect();
        EngineeredRow {
            sequence: row.sequence,
            machine_id: row.machine_id,
            timestamp: row.timestamp,
            features: FeatureVector::from_ordered(schema.clone(), values),
        }
    }
}

/// Backward fill then forward fill, column by column
fn fill_missing(rows: &mut [PendingRow]) {
    let Some(width) = rows.first().map(|r| r.values.len()) else {
        return;
    };

    for col in 0..width {
        let mut next: Option<f64> = None;
        for row in rows.iter_mut().rev() {
            match row.values[col] {
                Some(v) => next = Some(v),
                None => row.values[col] = next,
            }
        }

        let mut prev: Option<f64> = None;
        for row in rows.iter_mut() {
            match row.values[col] {
                Some(v) => prev = Some(v),
                None => row.values[col] = prev,
            }
        }
    }
}

/// Engineer features for a batch of readings, returned in input order.
/// Readings of different machines may interleave; each machine's readings
/// must be in ascending time order.
pub fn engineer_readings(
    readings: &[SensorReading],
    config: FeatureConfig,
    means: ChannelMeans,
) -> Result<Vec<FeatureVector>, FeatureError> {
    let mut accumulator = FeatureAccumulator::new(config, means)?;
    let mut rows = Vec::with_capacity(readings.len());

    for reading in readings {
        rows.extend(accumulator.push(reading.clone())?);
    }
    rows.extend(accumulator.finish());
    rows.sort_by_key(|row| row.sequence);

    Ok(rows.into_iter().map(|row| row.features).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn reading(machine: &str, hour: i64, value: f64) -> SensorReading {
        SensorReading {
            machine_id: machine.into(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                + chrono::Duration::hours(hour),
            vibration: value,
            temperature: value,
            pressure: value,
            current: value,
            time_since_maintenance: hour as f64,
        }
    }

    fn accumulator() -> FeatureAccumulator {
        FeatureAccumulator::new(FeatureConfig::default(), ChannelMeans::new(1.0, 1.0, 1.0, 1.0))
            .unwrap()
    }

    #[test]
    fn test_warm_up_rows_are_held_back() {
        let mut acc = accumulator();
        for i in 0..9 {
            assert!(acc.push(reading("MAQ_01", i, i as f64)).unwrap().is_empty());
        }
        assert_eq!(acc.pending(), 9);

        let rows = acc.push(reading("MAQ_01", 9, 9.0)).unwrap();
        assert_eq!(rows.len(), 10);
        assert_eq!(acc.pending(), 0);

        // Rolling mean of rows 0..8 is backward-filled from row 9
        for row in &rows {
            assert_eq!(row.features.get("vibracion_media_10"), Some(4.5));
        }
        // Trend first exists at row 5 (5 - 0), rows 0..4 take it
        assert_eq!(rows[0].features.get("vibracion_tendencia"), Some(5.0));
        assert_eq!(rows[5].features.get("vibracion_tendencia"), Some(5.0));
        // Raw values are never filled
        assert_eq!(rows[3].features.get("vibracion"), Some(3.0));
    }

    #[test]
    fn test_rows_stream_after_warm_up() {
        let mut acc = accumulator();
        for i in 0..10 {
            acc.push(reading("MAQ_01", i, 1.0)).unwrap();
        }
        let rows = acc.push(reading("MAQ_01", 10, 12.0)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].sequence, 10);
        assert_eq!(rows[0].features.get("vibracion_max_10"), Some(12.0));
        assert_eq!(rows[0].features.get("vibracion_tendencia"), Some(11.0));
    }

    #[test]
    fn test_machines_do_not_share_windows() {
        let mut acc = accumulator();
        for i in 0..10 {
            acc.push(reading("MAQ_01", i, 100.0)).unwrap();
        }
        assert!(acc.push(reading("MAQ_02", 0, 1.0)).unwrap().is_empty());
        assert_eq!(acc.pending(), 1);
    }

    #[test]
    fn test_short_series_flushes_on_finish() {
        let mut acc = accumulator();
        for i in 0..7 {
            acc.push(reading("MAQ_03", i, i as f64)).unwrap();
        }
        let rows = acc.finish();
        assert_eq!(rows.len(), 7);
        // Trend exists from row 5 and is backward-filled
        assert_eq!(rows[0].features.get("vibracion_tendencia"), Some(5.0));
        // No full window ever existed: rolling columns default to zero
        assert_eq!(rows[6].features.get("vibracion_media_10"), Some(0.0));
        assert_eq!(acc.pending(), 0);
    }

    #[test]
    fn test_out_of_order_reading_is_an_error() {
        let mut acc = accumulator();
        acc.push(reading("MAQ_01", 3, 1.0)).unwrap();
        let err = acc.push(reading("MAQ_01", 2, 1.0)).unwrap_err();
        assert!(matches!(err, FeatureError::Window(_)));
    }

    #[test]
    fn test_engineer_readings_keeps_input_order() {
        let mut readings = Vec::new();
        for i in 0..12 {
            readings.push(reading("MAQ_01", i, i as f64));
            readings.push(reading("MAQ_02", i, 100.0 + i as f64));
        }
        let means = ChannelMeans::from_readings(&readings);
        let features = engineer_readings(&readings, FeatureConfig::default(), means).unwrap();

        assert_eq!(features.len(), readings.len());
        for (reading, vector) in readings.iter().zip(&features) {
            assert_eq!(vector.get("vibracion"), Some(reading.vibration));
            assert_eq!(vector.len(), 28);
        }
    }

    #[test]
    fn test_fill_forward_after_backward() {
        let mut rows = vec![
            PendingRow {
                sequence: 0,
                machine_id: "m".into(),
                timestamp: reading("m", 0, 0.0).timestamp,
                values: vec![Some(1.0), None],
            },
            PendingRow {
                sequence: 1,
                machine_id: "m".into(),
                timestamp: reading("m", 0, 0.0).timestamp,
                values: vec![None, Some(2.0)],
            },
        ];
        fill_missing(&mut rows);
        assert_eq!(rows[0].values, vec![Some(1.0), Some(2.0)]);
        assert_eq!(rows[1].values, vec![Some(1.0), Some(2.0)]);
    }
}
