//! Sensor Readings and Sliding Windows
//!
//! Raw industrial sensor readings, per-machine ordered series and the bounded
//! windows used to derive rolling features.

mod buffer;
mod series;

pub use buffer::{SlidingWindow, WindowRegistry};
pub use series::MachineSeries;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire name of the elapsed-time-since-maintenance field
pub const TIME_SINCE_MAINTENANCE: &str = "tiempo_desde_mantenimiento";

/// Errors while building machine series
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WindowError {
    #[error("Reading for machine {machine_id} at {timestamp} is older than the last one ({last})")]
    OutOfOrder {
        machine_id: String,
        timestamp: NaiveDateTime,
        last: NaiveDateTime,
    },
    #[error("Reading for machine {actual} pushed into series of machine {expected}")]
    MachineMismatch { expected: String, actual: String },
    #[error("Window capacity must be greater than zero")]
    ZeroCapacity,
}

/// Physical sensor channel of a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SensorChannel {
    Vibration,
    Temperature,
    Pressure,
    Current,
}

impl SensorChannel {
    /// All channels, in feature order
    pub const ALL: [SensorChannel; 4] = [
        SensorChannel::Vibration,
        SensorChannel::Temperature,
        SensorChannel::Pressure,
        SensorChannel::Current,
    ];

    /// Field name used on the wire and as feature prefix
    pub fn name(&self) -> &'static str {
        match self {
            SensorChannel::Vibration => "vibracion",
            SensorChannel::Temperature => "temperatura",
            SensorChannel::Pressure => "presion",
            SensorChannel::Current => "corriente",
        }
    }
}

/// One measurement tuple for a machine at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(rename = "id_maquina")]
    pub machine_id: String,
    #[serde(rename = "fecha_hora")]
    pub timestamp: NaiveDateTime,
    #[serde(rename = "vibracion")]
    pub vibration: f64,
    #[serde(rename = "temperatura")]
    pub temperature: f64,
    #[serde(rename = "presion")]
    pub pressure: f64,
    #[serde(rename = "corriente")]
    pub current: f64,
    #[serde(rename = "tiempo_desde_mantenimiento")]
    pub time_since_maintenance: f64,
}

impl SensorReading {
    /// Value of a single channel
    pub fn value(&self, channel: SensorChannel) -> f64 {
        match channel {
            SensorChannel::Vibration => self.vibration,
            SensorChannel::Temperature => self.temperature,
            SensorChannel::Pressure => self.pressure,
            SensorChannel::Current => self.current,
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use chrono::NaiveDate;

    /// Reading `hour` hours after 2024-01-01 00:00 with every channel set to `value`
    pub fn reading(machine: &str, hour: i64, value: f64) -> SensorReading {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        SensorReading {
            machine_id: machine.to_string(),
            timestamp: start + chrono::Duration::hours(hour),
            vibration: value,
            temperature: value,
            pressure: value,
            current: value,
            time_since_maintenance: hour as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names_are_stable() {
        let names: Vec<_> = SensorChannel::ALL.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["vibracion", "temperatura", "presion", "corriente"]);
    }

    #[test]
    fn test_reading_value_by_channel() {
        let mut reading = testutil::reading("MAQ_01", 0, 1.0);
        reading.pressure = 120.0;
        assert_eq!(reading.value(SensorChannel::Pressure), 120.0);
        assert_eq!(reading.value(SensorChannel::Current), 1.0);
    }

    #[test]
    fn test_reading_wire_names() {
        let reading = testutil::reading("MAQ_02", 3, 2.5);
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["id_maquina"], "MAQ_02");
        assert_eq!(json["tiempo_desde_mantenimiento"], 3.0);
        assert_eq!(json["fecha_hora"], "2024-01-01T03:00:00");
    }
}
