//! Feature Vector Assembly

use crate::schema::FeatureSchema;
use crate::statistics::WindowStatistics;
use crate::FeatureError;
use chrono::{Datelike, Timelike};
use sensor_window::{SensorChannel, SensorReading, SlidingWindow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Window sizes used by feature engineering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Rolling window length (readings, current one included)
    pub window: usize,
    /// Trend lag: trend = value - value `trend_lag` readings earlier
    pub trend_lag: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            window: 10,
            trend_lag: 5,
        }
    }
}

impl FeatureConfig {
    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.window == 0 {
            return Err(FeatureError::InvalidConfig("window must be > 0".into()));
        }
        if self.trend_lag == 0 {
            return Err(FeatureError::InvalidConfig("trend_lag must be > 0".into()));
        }
        Ok(())
    }

    /// Readings of history needed for every derived value
    pub fn history_len(&self) -> usize {
        self.window.max(self.trend_lag + 1)
    }
}

/// Population mean of each channel over the training set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelMeans {
    means: [f64; 4],
}

impl ChannelMeans {
    pub fn new(vibration: f64, temperature: f64, pressure: f64, current: f64) -> Self {
        Self {
            means: [vibration, temperature, pressure, current],
        }
    }

    /// Compute means from a set of readings (all zeros when empty)
    pub fn from_readings<'a, I>(readings: I) -> Self
    where
        I: IntoIterator<Item = &'a SensorReading>,
    {
        let mut sums = [0.0; 4];
        let mut count = 0usize;
        for reading in readings {
            for (i, channel) in SensorChannel::ALL.iter().enumerate() {
                sums[i] += reading.value(*channel);
            }
            count += 1;
        }
        if count > 0 {
            for sum in sums.iter_mut() {
                *sum /= count as f64;
            }
        }
        Self { means: sums }
    }

    pub fn get(&self, channel: SensorChannel) -> f64 {
        self.means[Self::slot(channel)]
    }

    /// Sum over channels of value / channel mean; zero means contribute nothing
    pub fn degradation_index(&self, reading: &SensorReading) -> f64 {
        SensorChannel::ALL
            .iter()
            .map(|&channel| {
                let mean = self.get(channel);
                if mean.abs() > f64::EPSILON {
                    reading.value(channel) / mean
                } else {
                    0.0
                }
            })
            .sum()
    }

    fn slot(channel: SensorChannel) -> usize {
        match channel {
            SensorChannel::Vibration => 0,
            SensorChannel::Temperature => 1,
            SensorChannel::Pressure => 2,
            SensorChannel::Current => 3,
        }
    }
}

/// Feature values in the order of their schema
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    schema: Arc<FeatureSchema>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Assemble from named values: keys are exactly the schema's, absent
    /// ones default to 0.0 and names outside the schema are rejected.
    pub fn from_named(
        schema: Arc<FeatureSchema>,
        named: &BTreeMap<String, f64>,
    ) -> Result<Self, FeatureError> {
        let mut values = vec![0.0; schema.len()];
        for (name, value) in named {
            let idx = schema
                .index_of(name)
                .ok_or_else(|| FeatureError::UnknownFeature(name.clone()))?;
            values[idx] = *value;
        }
        Ok(Self { schema, values })
    }

    /// Wrap values already laid out in schema order
    pub(crate) fn from_ordered(schema: Arc<FeatureSchema>, values: Vec<f64>) -> Self {
        debug_assert_eq!(schema.len(), values.len());
        Self { schema, values }
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a named feature
    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema.index_of(name).map(|i| self.values[i])
    }

    /// (name, value) pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.schema
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn to_named(&self) -> BTreeMap<String, f64> {
        self.iter().map(|(k, v)| (k.to_string(), v)).collect()
    }
}

/// Derive the standard-layout row for the newest reading of a window.
/// Values needing more history than the window holds are `None`.
pub(crate) fn derive_row(
    window: &SlidingWindow,
    config: &FeatureConfig,
    means: &ChannelMeans,
) -> Vec<Option<f64>> {
    let mut row = Vec::with_capacity(FeatureSchema::standard_width());
    let Some(current) = window.latest() else {
        return vec![None; FeatureSchema::standard_width()];
    };

    for channel in SensorChannel::ALL {
        row.push(Some(current.value(channel)));
    }
    row.push(Some(current.time_since_maintenance));

    let full_window = window.len() >= config.window;
    let trailing: Vec<&SensorReading> = window.iter().rev().take(config.window).collect();

    for channel in SensorChannel::ALL {
        let stats = if full_window {
            let values: Vec<f64> = trailing.iter().map(|r| r.value(channel)).collect();
            WindowStatistics::compute(&values)
        } else {
            None
        };
        row.push(stats.map(|s| s.mean));
        row.push(stats.map(|s| s.std_dev));
        row.push(stats.map(|s| s.max));
        row.push(stats.map(|s| s.min));

        let trend = window
            .back(config.trend_lag)
            .map(|past| current.value(channel) - past.value(channel));
        row.push(trend);
    }

    row.push(Some(means.degradation_index(current)));
    row.push(Some(current.timestamp.hour() as f64));
    row.push(Some(current.timestamp.weekday().num_days_from_monday() as f64));

    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn reading_at(hour: u32, day: u32, value: f64) -> SensorReading {
        SensorReading {
            machine_id: "MAQ_01".into(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            vibration: value,
            temperature: value * 10.0,
            pressure: value * 20.0,
            current: value * 5.0,
            time_since_maintenance: 7.0,
        }
    }

    #[test]
    fn test_channel_means() {
        let readings = vec![reading_at(0, 1, 1.0), reading_at(1, 1, 3.0)];
        let means = ChannelMeans::from_readings(&readings);
        assert_eq!(means.get(SensorChannel::Vibration), 2.0);
        assert_eq!(means.get(SensorChannel::Temperature), 20.0);
        // At the mean every channel contributes 1.0
        assert!((means.degradation_index(&reading_at(0, 1, 2.0)) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_means_do_not_divide() {
        let means = ChannelMeans::from_readings(std::iter::empty());
        assert_eq!(means.degradation_index(&reading_at(0, 1, 2.0)), 0.0);
    }

    #[test]
    fn test_named_assembly_defaults_missing() {
        let schema = Arc::new(FeatureSchema::standard(&FeatureConfig::default()));
        let mut named = BTreeMap::new();
        named.insert("vibracion".to_string(), 2.1);
        named.insert("dia_semana".to_string(), 2.0);

        let vector = FeatureVector::from_named(schema.clone(), &named).unwrap();
        assert_eq!(vector.len(), schema.len());
        assert_eq!(vector.get("vibracion"), Some(2.1));
        assert_eq!(vector.get("corriente_media_10"), Some(0.0));
        assert_eq!(vector.values()[27], 2.0);
    }

    #[test]
    fn test_named_assembly_rejects_unknown() {
        let schema = Arc::new(FeatureSchema::standard(&FeatureConfig::default()));
        let mut named = BTreeMap::new();
        named.insert("humedad".to_string(), 40.0);

        let err = FeatureVector::from_named(schema, &named).unwrap_err();
        assert_eq!(err, FeatureError::UnknownFeature("humedad".into()));
    }

    #[test]
    fn test_derive_row_warm_up_and_calendar() {
        let config = FeatureConfig::default();
        let means = ChannelMeans::new(1.0, 1.0, 1.0, 1.0);
        let mut window = SlidingWindow::new(config.history_len()).unwrap();
        // 2024-01-03 is a Wednesday
        window.push(reading_at(14, 3, 1.0));

        let row = derive_row(&window, &config, &means);
        assert_eq!(row.len(), FeatureSchema::standard_width());
        assert_eq!(row[0], Some(1.0));
        assert_eq!(row[5], None); // vibracion_media_10
        assert_eq!(row[9], None); // vibracion_tendencia
        assert_eq!(row[26], Some(14.0));
        assert_eq!(row[27], Some(2.0));
    }

    #[test]
    fn test_derive_row_full_window() {
        let config = FeatureConfig::default();
        let means = ChannelMeans::new(1.0, 1.0, 1.0, 1.0);
        let mut window = SlidingWindow::new(config.history_len()).unwrap();
        for i in 0..10 {
            window.push(reading_at(i, 1, i as f64));
        }

        let row = derive_row(&window, &config, &means);
        assert_eq!(row[5], Some(4.5)); // mean of 0..=9
        assert_eq!(row[7], Some(9.0)); // max
        assert_eq!(row[8], Some(0.0)); // min
        assert_eq!(row[9], Some(5.0)); // 9 - 4
        assert_eq!(row[14], Some(50.0)); // temperature trend
    }

    #[test]
    fn test_config_validation() {
        assert!(FeatureConfig::default().validate().is_ok());
        let bad = FeatureConfig {
            window: 0,
            trend_lag: 5,
        };
        assert!(bad.validate().is_err());
        assert_eq!(FeatureConfig::default().history_len(), 10);
    }
}
