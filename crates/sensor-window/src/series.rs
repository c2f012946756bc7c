//! Per-Machine Reading Series

use crate::{SensorReading, WindowError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ordered readings of one machine, timestamps ascending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSeries {
    machine_id: String,
    readings: Vec<SensorReading>,
}

impl MachineSeries {
    pub fn new(machine_id: impl Into<String>) -> Self {
        Self {
            machine_id: machine_id.into(),
            readings: Vec::new(),
        }
    }

    /// Append a reading; it must belong to this machine and not go back in time
    pub fn push(&mut self, reading: SensorReading) -> Result<(), WindowError> {
        if reading.machine_id != self.machine_id {
            return Err(WindowError::MachineMismatch {
                expected: self.machine_id.clone(),
                actual: reading.machine_id,
            });
        }
        if let Some(last) = self.readings.last() {
            if reading.timestamp < last.timestamp {
                return Err(WindowError::OutOfOrder {
                    machine_id: reading.machine_id,
                    timestamp: reading.timestamp,
                    last: last.timestamp,
                });
            }
        }
        self.readings.push(reading);
        Ok(())
    }

    /// Group readings into per-machine series, machines in first-seen order
    pub fn group<I>(readings: I) -> Result<Vec<MachineSeries>, WindowError>
    where
        I: IntoIterator<Item = SensorReading>,
    {
        let mut order: HashMap<String, usize> = HashMap::new();
        let mut series: Vec<MachineSeries> = Vec::new();

        for reading in readings {
            let idx = match order.get(&reading.machine_id) {
                Some(&idx) => idx,
                None => {
                    order.insert(reading.machine_id.clone(), series.len());
                    series.push(MachineSeries::new(reading.machine_id.clone()));
                    series.len() - 1
                }
            };
            series[idx].push(reading)?;
        }

        Ok(series)
    }

    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    pub fn readings(&self) -> &[SensorReading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}
