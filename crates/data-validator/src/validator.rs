//! Named Sensor Input Validation

use crate::error::ValidationError;
use sensor_window::{SensorChannel, TIME_SINCE_MAINTENANCE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rule for one named field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    /// Inclusive valid range
    pub range: (f64, f64),
    /// Whether the field must be present
    pub required: bool,
}

impl FieldRule {
    pub fn required(name: &str, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            range: (min, max),
            required: true,
        }
    }

    pub fn optional(name: &str, min: f64, max: f64) -> Self {
        Self {
            name: name.to_string(),
            range: (min, max),
            required: false,
        }
    }
}

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub rules: Vec<FieldRule>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let mut rules = Vec::with_capacity(7);
        for channel in SensorChannel::ALL {
            let (min, max) = match channel {
                SensorChannel::Vibration => (0.0, 100.0),
                SensorChannel::Temperature => (-50.0, 400.0),
                SensorChannel::Pressure => (0.0, 1000.0),
                SensorChannel::Current => (0.0, 500.0),
            };
            rules.push(FieldRule::required(channel.name(), min, max));
        }
        rules.push(FieldRule::required(TIME_SINCE_MAINTENANCE, 0.0, 1.0e6));
        rules.push(FieldRule::optional("hora", 0.0, 23.0));
        rules.push(FieldRule::optional("dia_semana", 0.0, 6.0));
        Self { rules }
    }
}

/// Validator for named sensor inputs
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if value < range.0 || value > range.1 {
            Err(ValidationError::OutOfRange {
                field: field.to_string(),
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    /// Check every value is finite, required fields are present and ruled
    /// fields are in range. Fields without a rule only need to be finite.
    pub fn validate_fields(&self, fields: &BTreeMap<String, f64>) -> Result<(), ValidationError> {
        for (name, &value) in fields {
            if !value.is_finite() {
                return Err(ValidationError::NonFinite {
                    field: name.clone(),
                    value,
                });
            }
        }

        for rule in &self.config.rules {
            match fields.get(&rule.name) {
                Some(&value) => self.validate_range(&rule.name, value, rule.range)?,
                None if rule.required => {
                    return Err(ValidationError::MissingField(rule.name.clone()))
                }
                None => {}
            }
        }

        Ok(())
    }

    /// Names of the required fields
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.config
            .rules
            .iter()
            .filter(|r| r.required)
            .map(|r| r.name.as_str())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
