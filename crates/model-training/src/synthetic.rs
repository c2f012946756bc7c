//! Synthetic Sensor Data
//!
//! Simulates machines that degrade with age. Each machine gets a lifetime
//! drawn from N(1000, 200); readings drift upward with `3 · age / lifetime`
//! and a reading is labelled as an imminent failure once any channel crosses
//! its limit or the machine passes 90% of its lifetime.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sensor_window::SensorReading;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::info;

/// Generator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Total readings, split evenly over machines
    pub n_samples: usize,
    pub n_machines: usize,
    pub seed: u64,
    /// Timestamp of the first reading; readings are hourly
    pub start: NaiveDateTime,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            n_samples: 10_000,
            n_machines: 10,
            seed: 42,
            start: NaiveDate::from_ymd_opt(2024, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
        }
    }
}

/// Reading with its training label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledReading {
    #[serde(flatten)]
    pub reading: SensorReading,
    /// 1 when failure is imminent
    #[serde(rename = "falla_inminente")]
    pub failure_imminent: u8,
    #[serde(rename = "vida_util_restante")]
    pub remaining_life: f64,
}

/// Failure limits per channel
const VIBRATION_LIMIT: f64 = 4.5;
const TEMPERATURE_LIMIT: f64 = 95.0;
const PRESSURE_LIMIT: f64 = 150.0;
const CURRENT_LIMIT: f64 = 25.0;
const END_OF_LIFE_FRACTION: f64 = 0.9;

/// Seeded normal sampler (Box-Muller)
pub struct NormalSampler {
    rng: StdRng,
}

impl NormalSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw from N(mean, std)
    pub fn sample(&mut self, mean: f64, std: f64) -> f64 {
        let u1: f64 = self.rng.gen::<f64>().max(1e-10);
        let u2: f64 = self.rng.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        mean + std * z
    }
}

/// Whether a reading is past any failure limit
pub fn is_failure_imminent(reading: &SensorReading, age: f64, lifetime: f64) -> bool {
    reading.vibration > VIBRATION_LIMIT
        || reading.temperature > TEMPERATURE_LIMIT
        || reading.pressure > PRESSURE_LIMIT
        || reading.current > CURRENT_LIMIT
        || age > lifetime * END_OF_LIFE_FRACTION
}

/// Generate the data set. Timestamps advance one hour per reading and keep
/// advancing from one machine to the next.
pub fn generate(config: &GeneratorConfig) -> Vec<LabeledReading> {
    let mut normal = NormalSampler::new(config.seed);
    let per_machine = if config.n_machines == 0 {
        0
    } else {
        config.n_samples / config.n_machines
    };

    let mut data = Vec::with_capacity(per_machine * config.n_machines);
    let mut timestamp = config.start;

    for machine in 1..=config.n_machines {
        let machine_id = format!("MAQ_{machine:02}");
        let lifetime = normal.sample(1000.0, 200.0);

        for step in 1..=per_machine {
            let age = step as f64;
            let degradation = age / lifetime * 3.0;

            let vibration_base = normal.sample(2.0, 0.2);
            let temperature_base = normal.sample(75.0, 5.0);
            let pressure_base = normal.sample(100.0, 10.0);
            let current_base = normal.sample(15.0, 2.0);

            let reading = SensorReading {
                machine_id: machine_id.clone(),
                timestamp,
                vibration: (vibration_base + degradation + normal.sample(0.0, 0.1)).max(0.0),
                temperature: (temperature_base + degradation * 5.0 + normal.sample(0.0, 1.0))
                    .max(0.0),
                pressure: (pressure_base + degradation * 8.0 + normal.sample(0.0, 2.0)).max(0.0),
                current: (current_base + degradation * 2.0 + normal.sample(0.0, 0.5)).max(0.0),
                time_since_maintenance: age,
            };
            let failure = is_failure_imminent(&reading, age, lifetime);

            data.push(LabeledReading {
                reading,
                failure_imminent: u8::from(failure),
                remaining_life: (lifetime - age).max(0.0),
            });
            timestamp += Duration::hours(1);
        }
    }

    let failures = data.iter().filter(|r| r.failure_imminent == 1).count();
    info!(
        "Generated {} readings for {} machines ({} imminent failures)",
        data.len(),
        config.n_machines,
        failures
    );
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> GeneratorConfig {
        GeneratorConfig {
            n_samples: 600,
            n_machines: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_generation_is_seeded() {
        assert_eq!(generate(&small()), generate(&small()));

        let other = GeneratorConfig {
            seed: 7,
            ..small()
        };
        assert_ne!(generate(&small()), generate(&other));
    }

    #[test]
    fn test_layout() {
        let data = generate(&small());
        assert_eq!(data.len(), 600);
        assert_eq!(data[0].reading.machine_id, "MAQ_01");
        assert_eq!(data[200].reading.machine_id, "MAQ_02");
        assert_eq!(data[0].reading.time_since_maintenance, 1.0);
        assert_eq!(data[200].reading.time_since_maintenance, 1.0);

        // Hourly and continuous across machines
        let step = data[200].reading.timestamp - data[199].reading.timestamp;
        assert_eq!(step, Duration::hours(1));
        assert_eq!(data[0].reading.timestamp, small().start);
    }

    #[test]
    fn test_values_are_non_negative_and_labelled() {
        for row in generate(&small()) {
            let r = &row.reading;
            assert!(r.vibration >= 0.0 && r.temperature >= 0.0);
            assert!(r.pressure >= 0.0 && r.current >= 0.0);
            assert!(row.failure_imminent <= 1);
            assert!(row.remaining_life >= 0.0);
        }
    }

    #[test]
    fn test_failure_rule() {
        let data = generate(&small());
        let mut reading = data[0].reading.clone();
        reading.vibration = 2.0;
        reading.temperature = 75.0;
        reading.pressure = 100.0;
        reading.current = 15.0;
        assert!(!is_failure_imminent(&reading, 10.0, 1000.0));
        assert!(is_failure_imminent(&reading, 901.0, 1000.0));
        reading.pressure = 151.0;
        assert!(is_failure_imminent(&reading, 10.0, 1000.0));
    }

    #[test]
    fn test_normal_sampler_moments() {
        let mut sampler = NormalSampler::new(42);
        let draws: Vec<f64> = (0..20_000).map(|_| sampler.sample(5.0, 2.0)).collect();
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        let var = draws.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / draws.len() as f64;
        assert!((mean - 5.0).abs() < 0.1);
        assert!((var.sqrt() - 2.0).abs() < 0.1);
    }

    #[test]
    fn test_json_wire_names() {
        let data = generate(&GeneratorConfig {
            n_samples: 1,
            n_machines: 1,
            ..Default::default()
        });
        let json = serde_json::to_value(&data[0]).unwrap();
        assert!(json.get("falla_inminente").is_some());
        assert!(json.get("vibracion").is_some());
        assert!(json.get("id_maquina").is_some());
    }
}
