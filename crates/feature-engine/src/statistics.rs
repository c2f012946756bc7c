//! Rolling Window Statistics

/// Statistics of one channel over a trailing window
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowStatistics {
    /// Mean value
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std_dev: f64,
    /// Maximum value
    pub max: f64,
    /// Minimum value
    pub min: f64,
}

impl WindowStatistics {
    /// Compute statistics from a slice of values, `None` when empty
    pub fn compute(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;

        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        let std_dev = if values.len() > 1 {
            let m2: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
            (m2 / (n - 1.0)).sqrt()
        } else {
            0.0
        };

        Some(Self {
            mean,
            std_dev,
            max,
            min,
        })
    }
}
