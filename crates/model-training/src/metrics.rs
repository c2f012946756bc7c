//! Classification Metrics

use serde::{Deserialize, Serialize};

/// Area under the ROC curve from scores and 0/1 labels.
///
/// Rank-based (Mann-Whitney U) with tied scores sharing their average rank.
/// `None` when either class is absent.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Option<f64> {
    if labels.len() != scores.len() {
        return None;
    }
    let positives = labels.iter().filter(|&&l| l == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; ties share the mean of ranks i+1..=j+1
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if labels[idx] == 1 {
                positive_rank_sum += avg_rank;
            }
        }
        i = j + 1;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

/// Fraction of predictions equal to the labels
pub fn accuracy(labels: &[u8], predicted: &[u8]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = labels
        .iter()
        .zip(predicted)
        .filter(|(l, p)| l == p)
        .count();
    correct as f64 / labels.len() as f64
}

/// Threshold probabilities at 0.5
pub fn predict_labels(probabilities: &[f64]) -> Vec<u8> {
    probabilities.iter().map(|&p| u8::from(p >= 0.5)).collect()
}

/// Binary confusion matrix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(labels: &[u8], predicted: &[u8]) -> Self {
        let mut m = Self::default();
        for (&l, &p) in labels.iter().zip(predicted) {
            match (l, p) {
                (1, 1) => m.true_positive += 1,
                (1, _) => m.false_negative += 1,
                (_, 1) => m.false_positive += 1,
                _ => m.true_negative += 1,
            }
        }
        m
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Mean and population standard deviation
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_auc_perfect_and_inverted() {
        let labels = [0, 0, 1, 1];
        assert_eq!(roc_auc(&labels, &[0.1, 0.2, 0.8, 0.9]), Some(1.0));
        assert_eq!(roc_auc(&labels, &[0.9, 0.8, 0.2, 0.1]), Some(0.0));
    }

    #[test]
    fn test_auc_with_ties() {
        // Every score tied: chance level
        assert_eq!(roc_auc(&[0, 1, 0, 1], &[0.5; 4]), Some(0.5));
        // Positive 0.35 ranks below negative 0.4: 3 of 4 pairs ordered
        let auc = roc_auc(&[0, 0, 1, 1], &[0.1, 0.4, 0.35, 0.8]).unwrap();
        assert!((auc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_auc_single_class() {
        assert_eq!(roc_auc(&[1, 1], &[0.2, 0.3]), None);
        assert_eq!(roc_auc(&[0, 1], &[0.2]), None);
    }

    #[test]
    fn test_accuracy_and_confusion() {
        let labels = [1, 0, 1, 0];
        let predicted = [1, 1, 0, 0];
        assert_eq!(accuracy(&labels, &predicted), 0.5);

        let m = ConfusionMatrix::from_predictions(&labels, &predicted);
        assert_eq!(m.true_positive, 1);
        assert_eq!(m.false_positive, 1);
        assert_eq!(m.false_negative, 1);
        assert_eq!(m.true_negative, 1);
        assert_eq!(m.precision(), 0.5);
        assert_eq!(m.f1(), 0.5);
    }

    #[test]
    fn test_mean_std() {
        let (mean, std) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(mean, 5.0);
        assert_eq!(std, 2.0);
    }

    proptest! {
        #[test]
        fn prop_auc_in_unit_interval(
            rows in prop::collection::vec((0u8..2, 0.0f64..1.0), 2..60)
        ) {
            let labels: Vec<u8> = rows.iter().map(|r| r.0).collect();
            let scores: Vec<f64> = rows.iter().map(|r| r.1).collect();
            if let Some(auc) = roc_auc(&labels, &scores) {
                prop_assert!((0.0..=1.0).contains(&auc));
            }
        }
    }
}
