//! Stratified Splitting

use crate::TrainingError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices of a train/test split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

fn class_indices(labels: &[u8]) -> [Vec<usize>; 2] {
    let mut classes = [Vec::new(), Vec::new()];
    for (i, &label) in labels.iter().enumerate() {
        classes[usize::from(label == 1)].push(i);
    }
    classes
}

/// Shuffled train/test split keeping the class ratio in both parts.
/// Each class contributes `round(n_class · test_fraction)` test rows.
pub fn stratified_split(labels: &[u8], test_fraction: f64, seed: u64) -> Result<Split, TrainingError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TrainingError::InvalidConfig(format!(
            "test_fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut split = Split {
        train: Vec::with_capacity(labels.len()),
        test: Vec::new(),
    };

    for mut rows in class_indices(labels) {
        if rows.is_empty() {
            continue;
        }
        rows.shuffle(&mut rng);
        let n_test = ((rows.len() as f64) * test_fraction).round() as usize;
        let n_test = n_test.min(rows.len().saturating_sub(1));
        split.test.extend_from_slice(&rows[..n_test]);
        split.train.extend_from_slice(&rows[n_test..]);
    }

    if split.test.is_empty() || split.train.is_empty() {
        return Err(TrainingError::InsufficientData(format!(
            "{} rows cannot be split with test fraction {test_fraction}",
            labels.len()
        )));
    }

    split.train.sort_unstable();
    split.test.sort_unstable();
    Ok(split)
}

/// Stratified k-fold without shuffling: the rows of each class are dealt
/// to folds in order, so every fold keeps the class ratio.
pub fn stratified_kfold(labels: &[u8], k: usize) -> Result<Vec<Split>, TrainingError> {
    if k < 2 {
        return Err(TrainingError::InvalidConfig(format!("cv folds must be >= 2, got {k}")));
    }
    let classes = class_indices(labels);
    if classes.iter().any(|c| c.len() < k) {
        return Err(TrainingError::InsufficientData(format!(
            "each class needs at least {k} rows for {k}-fold cross-validation"
        )));
    }

    let mut folds = vec![Vec::new(); k];
    for rows in &classes {
        // Contiguous chunks, the first `len % k` one row larger
        let base = rows.len() / k;
        let extra = rows.len() % k;
        let mut start = 0;
        for (f, fold) in folds.iter_mut().enumerate() {
            let size = base + usize::from(f < extra);
            fold.extend_from_slice(&rows[start..start + size]);
            start += size;
        }
    }

    Ok(folds
        .iter()
        .enumerate()
        .map(|(f, test)| {
            let mut test = test.clone();
            test.sort_unstable();
            let mut train: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(g, _)| *g != f)
                .flat_map(|(_, rows)| rows.iter().copied())
                .collect();
            train.sort_unstable();
            Split { train, test }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pos: usize, neg: usize) -> Vec<u8> {
        let mut y = vec![0u8; neg];
        y.extend(std::iter::repeat(1u8).take(pos));
        y
    }

    #[test]
    fn test_split_keeps_ratio() {
        let y = labels(20, 80);
        let split = stratified_split(&y, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);

        let test_pos = split.test.iter().filter(|&&i| y[i] == 1).count();
        assert_eq!(test_pos, 4);
    }

    #[test]
    fn test_split_is_seeded_and_disjoint() {
        let y = labels(30, 70);
        let a = stratified_split(&y, 0.2, 42).unwrap();
        let b = stratified_split(&y, 0.2, 42).unwrap();
        assert_eq!(a, b);
        assert!(a.test.iter().all(|i| !a.train.contains(i)));
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        assert!(stratified_split(&labels(5, 5), 1.5, 42).is_err());
        assert!(stratified_split(&labels(5, 5), 0.0, 42).is_err());
    }

    #[test]
    fn test_kfold_partitions_rows() {
        let y = labels(12, 38);
        let folds = stratified_kfold(&y, 5).unwrap();
        assert_eq!(folds.len(), 5);

        let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());

        for fold in &folds {
            assert_eq!(fold.train.len() + fold.test.len(), 50);
            let pos = fold.test.iter().filter(|&&i| y[i] == 1).count();
            assert!(pos == 2 || pos == 3);
        }
    }

    #[test]
    fn test_kfold_needs_rows_per_class() {
        assert!(stratified_kfold(&labels(3, 50), 5).is_err());
        assert!(stratified_kfold(&labels(10, 10), 1).is_err());
    }
}
