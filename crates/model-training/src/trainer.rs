//! Model Training and Selection
//!
//! Engineers features for a labelled data set, fits the scaler on a
//! stratified training split, trains every candidate family, scores each on
//! the held-out split and by stratified cross-validation, then picks one.

use crate::metrics::{accuracy, mean_std, predict_labels, roc_auc, ConfusionMatrix};
use crate::split::{stratified_kfold, stratified_split};
use crate::synthetic::LabeledReading;
use crate::TrainingError;
use data_validator::StandardScaler;
use feature_engine::{engineer_readings, ChannelMeans, FeatureConfig, FeatureSchema};
use inference_engine::{Classifier, ModelArtifact, ModelFamily, ModelMetrics, TrainedModel};
use ndarray::{Array2, Axis};
use sensor_window::MachineSeries;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Instant;
use tracing::{debug, info};

/// Feature matrix and labels ready for training
#[derive(Debug, Clone)]
pub struct TrainingSet {
    /// Unscaled feature rows in schema order
    pub x: Array2<f64>,
    pub y: Vec<u8>,
    pub schema: FeatureSchema,
    pub feature_config: FeatureConfig,
    pub channel_means: ChannelMeans,
}

impl TrainingSet {
    /// Engineer the standard feature layout for every reading
    pub fn from_readings(
        data: &[LabeledReading],
        feature_config: FeatureConfig,
    ) -> Result<Self, TrainingError> {
        if data.is_empty() {
            return Err(TrainingError::InsufficientData("empty data set".into()));
        }

        let readings: Vec<_> = data.iter().map(|r| r.reading.clone()).collect();
        // Rolling features need each machine's readings in time order
        let machines = MachineSeries::group(readings.iter().cloned())?.len();
        let channel_means = ChannelMeans::from_readings(&readings);
        let vectors = engineer_readings(&readings, feature_config, channel_means)?;
        let schema = FeatureSchema::standard(&feature_config);

        let width = schema.len();
        let flat: Vec<f64> = vectors.into_iter().flat_map(|v| v.into_values()).collect();
        let x = Array2::from_shape_vec((data.len(), width), flat)?;
        let y = data.iter().map(|r| r.failure_imminent).collect();

        info!(
            "Prepared {} rows x {} features from {} machines",
            data.len(),
            width,
            machines
        );
        Ok(Self {
            x,
            y,
            schema,
            feature_config,
            channel_means,
        })
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// Trainer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub test_fraction: f64,
    pub cv_folds: usize,
    pub random_state: u64,
    /// Trees per model, family default when unset
    pub n_estimators: Option<usize>,
    pub families: Vec<ModelFamily>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            cv_folds: 5,
            random_state: 42,
            n_estimators: None,
            families: ModelFamily::ALL.to_vec(),
        }
    }
}

/// Evaluation of one trained candidate
#[derive(Debug, Clone)]
pub struct CandidateReport {
    pub family: ModelFamily,
    pub model_name: String,
    pub metrics: ModelMetrics,
    pub confusion: ConfusionMatrix,
    pub cv_scores: Vec<f64>,
    pub model: TrainedModel,
}

/// Pick the candidate with the highest test AUC; ties go to the higher
/// cross-validated mean, then to the alphabetically first model name.
pub fn select_best(candidates: &[CandidateReport]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| compare_candidates(a, b))
        .map(|(i, _)| i)
}

fn compare_candidates(a: &CandidateReport, b: &CandidateReport) -> Ordering {
    a.metrics
        .auc
        .total_cmp(&b.metrics.auc)
        .then(a.metrics.cv_mean.total_cmp(&b.metrics.cv_mean))
        .then_with(|| b.model_name.cmp(&a.model_name))
}

/// Every candidate plus the selected one and its preprocessing
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub candidates: Vec<CandidateReport>,
    pub selected: usize,
    pub scaler: StandardScaler,
    pub schema: FeatureSchema,
    pub feature_config: FeatureConfig,
    pub channel_means: ChannelMeans,
}

impl TrainingOutcome {
    pub fn best(&self) -> &CandidateReport {
        &self.candidates[self.selected]
    }

    /// Bundle the selected model with its scaler and schema
    pub fn into_artifact(mut self) -> Result<ModelArtifact, TrainingError> {
        let best = self.candidates.swap_remove(self.selected);
        Ok(ModelArtifact::new(
            best.model,
            self.scaler,
            self.schema,
            self.feature_config,
            self.channel_means,
            best.metrics,
        )?)
    }
}

pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Result<Self, TrainingError> {
        if config.families.is_empty() {
            return Err(TrainingError::InvalidConfig("no model families to train".into()));
        }
        if config.n_estimators == Some(0) {
            return Err(TrainingError::InvalidConfig("n_estimators must be > 0".into()));
        }
        Ok(Self { config })
    }

    fn build(&self, family: ModelFamily) -> TrainedModel {
        match self.config.n_estimators {
            Some(n) => family.build_with_estimators(self.config.random_state, n),
            None => family.build(self.config.random_state),
        }
    }

    /// Train and evaluate every family, then select one
    pub fn train(&self, set: &TrainingSet) -> Result<TrainingOutcome, TrainingError> {
        let split = stratified_split(&set.y, self.config.test_fraction, self.config.random_state)?;

        let train_rows: Vec<Vec<f64>> = split.train.iter().map(|&i| set.x.row(i).to_vec()).collect();
        let scaler = StandardScaler::fit(&train_rows)?;

        let x_train = scale(&scaler, &set.x.select(Axis(0), &split.train))?;
        let x_test = scale(&scaler, &set.x.select(Axis(0), &split.test))?;
        let y_train: Vec<u8> = split.train.iter().map(|&i| set.y[i]).collect();
        let y_test: Vec<u8> = split.test.iter().map(|&i| set.y[i]).collect();

        info!(
            "Training set: {} rows, test set: {} rows",
            y_train.len(),
            y_test.len()
        );

        let mut candidates = Vec::with_capacity(self.config.families.len());
        for &family in &self.config.families {
            candidates.push(self.evaluate(family, &x_train, &y_train, &x_test, &y_test)?);
        }

        let selected = select_best(&candidates)
            .ok_or_else(|| TrainingError::InvalidConfig("no candidates trained".into()))?;
        info!(
            "Selected model: {} (AUC {:.4})",
            candidates[selected].model_name, candidates[selected].metrics.auc
        );

        Ok(TrainingOutcome {
            candidates,
            selected,
            scaler,
            schema: set.schema.clone(),
            feature_config: set.feature_config,
            channel_means: set.channel_means,
        })
    }

    fn evaluate(
        &self,
        family: ModelFamily,
        x_train: &Array2<f64>,
        y_train: &[u8],
        x_test: &Array2<f64>,
        y_test: &[u8],
    ) -> Result<CandidateReport, TrainingError> {
        let start = Instant::now();
        info!("--- Training {} ---", family);

        let mut model = self.build(family);
        model.fit(x_train.view(), y_train)?;

        let probabilities = model.predict_probabilities(x_test.view())?;
        let auc = roc_auc(y_test, &probabilities).ok_or_else(|| {
            TrainingError::InsufficientData("test split must contain both classes".into())
        })?;
        let predicted = predict_labels(&probabilities);
        let acc = accuracy(y_test, &predicted);
        let confusion = ConfusionMatrix::from_predictions(y_test, &predicted);

        let cv_scores = self.cross_validate(family, x_train, y_train)?;
        let (cv_mean, cv_std) = mean_std(&cv_scores);

        info!("AUC: {:.4}", auc);
        info!("Accuracy: {:.4}", acc);
        info!("CV AUC: {:.4} (+/- {:.4})", cv_mean, cv_std * 2.0);
        debug!("{} trained and evaluated in {:?}", family, start.elapsed());

        Ok(CandidateReport {
            family,
            model_name: family.display_name().to_string(),
            metrics: ModelMetrics {
                auc,
                accuracy: acc,
                cv_mean,
                cv_std,
            },
            confusion,
            cv_scores,
            model,
        })
    }

    /// AUC of a fresh model on each stratified fold
    fn cross_validate(
        &self,
        family: ModelFamily,
        x: &Array2<f64>,
        y: &[u8],
    ) -> Result<Vec<f64>, TrainingError> {
        let folds = stratified_kfold(y, self.config.cv_folds)?;
        let mut scores = Vec::with_capacity(folds.len());

        for (k, fold) in folds.iter().enumerate() {
            let x_fit = x.select(Axis(0), &fold.train);
            let y_fit: Vec<u8> = fold.train.iter().map(|&i| y[i]).collect();
            let x_val = x.select(Axis(0), &fold.test);
            let y_val: Vec<u8> = fold.test.iter().map(|&i| y[i]).collect();

            let mut model = self.build(family);
            model.fit(x_fit.view(), &y_fit)?;
            let probabilities = model.predict_probabilities(x_val.view())?;
            let auc = roc_auc(&y_val, &probabilities).ok_or_else(|| {
                TrainingError::InsufficientData(format!("fold {k} lacks one class"))
            })?;
            debug!("{} fold {}: AUC {:.4}", family, k, auc);
            scores.push(auc);
        }
        Ok(scores)
    }
}

fn scale(scaler: &StandardScaler, x: &Array2<f64>) -> Result<Array2<f64>, TrainingError> {
    let mut out = x.clone();
    for mut row in out.rows_mut() {
        let scaled = scaler.transform(&row.to_vec())?;
        for (dst, v) in row.iter_mut().zip(scaled) {
            *dst = v;
        }
    }
    Ok(out)
}
