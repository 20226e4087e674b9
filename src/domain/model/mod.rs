//! Forecast model training and prediction.
//!
//! Two regressor variants share one contract: a chronological 80/20
//! train/test split (never shuffled; shuffling a time series leaks future
//! information into training), min-max feature scaling fitted on the
//! training partition, and accuracy metrics on both partitions.

pub mod forest;
pub mod linear;
pub mod tree;

use std::fmt;
use std::str::FromStr;

use self::forest::{Forest, ForestParams};
use self::linear::{fit_ols, LinearModel};
use crate::domain::error::StockscopeError;
use crate::domain::features::FeatureTable;
use crate::domain::metrics::{Confidence, RegressionMetrics};

/// Minimum rows in the training partition for either variant.
pub const MIN_TRAIN_ROWS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Linear,
    Ensemble,
}

impl FromStr for ModelKind {
    type Err = StockscopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(ModelKind::Linear),
            "ensemble" => Ok(ModelKind::Ensemble),
            other => Err(StockscopeError::Validation {
                field: "model".into(),
                reason: format!("unknown model kind '{other}' (expected linear or ensemble)"),
            }),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Linear => write!(f, "linear"),
            ModelKind::Ensemble => write!(f, "ensemble"),
        }
    }
}

/// Fixed configuration; there is no hyperparameter search.
#[derive(Debug, Clone)]
pub struct Hyperparameters {
    pub trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
    pub train_fraction: f64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Hyperparameters {
            trees: 100,
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
            train_fraction: 0.8,
        }
    }
}

/// Per-column min-max scaling, fitted on the training partition only.
/// Columns that are constant in training scale to 0 everywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScaling {
    mins: Vec<f64>,
    maxs: Vec<f64>,
}

impl FeatureScaling {
    fn fit(rows: &[Vec<f64>]) -> FeatureScaling {
        let n_features = rows.first().map(Vec::len).unwrap_or(0);
        let mut mins = vec![f64::INFINITY; n_features];
        let mut maxs = vec![f64::NEG_INFINITY; n_features];
        for row in rows {
            for (j, &v) in row.iter().enumerate() {
                mins[j] = mins[j].min(v);
                maxs[j] = maxs[j].max(v);
            }
        }
        FeatureScaling { mins, maxs }
    }

    fn scale_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .enumerate()
            .map(|(j, &v)| {
                let range = self.maxs[j] - self.mins[j];
                if range == 0.0 {
                    0.0
                } else {
                    (v - self.mins[j]) / range
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
enum FittedParams {
    Linear(LinearModel),
    Ensemble(Forest),
}

/// Opaque result of a fit. Read-only; predictions apply the stored scaling
/// before dispatching to the fitted variant. Never persisted.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    kind: ModelKind,
    n_features: usize,
    scaling: FeatureScaling,
    params: FittedParams,
}

impl TrainedModel {
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn feature_count(&self) -> usize {
        self.n_features
    }

    /// Predict one close from a raw (unscaled) design vector.
    pub fn predict_row(&self, features: &[f64]) -> Result<f64, StockscopeError> {
        if features.len() != self.n_features {
            return Err(StockscopeError::Validation {
                field: "features".into(),
                reason: format!(
                    "expected {} feature columns, got {}",
                    self.n_features,
                    features.len()
                ),
            });
        }
        let scaled = self.scaling.scale_row(features);
        Ok(match &self.params {
            FittedParams::Linear(m) => m.predict_row(&scaled),
            FittedParams::Ensemble(f) => f.predict_row(&scaled),
        })
    }
}

/// Fit summary for both partitions plus the advisory confidence label and,
/// for the ensemble, per-feature importance shares.
#[derive(Debug, Clone)]
pub struct ModelReport {
    pub kind: ModelKind,
    pub train_rows: usize,
    pub test_rows: usize,
    pub train: RegressionMetrics,
    pub test: RegressionMetrics,
    pub confidence: Confidence,
    pub feature_importance: Option<Vec<(String, f64)>>,
}

/// Rows assigned to the training partition for a table of `n` rows.
pub fn train_partition_len(n: usize, train_fraction: f64) -> usize {
    (n as f64 * train_fraction).floor() as usize
}

/// Train a model on the feature table.
///
/// The first `train_fraction` of rows (chronological order) trains; the
/// remainder tests. Fails with `Training` when the training partition has
/// fewer than [`MIN_TRAIN_ROWS`] rows or the test partition is empty.
pub fn fit(
    table: &FeatureTable,
    kind: ModelKind,
    hp: &Hyperparameters,
) -> Result<(TrainedModel, ModelReport), StockscopeError> {
    if !(hp.train_fraction > 0.0 && hp.train_fraction < 1.0) {
        return Err(StockscopeError::Validation {
            field: "train_fraction".into(),
            reason: format!("{} is not between 0 and 1", hp.train_fraction),
        });
    }

    let rows = table.design_matrix();
    let targets = table.targets();
    let n = rows.len();
    let train_len = train_partition_len(n, hp.train_fraction);

    if train_len < MIN_TRAIN_ROWS {
        return Err(StockscopeError::Training {
            reason: format!(
                "training partition has {train_len} rows, need at least {MIN_TRAIN_ROWS}"
            ),
        });
    }
    if train_len >= n {
        return Err(StockscopeError::Training {
            reason: "test partition is empty".into(),
        });
    }

    let scaling = FeatureScaling::fit(&rows[..train_len]);
    let scaled: Vec<Vec<f64>> = rows.iter().map(|r| scaling.scale_row(r)).collect();

    let params = match kind {
        ModelKind::Linear => {
            FittedParams::Linear(fit_ols(&scaled[..train_len], &targets[..train_len])?)
        }
        ModelKind::Ensemble => FittedParams::Ensemble(Forest::fit(
            &scaled[..train_len],
            &targets[..train_len],
            &ForestParams {
                trees: hp.trees,
                max_depth: hp.max_depth,
                min_samples_split: hp.min_samples_split,
                min_samples_leaf: hp.min_samples_leaf,
                seed: hp.seed,
            },
        )?),
    };

    let predicted: Vec<f64> = scaled
        .iter()
        .map(|r| match &params {
            FittedParams::Linear(m) => m.predict_row(r),
            FittedParams::Ensemble(f) => f.predict_row(r),
        })
        .collect();

    let train = RegressionMetrics::compute(&targets[..train_len], &predicted[..train_len]);
    let test = RegressionMetrics::compute(&targets[train_len..], &predicted[train_len..]);

    let feature_importance = match &params {
        FittedParams::Linear(_) => None,
        FittedParams::Ensemble(f) => Some(
            table
                .feature_names()
                .iter()
                .map(|s| s.to_string())
                .zip(f.importances().iter().copied())
                .collect(),
        ),
    };

    let report = ModelReport {
        kind,
        train_rows: train_len,
        test_rows: n - train_len,
        train,
        test,
        confidence: Confidence::from_r2(test.r2),
        feature_importance,
    };

    let model = TrainedModel {
        kind,
        n_features: rows[0].len(),
        scaling,
        params,
    };

    Ok((model, report))
}

/// Predict closes for every row of a feature table.
pub fn predict(
    model: &TrainedModel,
    table: &FeatureTable,
) -> Result<Vec<f64>, StockscopeError> {
    table
        .rows
        .iter()
        .map(|row| model.predict_row(&row.design_vector()))
        .collect()
}
