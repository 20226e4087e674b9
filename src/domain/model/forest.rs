//! Bagged ensemble of regression trees.
//!
//! Trees are built in parallel over bootstrap samples; each tree's RNG is
//! seeded from the forest seed plus its index, so a fit is reproducible
//! regardless of thread scheduling.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use super::tree::{RegressionTree, TreeParams};
use crate::domain::error::StockscopeError;

#[derive(Debug, Clone)]
pub struct ForestParams {
    pub trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct Forest {
    trees: Vec<RegressionTree>,
    /// Relative variance-reduction shares, summing to 1.0 unless every
    /// tree degenerated to a single leaf.
    importances: Vec<f64>,
}

impl Forest {
    pub fn fit(
        rows: &[Vec<f64>],
        targets: &[f64],
        params: &ForestParams,
    ) -> Result<Forest, StockscopeError> {
        let n = rows.len();
        if n == 0 || n != targets.len() {
            return Err(StockscopeError::Training {
                reason: format!("design matrix has {n} rows for {} targets", targets.len()),
            });
        }
        if params.trees == 0 {
            return Err(StockscopeError::Training {
                reason: "ensemble requires at least one tree".into(),
            });
        }

        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
        };

        let trees: Vec<RegressionTree> = (0..params.trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(t as u64));
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(rows, targets, &sample, &tree_params)
            })
            .collect();

        let n_features = rows[0].len();
        let mut importances = vec![0.0; n_features];
        for tree in &trees {
            for (total, &imp) in importances.iter_mut().zip(tree.importances()) {
                *total += imp;
            }
        }
        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut importances {
                *imp /= sum;
            }
        }

        Ok(Forest { trees, importances })
    }

    /// Mean of the per-tree predictions.
    pub fn predict_row(&self, features: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict_row(features)).sum();
        total / self.trees.len() as f64
    }

    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params(trees: usize) -> ForestParams {
        ForestParams {
            trees,
            max_depth: 6,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }

    fn ramp_data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..n).map(|i| 3.0 * i as f64 + 1.0).collect();
        (rows, targets)
    }

    #[test]
    fn fits_and_tracks_a_trend() {
        let (rows, targets) = ramp_data(60);
        let forest = Forest::fit(&rows, &targets, &small_params(25)).unwrap();

        assert_eq!(forest.tree_count(), 25);
        let low = forest.predict_row(&[5.0]);
        let high = forest.predict_row(&[50.0]);
        assert!(high > low + 50.0);
    }

    #[test]
    fn same_seed_same_forest() {
        let (rows, targets) = ramp_data(40);
        let a = Forest::fit(&rows, &targets, &small_params(10)).unwrap();
        let b = Forest::fit(&rows, &targets, &small_params(10)).unwrap();

        for x in [0.0, 7.5, 21.0, 39.0] {
            assert_eq!(a.predict_row(&[x]), b.predict_row(&[x]));
        }
    }

    #[test]
    fn different_seed_changes_bootstrap() {
        let (rows, targets) = ramp_data(40);
        let a = Forest::fit(&rows, &targets, &small_params(10)).unwrap();
        let mut params = small_params(10);
        params.seed = 7;
        let b = Forest::fit(&rows, &targets, &params).unwrap();

        let diverges = [0.0, 7.5, 21.0, 39.0]
            .iter()
            .any(|&x| a.predict_row(&[x]) != b.predict_row(&[x]));
        assert!(diverges);
    }

    #[test]
    fn importances_sum_to_one() {
        let rows: Vec<Vec<f64>> = (0..50)
            .map(|i| vec![i as f64, (i % 3) as f64, 1.0])
            .collect();
        let targets: Vec<f64> = (0..50).map(|i| i as f64 * i as f64).collect();

        let forest = Forest::fit(&rows, &targets, &small_params(15)).unwrap();
        let sum: f64 = forest.importances().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        // The constant column can never split.
        assert_eq!(forest.importances()[2], 0.0);
    }

    #[test]
    fn rejects_empty_training_set() {
        let err = Forest::fit(&[], &[], &small_params(5)).unwrap_err();
        assert!(matches!(err, StockscopeError::Training { .. }));
    }

    #[test]
    fn rejects_zero_trees() {
        let (rows, targets) = ramp_data(20);
        let err = Forest::fit(&rows, &targets, &small_params(0)).unwrap_err();
        assert!(matches!(err, StockscopeError::Training { .. }));
    }
}
