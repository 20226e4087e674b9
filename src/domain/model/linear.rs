//! Ordinary least squares over the scaled design matrix.
//!
//! Solves the normal equations β = (XᵀX)⁻¹Xᵀy with an intercept column and
//! a tiny ridge term on the diagonal for numerical stability.

use ndarray::{Array1, Array2, Axis};

use crate::domain::error::StockscopeError;

const RIDGE: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    pub fn predict_row(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

/// Fit OLS coefficients on already-scaled feature rows.
pub fn fit_ols(rows: &[Vec<f64>], targets: &[f64]) -> Result<LinearModel, StockscopeError> {
    let n = rows.len();
    let n_features = rows.first().map(Vec::len).unwrap_or(0);
    if n == 0 || n != targets.len() {
        return Err(StockscopeError::Training {
            reason: format!("design matrix has {n} rows for {} targets", targets.len()),
        });
    }

    // Design matrix with a leading column of ones for the intercept.
    let mut x = Array2::<f64>::ones((n, n_features + 1));
    for (i, row) in rows.iter().enumerate() {
        for (j, &v) in row.iter().enumerate() {
            x[[i, j + 1]] = v;
        }
    }
    let y = Array1::from_vec(targets.to_vec());

    let xt = x.t();
    let mut xtx = xt.dot(&x);
    for i in 0..xtx.nrows() {
        xtx[[i, i]] += RIDGE;
    }
    let xty = xt.dot(&y);

    let beta = cholesky_solve(&xtx, &xty)?;
    let (intercept, coefficients) = beta.view().split_at(Axis(0), 1);

    Ok(LinearModel {
        intercept: intercept[0],
        coefficients: coefficients.to_vec(),
    })
}

/// Solve Ax = b for symmetric positive-definite A via Cholesky
/// decomposition with forward/back substitution.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, StockscopeError> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 0.0 {
                    return Err(StockscopeError::Training {
                        reason: "singular design matrix".into(),
                    });
                }
                l[[i, j]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }

    // L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }

    // Lᵀ x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in i + 1..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }

    Ok(x)
}
