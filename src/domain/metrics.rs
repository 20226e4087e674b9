//! Regression accuracy metrics and the advisory confidence label.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionMetrics {
    pub rmse: f64,
    pub mae: f64,
    /// Coefficient of determination. Can be negative when the residual
    /// variance exceeds the target variance; never clamped.
    pub r2: f64,
}

impl RegressionMetrics {
    /// Compute RMSE, MAE and R² over paired actual/predicted values.
    /// Slices must be the same non-zero length.
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Self {
        assert_eq!(actual.len(), predicted.len());
        assert!(!actual.is_empty());
        let n = actual.len() as f64;

        let mut ss_res = 0.0;
        let mut abs_err = 0.0;
        for (a, p) in actual.iter().zip(predicted) {
            let err = a - p;
            ss_res += err * err;
            abs_err += err.abs();
        }

        let mean = actual.iter().sum::<f64>() / n;
        let ss_tot: f64 = actual.iter().map(|a| (a - mean) * (a - mean)).sum();

        let r2 = if ss_tot == 0.0 {
            0.0
        } else {
            1.0 - ss_res / ss_tot
        };

        RegressionMetrics {
            rmse: (ss_res / n).sqrt(),
            mae: abs_err / n,
            r2,
        }
    }
}

/// Advisory label derived from test-partition R². Informational only; it
/// never gates prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    High,
    Moderate,
    Low,
}

impl Confidence {
    pub fn from_r2(r2: f64) -> Self {
        if r2 >= 0.7 {
            Confidence::High
        } else if r2 >= 0.4 {
            Confidence::Moderate
        } else {
            Confidence::Low
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Moderate => write!(f, "moderate"),
            Confidence::Low => write!(f, "low"),
        }
    }
}
