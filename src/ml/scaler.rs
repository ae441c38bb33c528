//! Per-feature standardization (zero mean, unit variance).

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::PredictionError;

/// Fitted standard scaler. Records the feature order it was fitted on.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StandardScaler {
    feature_names: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fits mean and population standard deviation per feature on row-major
    /// `rows`. NaN cells are ignored while fitting. Constant features get a
    /// scale of 1.
    pub fn fit(feature_names: Vec<String>, rows: &[Vec<f64>]) -> Self {
        let width = feature_names.len();
        let mut mean = Vec::with_capacity(width);
        let mut scale = Vec::with_capacity(width);

        for j in 0..width {
            let column = || rows.iter().map(|r| r[j]).filter(|v| !v.is_nan());
            let mu = if column().next().is_some() {
                column().mean()
            } else {
                0.0
            };
            let sigma = column().population_std_dev();

            mean.push(mu);
            scale.push(if sigma.is_finite() && sigma > 0.0 { sigma } else { 1.0 });
        }

        Self {
            feature_names,
            mean,
            scale,
        }
    }

    /// Training-time feature order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Applies `(x - mean) / scale` to every row.
    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, PredictionError> {
        rows.iter()
            .map(|row| {
                if row.len() != self.mean.len() {
                    return Err(PredictionError::FeatureCount {
                        expected: self.mean.len(),
                        actual: row.len(),
                    });
                }
                Ok(row
                    .iter()
                    .zip(self.mean.iter().zip(&self.scale))
                    .map(|(x, (mu, sigma))| (x - mu) / sigma)
                    .collect())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    #[test]
    fn test_fit_uses_population_std() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
        let scaler = StandardScaler::fit(names(2), &rows);

        assert_eq!(scaler.mean, [2.0, 10.0]);
        assert!((scaler.scale[0] - 1.0).abs() < 1e-12);
        // constant feature
        assert_eq!(scaler.scale[1], 1.0);
    }

    #[test]
    fn test_transform_standardizes() {
        let rows = vec![vec![2.0], vec![4.0], vec![6.0], vec![8.0]];
        let scaler = StandardScaler::fit(names(1), &rows);
        let scaled = scaler.transform(&rows).unwrap();

        let mean: f64 = scaled.iter().map(|r| r[0]).sum::<f64>() / 4.0;
        let var: f64 = scaled.iter().map(|r| r[0] * r[0]).sum::<f64>() / 4.0;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_transform_checks_width() {
        let scaler = StandardScaler::fit(names(2), &[vec![1.0, 2.0]]);
        let err = scaler.transform(&[vec![1.0]]).unwrap_err();
        assert!(matches!(
            err,
            PredictionError::FeatureCount {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_fit_ignores_nan() {
        let rows = vec![vec![1.0], vec![f64::NAN], vec![3.0]];
        let scaler = StandardScaler::fit(names(1), &rows);
        assert_eq!(scaler.mean, [2.0]);
    }
}
