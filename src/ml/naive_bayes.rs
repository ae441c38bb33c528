//! Gaussian naive Bayes with variance smoothing.
//!
//! Every per-class feature variance is widened by
//! `var_smoothing * max_j var(X[:, j])`, so features that are constant
//! overall or within one class keep a finite likelihood.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::debug;

use crate::error::TrainingError;

/// Fraction of the largest feature variance added to every variance.
pub const DEFAULT_VAR_SMOOTHING: f64 = 1e-9;

/// Trained Gaussian naive Bayes classifier.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GaussianNb {
    classes: Vec<u32>,
    log_priors: Vec<f64>,
    /// `means[c][j]`: mean of feature `j` within class `c`.
    means: Vec<Vec<f64>>,
    /// `variances[c][j]`: smoothed variance of feature `j` within class `c`.
    variances: Vec<Vec<f64>>,
}

impl GaussianNb {
    pub fn fit(x: &[Vec<f64>], y: &[u32], var_smoothing: f64) -> Result<Self, TrainingError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(TrainingError::Fit {
                model: "NaiveBayes".to_string(),
                reason: "samples and labels must be non-empty and aligned".to_string(),
            });
        }

        let n = x.len();
        let width = x[0].len();

        let max_variance = (0..width)
            .map(|j| x.iter().map(|row| row[j]).population_variance())
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max);
        let epsilon = var_smoothing * max_variance;
        // all-constant input still needs a positive floor
        let epsilon = if epsilon > 0.0 { epsilon } else { var_smoothing.max(f64::MIN_POSITIVE) };

        let mut classes = y.to_vec();
        classes.sort_unstable();
        classes.dedup();

        let mut log_priors = Vec::with_capacity(classes.len());
        let mut means = Vec::with_capacity(classes.len());
        let mut variances = Vec::with_capacity(classes.len());

        for class in &classes {
            let members: Vec<&Vec<f64>> = x
                .iter()
                .zip(y)
                .filter(|(_, label)| *label == class)
                .map(|(row, _)| row)
                .collect();

            log_priors.push((members.len() as f64 / n as f64).ln());
            means.push(
                (0..width)
                    .map(|j| members.iter().map(|row| row[j]).mean())
                    .collect(),
            );
            variances.push(
                (0..width)
                    .map(|j| members.iter().map(|row| row[j]).population_variance() + epsilon)
                    .collect(),
            );
        }

        debug!(
            "NaiveBayes fitted: {} classes over {} features, epsilon {:e}",
            classes.len(),
            width,
            epsilon
        );

        Ok(Self {
            classes,
            log_priors,
            means,
            variances,
        })
    }

    /// Joint log-likelihood of `row` under each class, in class order.
    pub fn joint_log_likelihood(&self, row: &[f64]) -> Vec<f64> {
        self.log_priors
            .iter()
            .zip(self.means.iter().zip(&self.variances))
            .map(|(prior, (means, variances))| {
                let log_pdf: f64 = row
                    .iter()
                    .zip(means.iter().zip(variances))
                    .map(|(value, (mean, var))| {
                        -0.5 * (2.0 * std::f64::consts::PI * var).ln()
                            - (value - mean).powi(2) / (2.0 * var)
                    })
                    .sum();
                prior + log_pdf
            })
            .collect()
    }

    /// Most likely class per row; ties go to the lower code.
    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<u32> {
        rows.iter()
            .map(|row| {
                let scores = self.joint_log_likelihood(row);
                let mut best = 0;
                for (idx, score) in scores.iter().enumerate() {
                    if score.total_cmp(&scores[best]).is_gt() {
                        best = idx;
                    }
                }
                self.classes[best]
            })
            .collect()
    }
}
