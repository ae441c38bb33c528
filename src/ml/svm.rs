//! Multi-class RBF support vector machine.
//!
//! One-vs-rest binary machines trained with the kernelized Pegasos
//! sub-gradient method. Each binary problem keeps a count `alpha[i]` of the
//! margin violations of sample `i`; the decision function is
//!
//! ```text
//! f(x) = 1 / (lambda * T) * sum_i alpha[i] * y[i] * K(x[i], x)
//! ```
//!
//! with `lambda = 1 / (C * n)` and `T = epochs * n` sampled steps. Only
//! samples with a non-zero count in any class are kept as support vectors.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::debug;

use crate::error::TrainingError;

/// Hyper-parameters for [`RbfSvm`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SvmParameters {
    /// Inverse regularization strength.
    pub c: f64,
    /// Kernel width. `None` uses `1 / (n_features * var(X))`.
    pub gamma: Option<f64>,
    /// Passes over the training set.
    pub epochs: usize,
    /// Sampling seed.
    pub seed: u64,
}

impl Default for SvmParameters {
    fn default() -> Self {
        Self {
            c: 1.0,
            gamma: None,
            epochs: 10,
            seed: 42,
        }
    }
}

/// Trained one-vs-rest RBF SVM.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RbfSvm {
    gamma: f64,
    classes: Vec<u32>,
    support_vectors: Vec<Vec<f64>>,
    /// `coefficients[c][s]`: weight of support vector `s` for class `c`.
    coefficients: Vec<Vec<f64>>,
}

impl RbfSvm {
    pub fn fit(x: &[Vec<f64>], y: &[u32], params: &SvmParameters) -> Result<Self, TrainingError> {
        let fail = |reason: &str| TrainingError::Fit {
            model: "SVM".to_string(),
            reason: reason.to_string(),
        };

        if x.is_empty() || x.len() != y.len() {
            return Err(fail("samples and labels must be non-empty and aligned"));
        }
        if params.c <= 0.0 || params.epochs == 0 {
            return Err(fail("C and epochs must be positive"));
        }

        let n = x.len();
        let gamma = params.gamma.unwrap_or_else(|| scale_gamma(x));
        let mut classes = y.to_vec();
        classes.sort_unstable();
        classes.dedup();

        if classes.len() == 1 {
            return Ok(Self {
                gamma,
                classes,
                support_vectors: Vec::new(),
                coefficients: vec![Vec::new()],
            });
        }

        let lambda = 1.0 / (params.c * n as f64);
        let steps = params.epochs * n;
        let mut rng = StdRng::seed_from_u64(params.seed);

        let mut alphas: Vec<Vec<u32>> = Vec::with_capacity(classes.len());
        for class in &classes {
            let signs: Vec<f64> = y
                .iter()
                .map(|label| if label == class { 1.0 } else { -1.0 })
                .collect();
            alphas.push(pegasos(x, &signs, gamma, lambda, steps, &mut rng));
        }

        let support: Vec<usize> = (0..n)
            .filter(|i| alphas.iter().any(|a| a[*i] > 0))
            .collect();
        let norm = lambda * steps as f64;

        let coefficients = classes
            .iter()
            .zip(&alphas)
            .map(|(class, alpha)| {
                support
                    .iter()
                    .map(|&i| {
                        let sign = if y[i] == *class { 1.0 } else { -1.0 };
                        alpha[i] as f64 * sign / norm
                    })
                    .collect()
            })
            .collect();

        debug!(
            "SVM fitted: {} classes, {} support vectors of {} samples, gamma {:.4}",
            classes.len(),
            support.len(),
            n,
            gamma
        );

        Ok(Self {
            gamma,
            classes,
            support_vectors: support.iter().map(|&i| x[i].clone()).collect(),
            coefficients,
        })
    }

    /// Per-class decision values for one sample.
    pub fn decision_function(&self, row: &[f64]) -> Vec<f64> {
        let kernel: Vec<f64> = self
            .support_vectors
            .iter()
            .map(|sv| rbf(sv, row, self.gamma))
            .collect();

        self.coefficients
            .iter()
            .map(|coef| coef.iter().zip(&kernel).map(|(c, k)| c * k).sum())
            .collect()
    }

    /// Class with the largest decision value; ties go to the lower code.
    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<u32> {
        rows.iter()
            .map(|row| {
                let scores = self.decision_function(row);
                let mut best = 0;
                for (idx, score) in scores.iter().enumerate() {
                    if *score > scores[best] {
                        best = idx;
                    }
                }
                self.classes[best]
            })
            .collect()
    }
}

/// Kernelized Pegasos for one binary problem; returns violation counts.
fn pegasos(
    x: &[Vec<f64>],
    signs: &[f64],
    gamma: f64,
    lambda: f64,
    steps: usize,
    rng: &mut StdRng,
) -> Vec<u32> {
    let n = x.len();
    let mut alpha = vec![0u32; n];
    // margin[k] = sum_j alpha[j] * y[j] * K(x[j], x[k])
    let mut margin = vec![0.0f64; n];

    for t in 1..=steps {
        let i = rng.gen_range(0..n);
        let decision = margin[i] / (lambda * t as f64);

        if signs[i] * decision < 1.0 {
            alpha[i] += 1;
            for k in 0..n {
                margin[k] += signs[i] * rbf(&x[i], &x[k], gamma);
            }
        }
    }

    alpha
}

/// `1 / (n_features * var(X))`, or 1 when X is constant.
fn scale_gamma(x: &[Vec<f64>]) -> f64 {
    let features = x.first().map(Vec::len).unwrap_or(0);
    let variance = x.iter().flatten().copied().population_variance();

    if features == 0 || !variance.is_finite() || variance == 0.0 {
        1.0
    } else {
        1.0 / (features as f64 * variance)
    }
}

fn rbf(a: &[f64], b: &[f64], gamma: f64) -> f64 {
    let dist: f64 = a.iter().zip(b).map(|(p, q)| (p - q) * (p - q)).sum();
    (-gamma * dist).exp()
}
