//! The four anomaly classifiers.
//!
//! Random forest and KNN come from `smartcore`; the RBF SVM is [`RbfSvm`]
//! and Gaussian naive Bayes is [`GaussianNb`]. All of them train on scaled
//! feature rows and predict label-encoded class codes.
//!
//! The forest considers every feature at each split. smartcore turns a node
//! into a leaf when none of its sampled features can split it, so sampling
//! fewer features lets a constant counter column end trees at the root.

use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::metrics::distance::euclidian::Euclidian;
use smartcore::neighbors::knn_classifier::{KNNClassifier, KNNClassifierParameters};
use tracing::debug;

use crate::config::TrainingConfig;
use crate::error::{PredictionError, TrainingError};
use crate::ml::naive_bayes::GaussianNb;
use crate::ml::svm::RbfSvm;

type Forest = RandomForestClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;
type Knn = KNNClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>, Euclidian<f64>>;

/// Identifies one of the four classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ModelKind {
    RandomForest,
    Svm,
    Knn,
    NaiveBayes,
}

impl ModelKind {
    /// Every classifier, in bundle order.
    pub const ALL: [ModelKind; 4] = [
        ModelKind::RandomForest,
        ModelKind::Svm,
        ModelKind::Knn,
        ModelKind::NaiveBayes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::RandomForest => "RandomForest",
            Self::Svm => "SVM",
            Self::Knn => "KNN",
            Self::NaiveBayes => "NaiveBayes",
        }
    }

    /// File name inside the model directory.
    pub fn file_name(&self) -> String {
        format!("{}_model.bin", self.name())
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A fitted classifier.
#[derive(Deserialize, Serialize)]
pub enum TrainedModel {
    RandomForest(Forest),
    Svm(RbfSvm),
    Knn(Knn),
    NaiveBayes(GaussianNb),
}

impl TrainedModel {
    /// Fits `kind` on scaled rows `x` and encoded labels `y`.
    pub fn fit(
        kind: ModelKind,
        x: &[Vec<f64>],
        y: &[u32],
        config: &TrainingConfig,
    ) -> Result<Self, TrainingError> {
        let fail = |reason: String| TrainingError::Fit {
            model: kind.to_string(),
            reason,
        };

        match kind {
            ModelKind::Svm => return RbfSvm::fit(x, y, &config.svm).map(Self::Svm),
            ModelKind::NaiveBayes => {
                return GaussianNb::fit(x, y, config.nb_var_smoothing).map(Self::NaiveBayes)
            }
            _ => {}
        }

        if x.is_empty() {
            return Err(fail("no training samples".to_string()));
        }

        let matrix = to_matrix(x);
        let labels = y.to_vec();

        let model = match kind {
            ModelKind::RandomForest => {
                let params = RandomForestClassifierParameters::default()
                    .with_n_trees(config.n_trees)
                    .with_m(x[0].len().max(1))
                    .with_seed(config.seed);
                Self::RandomForest(
                    Forest::fit(&matrix, &labels, params).map_err(|e| fail(e.to_string()))?,
                )
            }
            ModelKind::Knn => {
                let params = KNNClassifierParameters::default().with_k(config.knn_k);
                Self::Knn(Knn::fit(&matrix, &labels, params).map_err(|e| fail(e.to_string()))?)
            }
            ModelKind::Svm | ModelKind::NaiveBayes => unreachable!("handled above"),
        };

        debug!("Fitted {} on {} samples", kind, x.len());
        Ok(model)
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Self::RandomForest(_) => ModelKind::RandomForest,
            Self::Svm(_) => ModelKind::Svm,
            Self::Knn(_) => ModelKind::Knn,
            Self::NaiveBayes(_) => ModelKind::NaiveBayes,
        }
    }

    /// Predicts a class code per row.
    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<u32>, PredictionError> {
        if x.is_empty() {
            return Ok(Vec::new());
        }

        let fail = |e: smartcore::error::Failed| PredictionError::Classifier {
            model: self.kind().to_string(),
            reason: e.to_string(),
        };

        match self {
            Self::RandomForest(model) => model.predict(&to_matrix(x)).map_err(fail),
            Self::Svm(model) => Ok(model.predict(x)),
            Self::Knn(model) => model.predict(&to_matrix(x)).map_err(fail),
            Self::NaiveBayes(model) => Ok(model.predict(x)),
        }
    }
}

fn to_matrix(rows: &[Vec<f64>]) -> DenseMatrix<f64> {
    let slices: Vec<&[f64]> = rows.iter().map(Vec::as_slice).collect();
    DenseMatrix::from_2d_array(&slices)
}
