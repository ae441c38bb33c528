//! Prediction serving over a loaded model bundle.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{PredictionError, Result, TableError};
use crate::ml::classifier::ModelKind;
use crate::ml::store::{ModelBundle, ModelStore};
use crate::table::DataTable;

/// Labels one classifier assigned to the input rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPredictions {
    pub model: ModelKind,
    pub labels: Vec<String>,
}

/// Predictions of every classifier, plus the input's own labels when it
/// carried a ground-truth column.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionReport {
    pub rows: usize,
    pub predictions: Vec<ModelPredictions>,
    pub original_anomaly: Option<Vec<String>>,
}

impl PredictionReport {
    /// Column headers: one per classifier, then `originalAnomaly` if present.
    pub fn headers(&self) -> Vec<String> {
        let mut headers: Vec<String> = self
            .predictions
            .iter()
            .map(|p| p.model.to_string())
            .collect();
        if self.original_anomaly.is_some() {
            headers.push("originalAnomaly".to_string());
        }
        headers
    }

    /// Cells of row `row`, in [`headers`](Self::headers) order.
    pub fn row(&self, row: usize) -> Vec<&str> {
        self.predictions
            .iter()
            .map(|p| p.labels[row].as_str())
            .chain(self.original_anomaly.iter().map(|truth| truth[row].as_str()))
            .collect()
    }

    /// Rows on which every classifier predicted the same label.
    pub fn agreement(&self) -> usize {
        (0..self.rows)
            .filter(|&row| {
                let mut labels = self.predictions.iter().map(|p| &p.labels[row]);
                match labels.next() {
                    Some(first) => labels.all(|l| l == first),
                    None => true,
                }
            })
            .count()
    }
}

/// Runs every classifier of a bundle with training-time preprocessing.
pub struct PredictionService {
    bundle: ModelBundle,
}

impl PredictionService {
    pub fn new(bundle: ModelBundle) -> Self {
        Self { bundle }
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    /// Selects the schema's features in order and scales them. Columns the
    /// schema does not name are ignored.
    pub fn preprocess(
        &self,
        table: &DataTable,
        timestamp_column: &str,
    ) -> std::result::Result<Vec<Vec<f64>>, PredictionError> {
        let features = &self.bundle.schema.features;
        if let Some(feature) = features.iter().find(|f| *f == timestamp_column) {
            return Err(PredictionError::MissingFeature(feature.clone()));
        }

        let rows = table.numeric_rows(features).map_err(|e| match e {
            TableError::MissingColumn(name) => PredictionError::MissingFeature(name),
            TableError::NotNumeric(name) => PredictionError::NonNumericFeature(name),
            other => PredictionError::Table(other),
        })?;

        self.bundle.scaler.transform(&rows)
    }

    /// Labels per classifier, in [`ModelKind::ALL`] order.
    pub fn predict(
        &self,
        table: &DataTable,
        timestamp_column: &str,
    ) -> std::result::Result<Vec<ModelPredictions>, PredictionError> {
        let x = self.preprocess(table, timestamp_column)?;

        self.bundle
            .models
            .iter()
            .map(|model| {
                let codes = model.predict(&x)?;
                let labels = self.bundle.encoder.inverse_transform(&codes)?;
                debug!("{} labelled {} rows", model.kind(), labels.len());
                Ok(ModelPredictions {
                    model: model.kind(),
                    labels,
                })
            })
            .collect()
    }

    /// Like [`predict`](Self::predict), but first takes `ground_truth_column`
    /// out of the table and reports it next to the predictions.
    pub fn predict_labeled(
        &self,
        mut table: DataTable,
        timestamp_column: &str,
        ground_truth_column: &str,
    ) -> std::result::Result<PredictionReport, PredictionError> {
        let original_anomaly = table
            .drop_column(ground_truth_column)
            .map(|column| column.to_strings());
        let predictions = self.predict(&table, timestamp_column)?;

        Ok(PredictionReport {
            rows: table.num_rows(),
            predictions,
            original_anomaly,
        })
    }
}

/// Loads the bundle from `store` and classifies the CSV at `path`.
pub fn predict_csv(
    path: &Path,
    store: &ModelStore,
    timestamp_column: &str,
    ground_truth_column: &str,
) -> Result<PredictionReport> {
    let table = DataTable::read_csv(path, None)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    let bundle = store
        .load()
        .with_context(|| format!("Failed to load models from '{}'", store.dir().display()))?;

    let report = PredictionService::new(bundle)
        .predict_labeled(table, timestamp_column, ground_truth_column)
        .with_context(|| format!("Failed to classify '{}'", path.display()))?;

    info!(
        "Classified {} rows from '{}' ({} with full agreement)",
        report.rows,
        path.display(),
        report.agreement()
    );
    Ok(report)
}
