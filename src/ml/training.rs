//! Training pipeline.
//!
//! CSV -> drop timestamp -> features/label -> encode -> scale -> seeded
//! train/test split -> fit every classifier -> evaluate -> persist.

use std::path::Path;

use anyhow::Context;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::config::TrainingConfig;
use crate::error::{Result, TrainingError};
use crate::ml::classifier::{ModelKind, TrainedModel};
use crate::ml::encoder::LabelEncoder;
use crate::ml::report::ClassificationReport;
use crate::ml::scaler::StandardScaler;
use crate::ml::store::{FeatureSchema, ModelBundle, ModelStore};
use crate::table::DataTable;

/// A fitted bundle with its held-out evaluation.
pub struct TrainingOutcome {
    pub bundle: ModelBundle,
    /// One report per classifier, in [`ModelKind::ALL`] order.
    pub reports: Vec<(ModelKind, ClassificationReport)>,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Shuffles `0..n` with `seed` and splits off the first `ceil(n * test_fraction)`
/// indices as the test partition. Returns `(train, test)`.
pub fn split_indices(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let n_test = ((n as f64) * test_fraction).ceil() as usize;
    let n_test = n_test.min(n);

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    let train = indices.split_off(n_test);
    (train, indices)
}

fn pick<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i].clone()).collect()
}

/// Trains every classifier on `table`. The table is consumed; its
/// `timestamp_column` is discarded and every other non-label column is a
/// feature.
pub fn train(
    mut table: DataTable,
    timestamp_column: &str,
    config: &TrainingConfig,
) -> Result<TrainingOutcome> {
    table.drop_column(timestamp_column);

    let labels = table
        .drop_column(&config.label_column)
        .ok_or_else(|| TrainingError::MissingLabel(config.label_column.clone()))?
        .to_strings();

    if table.num_rows() == 0 {
        return Err(TrainingError::EmptyDataset.into());
    }
    let features: Vec<String> = table.column_names().to_vec();
    if features.is_empty() {
        return Err(TrainingError::NoFeatures.into());
    }

    let x = table
        .numeric_rows(&features)
        .context("Training features must be numeric and complete")?;

    let encoder = LabelEncoder::fit(&labels);
    let y = encoder.transform(&labels)?;

    let (train_idx, test_idx) = split_indices(x.len(), config.test_fraction, config.seed);
    if train_idx.is_empty() || test_idx.is_empty() {
        return Err(TrainingError::EmptyPartition {
            train: train_idx.len(),
            test: test_idx.len(),
        }
        .into());
    }

    let scaler = if config.fit_scaler_on_full_dataset {
        warn!("Fitting the scaler on all rows; test statistics leak into training");
        StandardScaler::fit(features.clone(), &x)
    } else {
        StandardScaler::fit(features.clone(), &pick(&x, &train_idx))
    };
    let scaled = scaler.transform(&x)?;

    let x_train = pick(&scaled, &train_idx);
    let y_train = pick(&y, &train_idx);
    let x_test = pick(&scaled, &test_idx);
    let y_test = pick(&y, &test_idx);

    info!(
        "Training on {} rows, testing on {} rows ({} features, {} classes)",
        x_train.len(),
        x_test.len(),
        features.len(),
        encoder.classes().len()
    );

    let mut models = Vec::with_capacity(ModelKind::ALL.len());
    let mut reports = Vec::with_capacity(ModelKind::ALL.len());
    for kind in ModelKind::ALL {
        let model = TrainedModel::fit(kind, &x_train, &y_train, config)?;
        let predicted = model.predict(&x_test)?;
        let report = ClassificationReport::new(&y_test, &predicted, encoder.classes());
        info!("{} test accuracy: {:.3}", kind, report.accuracy);

        models.push(model);
        reports.push((kind, report));
    }

    Ok(TrainingOutcome {
        bundle: ModelBundle {
            models,
            encoder,
            scaler,
            schema: FeatureSchema { features },
        },
        reports,
        train_rows: train_idx.len(),
        test_rows: test_idx.len(),
    })
}

/// Trains on the CSV at `path` and saves the bundle to `store`.
pub fn train_csv(
    path: &Path,
    timestamp_column: &str,
    config: &TrainingConfig,
    store: &ModelStore,
) -> Result<TrainingOutcome> {
    let table = DataTable::read_csv(path, None)
        .with_context(|| format!("Failed to read training data '{}'", path.display()))?;

    let outcome = train(table, timestamp_column, config)
        .with_context(|| format!("Failed to train on '{}'", path.display()))?;

    store
        .save(&outcome.bundle)
        .with_context(|| format!("Failed to save models to '{}'", store.dir().display()))?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::fixtures;
    use crate::ml::predict::PredictionService;

    fn table(csv: &str) -> DataTable {
        DataTable::from_reader(csv.as_bytes(), None).unwrap()
    }

    #[test]
    fn test_split_sizes() {
        let (train, test) = split_indices(10, 0.2, 42);
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);

        // ceil, like the usual test_size semantics
        let (train, test) = split_indices(11, 0.2, 42);
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 3);
    }

    #[test]
    fn test_split_is_a_seeded_partition() {
        let (train, test) = split_indices(50, 0.2, 42);
        let mut all: Vec<usize> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());

        assert_eq!(split_indices(50, 0.2, 42), (train, test));
        assert_ne!(split_indices(50, 0.2, 42).1, split_indices(50, 0.2, 7).1);
    }

    #[test]
    fn test_train_end_to_end() {
        let config = TrainingConfig::default();
        let outcome = train(table(&fixtures::telemetry_csv(20, "class")), "timestamp", &config).unwrap();

        assert_eq!(outcome.train_rows, 48);
        assert_eq!(outcome.test_rows, 12);
        assert_eq!(outcome.bundle.schema.features, ["ifInOctets11", "tcpInSegs"]);
        assert_eq!(outcome.bundle.encoder.classes(), fixtures::labels());

        let kinds: Vec<_> = outcome.reports.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, ModelKind::ALL);
        for (kind, report) in &outcome.reports {
            assert_eq!(report.classes.len(), 3);
            assert!(report.accuracy > 0.9, "{} accuracy {}", kind, report.accuracy);
        }
    }

    #[test]
    fn test_constant_counter_column() {
        let csv: String = fixtures::telemetry_csv(20, "class")
            .lines()
            .enumerate()
            .map(|(i, line)| {
                let extra = if i == 0 { "ipOutNoRoutes" } else { "0" };
                format!("{},{}\n", line, extra)
            })
            .collect();
        let config = TrainingConfig::default();
        let outcome = train(table(&csv), "timestamp", &config).unwrap();

        assert_eq!(outcome.bundle.schema.features.len(), 3);
        for (kind, report) in &outcome.reports {
            assert!(report.accuracy > 0.9, "{} accuracy {}", kind, report.accuracy);
        }
    }

    #[test]
    fn test_scaler_fit_point() {
        let csv = fixtures::telemetry_csv(10, "class");

        let config = TrainingConfig::default();
        let split_only = train(table(&csv), "timestamp", &config).unwrap();

        let config = TrainingConfig {
            fit_scaler_on_full_dataset: true,
            ..TrainingConfig::default()
        };
        let full = train(table(&csv), "timestamp", &config).unwrap();

        let all_rows = table(&csv).numeric_rows(&["ifInOctets11", "tcpInSegs"]).unwrap();
        let expected = StandardScaler::fit(full.bundle.schema.features.clone(), &all_rows);
        assert_eq!(full.bundle.scaler, expected);
        assert_ne!(split_only.bundle.scaler, expected);
    }

    #[test]
    fn test_custom_label_column() {
        let config = TrainingConfig {
            label_column: "label".to_string(),
            ..TrainingConfig::default()
        };
        let outcome = train(table(&fixtures::telemetry_csv(10, "label")), "timestamp", &config).unwrap();
        assert_eq!(outcome.bundle.schema.features.len(), 2);
    }

    #[test]
    fn test_missing_label_fails() {
        let err = train(
            table(&fixtures::telemetry_csv(10, "label")),
            "timestamp",
            &TrainingConfig::default(),
        )
        .err()
        .unwrap();

        assert!(matches!(
            err.downcast_ref::<TrainingError>(),
            Some(TrainingError::MissingLabel(name)) if name == "class"
        ));
    }

    #[test]
    fn test_empty_dataset_fails() {
        let err = train(
            table("timestamp,ifInOctets11,class\n"),
            "timestamp",
            &TrainingConfig::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(
            err.downcast_ref::<TrainingError>(),
            Some(TrainingError::EmptyDataset)
        ));
    }

    #[test]
    fn test_text_feature_fails() {
        let csv = "timestamp,ifInOctets11,host,class\n2024-01-01 00:00:00,1,a,dos\n2024-01-01 00:01:00,2,b,normal\n";
        assert!(train(table(csv), "timestamp", &TrainingConfig::default()).is_err());
    }

    #[test]
    fn test_train_csv_saves_loadable_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("train.csv");
        std::fs::write(&csv_path, fixtures::telemetry_csv(10, "class")).unwrap();
        let store = ModelStore::new(dir.path().join("ml_models"));

        train_csv(&csv_path, "timestamp", &TrainingConfig::default(), &store).unwrap();

        let service = PredictionService::new(store.load().unwrap());
        let centers = table(&fixtures::center_csv(true));
        let predictions = service.predict(&centers, "timestamp").unwrap();
        assert_eq!(predictions.len(), 4);
        assert_eq!(predictions[0].labels, fixtures::labels());
    }
}
