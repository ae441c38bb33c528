//! Domain-specific error types for netmetrics.
//!
//! Uses `thiserror` for ergonomic error definitions that integrate
//! with the broader `anyhow` error handling strategy.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or reshaping a data table.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid timestamp '{value}' in column '{column}' at row {row}")]
    InvalidTimestamp {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Column '{0}' is not numeric")]
    NotNumeric(String),

    #[error("Column '{0}' does not hold timestamps")]
    NotTimestamp(String),

    #[error("Column '{column}' has no value at row {row}")]
    MissingValue { column: String, row: usize },
}

/// Errors raised by the on-disk model bundle.
#[derive(Error, Debug)]
pub enum ModelStoreError {
    #[error("Failed to create model directory '{}': {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open model file '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write model file '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode '{}': {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("Failed to decode '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("Invalid feature schema '{}': {source}", path.display())]
    Schema {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{}' holds a {found} model, expected {expected}", path.display())]
    WrongModel {
        path: PathBuf,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Feature schema does not match the scaler (schema: {schema} features, scaler: {scaler} features)")]
    SchemaMismatch { schema: usize, scaler: usize },
}

/// Errors raised while serving predictions.
#[derive(Error, Debug)]
pub enum PredictionError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("Missing feature column '{0}' required by the trained models")]
    MissingFeature(String),

    #[error("Feature column '{0}' is not numeric")]
    NonNumericFeature(String),

    #[error("Expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("Class code {0} is unknown to the label encoder")]
    UnknownClassCode(u32),

    #[error("Label '{0}' is unknown to the label encoder")]
    UnknownLabel(String),

    #[error("{model} failed to predict: {reason}")]
    Classifier { model: String, reason: String },
}

/// Errors raised by the training pipeline.
#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("Label column '{0}' not found in training data")]
    MissingLabel(String),

    #[error("Training data has no rows")]
    EmptyDataset,

    #[error("Training data has no feature columns")]
    NoFeatures,

    #[error("Split left an empty partition ({train} train rows, {test} test rows)")]
    EmptyPartition { train: usize, test: usize },

    #[error("Failed to fit {model}: {reason}")]
    Fit { model: String, reason: String },
}

/// Result type alias using anyhow for application-level error handling.
pub type Result<T> = anyhow::Result<T>;
