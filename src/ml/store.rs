//! On-disk model bundle.
//!
//! A flat directory with one bincode blob per classifier plus the label
//! encoder and scaler, and a JSON feature schema:
//!
//! ```text
//! ml_models/
//! ├── RandomForest_model.bin
//! ├── SVM_model.bin
//! ├── KNN_model.bin
//! ├── NaiveBayes_model.bin
//! ├── label_encoder.bin
//! ├── scaler.bin
//! └── feature_schema.json
//! ```
//!
//! Loading is all-or-nothing and there is no locking against a concurrent
//! writer.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ModelStoreError;
use crate::ml::classifier::{ModelKind, TrainedModel};
use crate::ml::encoder::LabelEncoder;
use crate::ml::scaler::StandardScaler;

pub const ENCODER_FILE: &str = "label_encoder.bin";
pub const SCALER_FILE: &str = "scaler.bin";
pub const SCHEMA_FILE: &str = "feature_schema.json";

/// Ordered feature names the bundle was trained on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeatureSchema {
    pub features: Vec<String>,
}

/// Everything needed to reproduce predictions.
pub struct ModelBundle {
    /// One model per [`ModelKind`], in [`ModelKind::ALL`] order.
    pub models: Vec<TrainedModel>,
    pub encoder: LabelEncoder,
    pub scaler: StandardScaler,
    pub schema: FeatureSchema,
}

/// Reads and writes a [`ModelBundle`] under one directory.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes every artifact, creating the directory if needed. Files written
    /// before a failure are left in place.
    pub fn save(&self, bundle: &ModelBundle) -> Result<(), ModelStoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| ModelStoreError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        for model in &bundle.models {
            self.write_bincode(&model.kind().file_name(), model)?;
        }
        self.write_bincode(ENCODER_FILE, &bundle.encoder)?;
        self.write_bincode(SCALER_FILE, &bundle.scaler)?;

        let path = self.dir.join(SCHEMA_FILE);
        let json = serde_json::to_string_pretty(&bundle.schema).map_err(|source| {
            ModelStoreError::Schema {
                path: path.clone(),
                source,
            }
        })?;
        fs::write(&path, json).map_err(|source| ModelStoreError::Write { path, source })?;

        info!("Models saved in '{}'", self.dir.display());
        Ok(())
    }

    /// Reads the full bundle. Any missing or unreadable file fails the load.
    pub fn load(&self) -> Result<ModelBundle, ModelStoreError> {
        let mut models = Vec::with_capacity(ModelKind::ALL.len());
        for kind in ModelKind::ALL {
            let model: TrainedModel = self.read_bincode(&kind.file_name())?;
            if model.kind() != kind {
                return Err(ModelStoreError::WrongModel {
                    path: self.dir.join(kind.file_name()),
                    expected: kind.name(),
                    found: model.kind().name(),
                });
            }
            models.push(model);
        }

        let encoder: LabelEncoder = self.read_bincode(ENCODER_FILE)?;
        let scaler: StandardScaler = self.read_bincode(SCALER_FILE)?;

        let path = self.dir.join(SCHEMA_FILE);
        let file = open(&path)?;
        let schema: FeatureSchema = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| ModelStoreError::Schema { path, source })?;

        if schema.features != scaler.feature_names() {
            return Err(ModelStoreError::SchemaMismatch {
                schema: schema.features.len(),
                scaler: scaler.feature_names().len(),
            });
        }

        debug!(
            "Loaded {} models over {} features and {} classes from '{}'",
            models.len(),
            schema.features.len(),
            encoder.classes().len(),
            self.dir.display()
        );

        Ok(ModelBundle {
            models,
            encoder,
            scaler,
            schema,
        })
    }

    fn write_bincode<T: Serialize>(&self, name: &str, value: &T) -> Result<(), ModelStoreError> {
        let path = self.dir.join(name);
        let file = File::create(&path).map_err(|source| ModelStoreError::Write {
            path: path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, value).map_err(|source| ModelStoreError::Encode {
            path: path.clone(),
            source,
        })?;
        writer
            .flush()
            .map_err(|source| ModelStoreError::Write { path, source })
    }

    fn read_bincode<T: DeserializeOwned>(&self, name: &str) -> Result<T, ModelStoreError> {
        let path = self.dir.join(name);
        let file = open(&path)?;
        bincode::deserialize_from(BufReader::new(file))
            .map_err(|source| ModelStoreError::Decode { path, source })
    }
}

fn open(path: &Path) -> Result<File, ModelStoreError> {
    File::open(path).map_err(|source| ModelStoreError::Open {
        path: path.to_path_buf(),
        source,
    })
}
