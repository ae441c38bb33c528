//! Configuration Module
//!
//! Provides TOML-based configuration for netmetrics.
//! Configuration is optional - CLI arguments can override file settings.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::export::OutputFormat;
use crate::ml::naive_bayes::DEFAULT_VAR_SMOOTHING;
use crate::ml::svm::SvmParameters;
use crate::standardize::ColumnMap;
use crate::taxonomy::MetricTaxonomy;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub models: ModelsConfig,
    pub training: TrainingConfig,
    pub prediction: PredictionConfig,
    pub dashboard: DashboardConfig,
    pub output: OutputConfig,
    pub column_map: ColumnMap,
    pub taxonomy: MetricTaxonomy,
}

impl Config {
    /// Loads configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Generates a default configuration file content
    pub fn generate_default() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| "# Failed to generate config".to_string())
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        let training = &self.training;
        if !(training.test_fraction > 0.0 && training.test_fraction < 1.0) {
            anyhow::bail!("test_fraction must be between 0.0 and 1.0");
        }
        if training.n_trees == 0 {
            anyhow::bail!("n_trees must be greater than 0");
        }
        if training.knn_k == 0 {
            anyhow::bail!("knn_k must be greater than 0");
        }
        if !(training.nb_var_smoothing.is_finite() && training.nb_var_smoothing >= 0.0) {
            anyhow::bail!("nb_var_smoothing must be a non-negative number");
        }
        if training.svm.c <= 0.0 {
            anyhow::bail!("svm.c must be greater than 0");
        }
        if training.svm.epochs == 0 {
            anyhow::bail!("svm.epochs must be greater than 0");
        }
        if matches!(training.svm.gamma, Some(g) if g <= 0.0) {
            anyhow::bail!("svm.gamma must be greater than 0 when set");
        }
        if training.label_column.is_empty() {
            anyhow::bail!("label_column must not be empty");
        }
        if self.dashboard.tick_rate_ms == 0 {
            anyhow::bail!("tick_rate_ms must be greater than 0");
        }
        if self.taxonomy.is_empty() {
            anyhow::bail!("taxonomy must define at least one category");
        }
        let duplicates = self.column_map.duplicate_raw_names();
        if !duplicates.is_empty() {
            anyhow::bail!("column_map maps these columns twice: {}", duplicates.join(", "));
        }
        Ok(())
    }
}

/// Input data configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV shown in the metrics browser
    pub dashboard_csv: PathBuf,
    /// Name of the timestamp column in every input file
    pub timestamp_column: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dashboard_csv: PathBuf::from("data/all_data_ts.csv"),
            timestamp_column: "timestamp".to_string(),
        }
    }
}

/// Model store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Directory holding the trained bundle
    pub dir: PathBuf,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("ml_models"),
        }
    }
}

/// Training pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Column holding the class label
    pub label_column: String,
    /// Share of rows held out for evaluation
    pub test_fraction: f64,
    /// Seed for the train/test shuffle and the random forest
    pub seed: u64,
    /// Fit the scaler on every row before the split instead of on the
    /// training split only
    pub fit_scaler_on_full_dataset: bool,
    /// Trees in the random forest
    pub n_trees: u16,
    /// Neighbours consulted by KNN
    pub knn_k: usize,
    /// Share of the largest feature variance added to every naive Bayes variance
    pub nb_var_smoothing: f64,
    /// RBF SVM settings
    pub svm: SvmParameters,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            label_column: "class".to_string(),
            test_fraction: 0.2,
            seed: 42,
            fit_scaler_on_full_dataset: false,
            n_trees: 100,
            knn_k: 5,
            nb_var_smoothing: DEFAULT_VAR_SMOOTHING,
            svm: SvmParameters::default(),
        }
    }
}

/// Prediction configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Optional ground-truth column reported next to the predictions
    pub ground_truth_column: String,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            ground_truth_column: "anomaly".to_string(),
        }
    }
}

/// Terminal dashboard configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Input poll interval in milliseconds
    pub tick_rate_ms: u64,
    /// strftime layout for the time-range selector
    pub time_format: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 100,
            time_format: "%Y-%m-%d %H:%M".to_string(),
        }
    }
}

/// Output-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format (text, json, jsonl)
    #[serde(with = "output_format_serde")]
    pub format: OutputFormat,
    /// Output file path (None = stdout)
    pub file: Option<PathBuf>,
    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            file: None,
            verbose: false,
        }
    }
}

/// Custom serde implementation for OutputFormat
mod output_format_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(format: &OutputFormat, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OutputFormat, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.training.label_column, "class");
        assert_eq!(config.training.test_fraction, 0.2);
        assert_eq!(config.training.seed, 42);
        assert_eq!(config.models.dir, PathBuf::from("ml_models"));
        assert_eq!(config.column_map.entries.len(), 34);
        assert_eq!(config.taxonomy.categories.len(), 5);
    }

    #[test]
    fn test_config_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.training.test_fraction = 1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.training.knn_k = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.training.svm.gamma = Some(-1.0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.training.nb_var_smoothing = -1e-9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_mapping() {
        let mut config = Config::default();
        let first = config.column_map.entries[0].clone();
        config.column_map.entries.push(first);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_generate_default_config() {
        let config_str = Config::generate_default();
        assert!(config_str.contains("[data]"));
        assert!(config_str.contains("[training]"));
        assert!(config_str.contains("[training.svm]"));
        assert!(config_str.contains("[output]"));
        assert!(config_str.contains("ifInOctets11"));

        let parsed: Config = toml::from_str(&config_str).unwrap();
        assert_eq!(parsed.column_map, ColumnMap::snmp());
        assert_eq!(parsed.taxonomy, MetricTaxonomy::snmp());
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
[data]
dashboard_csv = "files/ts.csv"

[models]
dir = "/var/lib/netmetrics"

[training]
label_column = "label"
fit_scaler_on_full_dataset = true
n_trees = 50

[training.svm]
c = 2.0
gamma = 0.1

[output]
format = "json"

[[taxonomy.categories]]
name = "Edge"
subgroups = [["RxBytes", "TxBytes"]]
"#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.data.dashboard_csv, PathBuf::from("files/ts.csv"));
        assert_eq!(config.data.timestamp_column, "timestamp");
        assert_eq!(config.models.dir, PathBuf::from("/var/lib/netmetrics"));
        assert_eq!(config.training.label_column, "label");
        assert!(config.training.fit_scaler_on_full_dataset);
        assert_eq!(config.training.n_trees, 50);
        assert_eq!(config.training.svm.c, 2.0);
        assert_eq!(config.training.svm.gamma, Some(0.1));
        assert_eq!(config.training.svm.epochs, 10);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.taxonomy.category_names(), ["Edge"]);
        // untouched sections keep their defaults
        assert_eq!(config.column_map, ColumnMap::snmp());
    }
}
