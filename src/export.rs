//! Export Module
//!
//! Renders prediction results and training reports as text, JSON or
//! JSON Lines for the headless `predict` and `train` commands.

use chrono::Utc;
use serde::Serialize;

use crate::ml::classifier::ModelKind;
use crate::ml::predict::PredictionReport;
use crate::ml::report::ClassificationReport;

/// Output format for exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonLines, // One JSON object per line (JSONL)
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "jsonl" | "jsonlines" => Ok(Self::JsonLines),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::JsonLines => write!(f, "jsonl"),
        }
    }
}

/// JSON-serializable prediction results
#[derive(Serialize)]
pub struct JsonPredictions {
    pub version: &'static str,
    pub generated_at: String,
    pub rows: usize,
    pub models: Vec<String>,
    pub predictions: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_anomaly: Option<Vec<String>>,
}

impl From<&PredictionReport> for JsonPredictions {
    fn from(report: &PredictionReport) -> Self {
        Self {
            version: "1.0",
            generated_at: Utc::now().to_rfc3339(),
            rows: report.rows,
            models: report.predictions.iter().map(|p| p.model.to_string()).collect(),
            predictions: report
                .predictions
                .iter()
                .map(|p| (p.model.to_string(), serde_json::json!(p.labels)))
                .collect(),
            original_anomaly: report.original_anomaly.clone(),
        }
    }
}

/// JSON-serializable training evaluation
#[derive(Serialize)]
pub struct JsonTraining<'a> {
    pub version: &'static str,
    pub generated_at: String,
    pub train_rows: usize,
    pub test_rows: usize,
    pub reports: Vec<JsonModelReport<'a>>,
}

#[derive(Serialize)]
pub struct JsonModelReport<'a> {
    pub model: String,
    #[serde(flatten)]
    pub report: &'a ClassificationReport,
}

fn model_reports(reports: &[(ModelKind, ClassificationReport)]) -> Vec<JsonModelReport<'_>> {
    reports
        .iter()
        .map(|(kind, report)| JsonModelReport {
            model: kind.to_string(),
            report,
        })
        .collect()
}

/// Exports prediction results in the specified format
pub fn export_predictions(report: &PredictionReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => predictions_text(report),
        OutputFormat::Json => predictions_json(report),
        OutputFormat::JsonLines => predictions_jsonl(report),
    }
}

/// Exports predictions as pretty-printed JSON
pub fn predictions_json(report: &PredictionReport) -> String {
    serde_json::to_string_pretty(&JsonPredictions::from(report))
        .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

/// Exports predictions as JSON Lines (one row per line)
pub fn predictions_jsonl(report: &PredictionReport) -> String {
    let headers = report.headers();
    let mut lines = Vec::with_capacity(report.rows);

    for row in 0..report.rows {
        let mut object = serde_json::Map::new();
        object.insert("row".to_string(), serde_json::json!(row));
        for (header, cell) in headers.iter().zip(report.row(row)) {
            object.insert(header.clone(), serde_json::json!(cell));
        }
        if let Ok(line) = serde_json::to_string(&object) {
            lines.push(line);
        }
    }

    lines.join("\n")
}

/// Exports predictions as an aligned text table
pub fn predictions_text(report: &PredictionReport) -> String {
    let mut headers = vec!["#".to_string()];
    headers.extend(report.headers());

    let rows: Vec<Vec<String>> = (0..report.rows)
        .map(|row| {
            std::iter::once(row.to_string())
                .chain(report.row(row).into_iter().map(str::to_string))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .map(|r| r[i].len())
                .chain(std::iter::once(h.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut output = format!(
        "--- Predictions ---\nRows: {}\nFull agreement: {}\n\n",
        report.rows,
        report.agreement()
    );
    output.push_str(&render(&headers));
    output.push('\n');
    output.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1)));
    output.push('\n');
    for row in &rows {
        output.push_str(&render(row));
        output.push('\n');
    }

    output
}

/// Exports per-classifier training reports in the specified format
pub fn export_training(
    reports: &[(ModelKind, ClassificationReport)],
    train_rows: usize,
    test_rows: usize,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = format!(
                "--- Training Report ---\nTrain rows: {}\nTest rows: {}\n",
                train_rows, test_rows
            );
            for (kind, report) in reports {
                output.push_str(&format!("\n=== {} ===\n{}", kind, report));
            }
            output
        }
        OutputFormat::Json => {
            let json = JsonTraining {
                version: "1.0",
                generated_at: Utc::now().to_rfc3339(),
                train_rows,
                test_rows,
                reports: model_reports(reports),
            };
            serde_json::to_string_pretty(&json)
                .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        }
        OutputFormat::JsonLines => model_reports(reports)
            .iter()
            .filter_map(|r| serde_json::to_string(r).ok())
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::predict::ModelPredictions;

    fn report() -> PredictionReport {
        let labels = |l: &[&str]| l.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        PredictionReport {
            rows: 2,
            predictions: vec![
                ModelPredictions {
                    model: ModelKind::RandomForest,
                    labels: labels(&["normal", "dos"]),
                },
                ModelPredictions {
                    model: ModelKind::Knn,
                    labels: labels(&["normal", "normal"]),
                },
            ],
            original_anomaly: Some(labels(&["normal", "dos"])),
        }
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(
            "jsonl".parse::<OutputFormat>().unwrap(),
            OutputFormat::JsonLines
        );
        assert!("invalid".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Text.to_string(), "text");
        assert_eq!(OutputFormat::Json.to_string(), "json");
        assert_eq!(OutputFormat::JsonLines.to_string(), "jsonl");
    }

    #[test]
    fn test_predictions_json() {
        let json: serde_json::Value = serde_json::from_str(&predictions_json(&report())).unwrap();
        assert_eq!(json["rows"], 2);
        assert_eq!(json["models"], serde_json::json!(["RandomForest", "KNN"]));
        assert_eq!(json["predictions"]["RandomForest"][1], "dos");
        assert_eq!(json["original_anomaly"], serde_json::json!(["normal", "dos"]));
    }

    #[test]
    fn test_predictions_jsonl() {
        let out = predictions_jsonl(&report());
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["row"], 1);
        assert_eq!(lines[1]["KNN"], "normal");
        assert_eq!(lines[1]["originalAnomaly"], "dos");
    }

    #[test]
    fn test_predictions_text() {
        let out = predictions_text(&report());
        assert!(out.contains("Full agreement: 1"));
        assert!(out.contains("#  RandomForest  KNN     originalAnomaly"));
        assert!(out.contains("1  dos           normal  dos"));
    }

    #[test]
    fn test_training_export() {
        let reports = vec![(
            ModelKind::NaiveBayes,
            ClassificationReport::new(&[0, 1], &[0, 1], &["dos", "normal"]),
        )];

        let text = export_training(&reports, 8, 2, OutputFormat::Text);
        assert!(text.contains("=== NaiveBayes ==="));
        assert!(text.contains("Test rows: 2"));

        let json: serde_json::Value =
            serde_json::from_str(&export_training(&reports, 8, 2, OutputFormat::Json)).unwrap();
        assert_eq!(json["reports"][0]["model"], "NaiveBayes");
        assert_eq!(json["reports"][0]["accuracy"], 1.0);

        let jsonl = export_training(&reports, 8, 2, OutputFormat::JsonLines);
        assert_eq!(jsonl.lines().count(), 1);
    }
}
