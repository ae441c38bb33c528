//! Per-class evaluation report: precision, recall, F1 and support.

use std::fmt;

use serde::Serialize;

/// Scores for a single class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Averaged scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Classification report over one test split.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
}

impl ClassificationReport {
    /// Compares encoded predictions against ground truth. `labels[c]` names code `c`.
    /// Undefined ratios (no predicted or no true samples) score 0.
    pub fn new<S: AsRef<str>>(truth: &[u32], predicted: &[u32], labels: &[S]) -> Self {
        debug_assert_eq!(truth.len(), predicted.len());

        let k = labels.len();
        let mut true_pos = vec![0usize; k];
        let mut pred_count = vec![0usize; k];
        let mut support = vec![0usize; k];

        for (t, p) in truth.iter().zip(predicted) {
            let (t, p) = (*t as usize, *p as usize);
            if t < k {
                support[t] += 1;
            }
            if p < k {
                pred_count[p] += 1;
            }
            if t == p && t < k {
                true_pos[t] += 1;
            }
        }

        let classes: Vec<ClassMetrics> = labels
            .iter()
            .enumerate()
            .map(|(c, label)| {
                let precision = ratio(true_pos[c], pred_count[c]);
                let recall = ratio(true_pos[c], support[c]);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    label: label.as_ref().to_string(),
                    precision,
                    recall,
                    f1,
                    support: support[c],
                }
            })
            .collect();

        let total: usize = support.iter().sum();
        let correct: usize = true_pos.iter().sum();
        let accuracy = ratio(correct, truth.len());

        let macro_avg = average(&classes, |_| 1.0, total);
        let weighted_avg = average(&classes, |m| m.support as f64, total);

        Self {
            classes,
            accuracy,
            macro_avg,
            weighted_avg,
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn average<F>(classes: &[ClassMetrics], weight: F, total: usize) -> AverageMetrics
where
    F: Fn(&ClassMetrics) -> f64,
{
    let weights: f64 = classes.iter().map(&weight).sum();
    let mean = |field: fn(&ClassMetrics) -> f64| {
        if weights == 0.0 {
            0.0
        } else {
            classes.iter().map(|m| field(m) * weight(m)).sum::<f64>() / weights
        }
    };

    AverageMetrics {
        precision: mean(|m| m.precision),
        recall: mean(|m| m.recall),
        f1: mean(|m| m.f1),
        support: total,
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.label.len())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(12);

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "",
            "precision",
            "recall",
            "f1-score",
            "support",
            width = width
        )?;
        writeln!(f)?;

        for c in &self.classes {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label,
                c.precision,
                c.recall,
                c.f1,
                c.support,
                width = width
            )?;
        }
        writeln!(f)?;

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.macro_avg.support,
            width = width
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name,
                avg.precision,
                avg.recall,
                avg.f1,
                avg.support,
                width = width
            )?;
        }
        Ok(())
    }
}
