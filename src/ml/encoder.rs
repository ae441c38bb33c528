//! Label encoding between class names and integer codes.

use serde::{Deserialize, Serialize};

use crate::error::PredictionError;

/// Maps class names to dense codes in sorted order: the first class
/// alphabetically gets code 0.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Learns the sorted set of distinct labels.
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut classes: Vec<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn transform<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<u32>, PredictionError> {
        labels
            .iter()
            .map(|label| {
                let label = label.as_ref();
                self.classes
                    .binary_search_by(|c| c.as_str().cmp(label))
                    .map(|idx| idx as u32)
                    .map_err(|_| PredictionError::UnknownLabel(label.to_string()))
            })
            .collect()
    }

    pub fn inverse_transform(&self, codes: &[u32]) -> Result<Vec<String>, PredictionError> {
        codes
            .iter()
            .map(|code| {
                self.classes
                    .get(*code as usize)
                    .cloned()
                    .ok_or(PredictionError::UnknownClassCode(*code))
            })
            .collect()
    }
}
