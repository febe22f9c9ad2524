//! Confusion counts and the F1 score of a 0/1 prediction against ground truth.

use crate::error::{AnomalyError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
}

impl ConfusionCounts {
    /// Count predictions (1 = anomalous) against labels of the same length
    pub fn from_predictions(predicted: &[u8], actual: &[u8]) -> Result<Self> {
        if predicted.len() != actual.len() {
            return Err(AnomalyError::DimensionMismatch {
                expected: actual.len(),
                actual: predicted.len(),
            });
        }
        let mut c = ConfusionCounts::default();
        for (&p, &a) in predicted.iter().zip(actual.iter()) {
            c.record(p == 1, a == 1);
        }
        Ok(c)
    }

    pub(crate) fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_positives += 1,
            (false, true) => self.false_negatives += 1,
            (false, false) => self.true_negatives += 1,
        }
    }

    /// tp / (tp + fp); 0 when nothing was flagged
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// tp / (tp + fn); 0 when there are no positives
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// Harmonic mean of precision and recall; 0 when both are 0
    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
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
