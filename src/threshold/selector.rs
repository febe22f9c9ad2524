//! F1-maximizing search for the density cutoff epsilon.
//!
//! A sample is flagged when `p < epsilon` (strict). The candidate with the strictly greatest F1 wins,
//! so ties keep the lowest epsilon of the ascending sweep.

use super::metrics::ConfusionCounts;
use crate::config::{SearchStrategy, ThresholdConfig};
use crate::error::{AnomalyError, Result};
use crate::features::{DensityVector, LabelVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Chosen operating point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSelection {
    pub epsilon: f64,
    pub f1: f64,
    pub precision: f64,
    pub recall: f64,
}

impl ThresholdSelection {
    fn from_counts(epsilon: f64, counts: &ConfusionCounts) -> Self {
        Self {
            epsilon,
            f1: counts.f1(),
            precision: counts.precision(),
            recall: counts.recall(),
        }
    }
}

pub struct ThresholdSelector {
    config: ThresholdConfig,
}

impl ThresholdSelector {
    pub fn new(config: ThresholdConfig) -> Self {
        Self { config }
    }

    pub fn select(&self, p_val: &DensityVector, y_val: &LabelVector) -> Result<ThresholdSelection> {
        validate(p_val, y_val)?;
        let best = match self.config.strategy {
            SearchStrategy::Grid => {
                if self.config.steps == 0 {
                    return Err(AnomalyError::invalid("threshold grid needs at least one step"));
                }
                grid_search(p_val, y_val, self.config.steps)
            }
            SearchStrategy::Sorted => sorted_search(p_val, y_val),
        };
        debug!(
            strategy = ?self.config.strategy,
            epsilon = best.epsilon,
            f1 = best.f1,
            samples = p_val.len(),
            "threshold selected"
        );
        Ok(best)
    }
}

impl Default for ThresholdSelector {
    fn default() -> Self {
        Self::new(ThresholdConfig::default())
    }
}

/// Reference search: 1000-step grid, returns (epsilon, f1).
pub fn select_threshold(p_val: &DensityVector, y_val: &LabelVector) -> Result<(f64, f64)> {
    let s = ThresholdSelector::default().select(p_val, y_val)?;
    Ok((s.epsilon, s.f1))
}

fn validate(p_val: &DensityVector, y_val: &LabelVector) -> Result<()> {
    if p_val.is_empty() {
        return Err(AnomalyError::invalid("validation set is empty"));
    }
    if p_val.len() != y_val.len() {
        return Err(AnomalyError::InvalidInput(format!(
            "{} densities but {} labels",
            p_val.len(),
            y_val.len()
        )));
    }
    if let Some(i) = y_val.iter().position(|&y| y > 1) {
        return Err(AnomalyError::InvalidInput(format!(
            "label {} at index {} is not 0 or 1",
            y_val[i], i
        )));
    }
    if let Some(i) = p_val.iter().position(|p| !p.is_finite()) {
        return Err(AnomalyError::InvalidInput(format!(
            "density at index {} is not finite",
            i
        )));
    }
    Ok(())
}

/// `steps` candidates `min + i * step`, i in [0, steps), step = (max - min) / steps.
/// Constant densities give step 0 and a single repeated candidate.
fn grid_search(p_val: &DensityVector, y_val: &LabelVector, steps: usize) -> ThresholdSelection {
    let min = p_val.iter().copied().fold(f64::INFINITY, f64::min);
    let max = p_val.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let step = (max - min) / steps as f64;

    let mut best: Option<ThresholdSelection> = None;
    for i in 0..steps {
        let epsilon = min + i as f64 * step;
        let mut counts = ConfusionCounts::default();
        for (&p, &y) in p_val.iter().zip(y_val.iter()) {
            counts.record(p < epsilon, y == 1);
        }
        let candidate = ThresholdSelection::from_counts(epsilon, &counts);
        if best.map_or(true, |b| candidate.f1 > b.f1) {
            best = Some(candidate);
        }
        if step == 0.0 {
            break;
        }
    }
    // steps >= 1, so the loop ran at least once
    best.unwrap_or(ThresholdSelection {
        epsilon: min,
        f1: 0.0,
        precision: 0.0,
        recall: 0.0,
    })
}

/// Exact scan: each distinct density is a candidate, flagging everything strictly below it.
fn sorted_search(p_val: &DensityVector, y_val: &LabelVector) -> ThresholdSelection {
    let mut pairs: Vec<(f64, bool)> = p_val
        .iter()
        .zip(y_val.iter())
        .map(|(&p, &y)| (p, y == 1))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let positives = pairs.iter().filter(|(_, y)| *y).count();
    let negatives = pairs.len() - positives;
    let mut flagged_pos = 0usize;
    let mut flagged_neg = 0usize;
    let mut best: Option<ThresholdSelection> = None;

    let mut i = 0;
    while i < pairs.len() {
        let epsilon = pairs[i].0;
        let counts = ConfusionCounts {
            true_positives: flagged_pos,
            false_positives: flagged_neg,
            false_negatives: positives - flagged_pos,
            true_negatives: negatives - flagged_neg,
        };
        let candidate = ThresholdSelection::from_counts(epsilon, &counts);
        if best.map_or(true, |b| candidate.f1 > b.f1) {
            best = Some(candidate);
        }
        while i < pairs.len() && pairs[i].0 == epsilon {
            if pairs[i].1 {
                flagged_pos += 1;
            } else {
                flagged_neg += 1;
            }
            i += 1;
        }
    }
    best.unwrap_or(ThresholdSelection {
        epsilon: pairs[0].0,
        f1: 0.0,
        precision: 0.0,
        recall: 0.0,
    })
}
