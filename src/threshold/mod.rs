//! Threshold calibration against a labeled validation set.

mod metrics;
mod selector;

pub use metrics::ConfusionCounts;
pub use selector::{select_threshold, ThresholdSelection, ThresholdSelector};
