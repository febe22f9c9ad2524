//! Anomaly classifier composing estimation, density evaluation and threshold calibration.

mod classifier;

pub use classifier::{AnomalyClassifier, ModelState};
