//! Feature matrices accepted by the estimator, the density evaluator and the classifier.

mod matrix;

pub use matrix::FeatureMatrix;

use ndarray::Array1;

/// One density value per matrix row
pub type DensityVector = Array1<f64>;

/// Ground-truth labels: 1 = anomalous, 0 = normal
pub type LabelVector = Array1<u8>;

/// Classifier output: 1 = density below epsilon
pub type AnomalyFlags = Array1<u8>;
