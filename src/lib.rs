//! Gauss anomaly — Gaussian density anomaly detection with F1-calibrated thresholds.
//!
//! Modular structure:
//! - [`features`] — Validated feature matrices and label/flag vectors
//! - [`model`] — Mean/variance estimation and multivariate Gaussian density
//! - [`threshold`] — F1-maximizing epsilon search over validation densities
//! - [`detector`] — Classifier state machine: fit → calibrate → predict
//! - [`storage`] — Versioned JSON persistence of fitted parameters
//! - [`logging`] — Structured JSON logging

pub mod config;
pub mod detector;
pub mod error;
pub mod features;
pub mod logging;
pub mod model;
pub mod storage;
pub mod threshold;

pub use config::DetectorConfig;
pub use detector::{AnomalyClassifier, ModelState};
pub use error::{AnomalyError, Result};
pub use features::{AnomalyFlags, DensityVector, FeatureMatrix, LabelVector};
pub use logging::StructuredLogger;
pub use model::{estimate_gaussian, multivariate_gaussian, DistributionEstimator, GaussianParameters};
pub use storage::ModelRecord;
pub use threshold::{select_threshold, ThresholdSelection, ThresholdSelector};
