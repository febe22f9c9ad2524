//! Detector configuration. Every numeric knob of the engine lives here; nothing is read from globals.

use crate::error::{AnomalyError, Result};
use serde::{Deserialize, Serialize};

/// Threshold used by a fitted model until calibration overwrites it
pub const DEFAULT_EPSILON: f64 = 1e-3;

/// Grid resolution of the reference threshold search
pub const DEFAULT_THRESHOLD_STEPS: usize = 1000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Mean/variance estimation
    pub estimator: EstimatorConfig,
    /// Density evaluation numerics
    pub density: DensityConfig,
    /// Threshold calibration
    pub threshold: ThresholdConfig,
    /// Logging (only consulted by the binary)
    pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceKind {
    /// Independent per-feature variances
    #[default]
    Diagonal,
    /// Full covariance with off-diagonal terms
    Full,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Delta degrees of freedom: variance divisor is `m - ddof`. 0 gives the population variance.
    pub ddof: usize,
    pub covariance: CovarianceKind,
    /// Accept zero-variance features (singular covariance) instead of failing the fit
    pub allow_degenerate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityConfig {
    /// Singular values below `rcond * max_singular_value` are treated as zero in the pseudo-inverse
    pub rcond: f64,
    /// Floor applied to det(Σ) before it is raised to -1/2
    pub min_determinant: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Evenly spaced candidates over `[min, max)` of the validation densities
    #[default]
    Grid,
    /// Every distinct validation density, ascending
    Sorted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub strategy: SearchStrategy,
    /// Number of grid candidates (grid strategy only)
    pub steps: usize,
    /// Epsilon a freshly fitted model starts with
    pub default_epsilon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            ddof: 0,
            covariance: CovarianceKind::Diagonal,
            allow_degenerate: true,
        }
    }
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            rcond: 1e-15,
            min_determinant: f64::MIN_POSITIVE,
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            strategy: SearchStrategy::Grid,
            steps: DEFAULT_THRESHOLD_STEPS,
            default_epsilon: DEFAULT_EPSILON,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl DetectorConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &std::path::Path) -> Self {
        if path.exists() {
            if let Ok(data) = std::fs::read_to_string(path) {
                match serde_json::from_str::<DetectorConfig>(&data) {
                    Ok(c) => return c,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "invalid config; using defaults")
                    }
                }
            }
        }
        Self::default()
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.threshold.steps == 0 {
            return Err(AnomalyError::invalid("threshold.steps must be at least 1"));
        }
        if !self.threshold.default_epsilon.is_finite() || self.threshold.default_epsilon < 0.0 {
            return Err(AnomalyError::invalid(
                "threshold.default_epsilon must be a finite non-negative number",
            ));
        }
        if !(self.density.rcond.is_finite() && self.density.rcond >= 0.0) {
            return Err(AnomalyError::invalid("density.rcond must be finite and >= 0"));
        }
        if !(self.density.min_determinant.is_finite() && self.density.min_determinant > 0.0) {
            return Err(AnomalyError::invalid(
                "density.min_determinant must be finite and > 0",
            ));
        }
        Ok(())
    }
}
