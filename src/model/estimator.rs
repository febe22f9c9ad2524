//! Per-feature mean and variance estimation.

use super::gaussian::GaussianParameters;
use crate::config::{CovarianceKind, EstimatorConfig};
use crate::error::{AnomalyError, Result};
use crate::features::FeatureMatrix;
use ndarray::{Array1, Array2, Axis};
use tracing::{debug, warn};

pub struct DistributionEstimator {
    config: EstimatorConfig,
}

impl DistributionEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    /// Fit mean and variance column-wise. Variance divides by `m - ddof` (population variance by default).
    pub fn fit(&self, x: &FeatureMatrix) -> Result<GaussianParameters> {
        let m = x.nrows();
        let ddof = self.config.ddof;
        if m <= ddof {
            return Err(AnomalyError::InvalidInput(format!(
                "{} rows cannot support ddof = {}",
                m, ddof
            )));
        }
        let divisor = (m - ddof) as f64;
        let view = x.view();

        let mu: Array1<f64> = view.sum_axis(Axis(0)) / m as f64;
        let centered = &view - &mu;

        let params = match self.config.covariance {
            CovarianceKind::Diagonal => {
                let var = centered.mapv(|d| d * d).sum_axis(Axis(0)) / divisor;
                GaussianParameters::diagonal(mu, var)?
            }
            CovarianceKind::Full => {
                let cov: Array2<f64> = centered.t().dot(&centered) / divisor;
                GaussianParameters::full(mu, cov)?
            }
        };

        let degenerate = params.zero_variance_features();
        if !degenerate.is_empty() {
            if !self.config.allow_degenerate {
                return Err(AnomalyError::DegenerateDistribution { features: degenerate });
            }
            warn!(features = ?degenerate, "zero-variance features; covariance is singular");
        }

        debug!(rows = m, features = params.dim(), ddof, "distribution fitted");
        Ok(params)
    }
}

impl Default for DistributionEstimator {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}

/// Fit with the reference settings: diagonal covariance, population variance.
pub fn estimate_gaussian(x: &FeatureMatrix) -> Result<GaussianParameters> {
    DistributionEstimator::default().fit(x)
}
