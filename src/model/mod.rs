//! Gaussian model: parameter estimation and density evaluation.

mod density;
mod estimator;
mod gaussian;

pub use density::{multivariate_gaussian, PreparedGaussian};
pub use estimator::{estimate_gaussian, DistributionEstimator};
pub use gaussian::{Covariance, GaussianParameters};
