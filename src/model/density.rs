//! Multivariate Gaussian density of each matrix row.
//!
//! p(x) = (2π)^(-k/2) · det(Σ)^(-1/2) · exp(-0.5 · dᵀ Σ⁺ d),  d = x - mu
//!
//! Σ⁺ is the Moore–Penrose pseudo-inverse, so a zero-variance feature (singular Σ) still yields a
//! finite density. A zero det(Σ) is replaced by `min_determinant` before the negative power is taken.
//! The density is assembled in log space and capped at `f64::MAX`.

use super::gaussian::{Covariance, GaussianParameters};
use crate::config::DensityConfig;
use crate::error::{AnomalyError, Result};
use crate::features::{DensityVector, FeatureMatrix};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2, ArrayView1};
use std::f64::consts::PI;
use tracing::{debug, warn};

/// Inverse covariance in the form it was computed
#[derive(Debug, Clone)]
enum Precision {
    Diagonal(Array1<f64>),
    Full(Array2<f64>),
}

/// Σ⁺ and the normalizing constant, computed once per parameter set
#[derive(Debug, Clone)]
pub struct PreparedGaussian {
    mu: Array1<f64>,
    precision: Precision,
    /// ln((2π)^(-k/2) · det(Σ)^(-1/2))
    log_norm: f64,
}

impl PreparedGaussian {
    pub fn new(params: &GaussianParameters, config: &DensityConfig) -> Self {
        let k = params.dim();
        let (precision, log_det) = match params.covariance() {
            Covariance::Diagonal(var) => diagonal_pinv(var, config.rcond),
            Covariance::Full(cov) => full_pinv(cov, config.rcond),
        };
        // Only a zero or negative det(Σ) is floored; tiny positive ones are exact in log space.
        let log_det = match log_det {
            Some(ld) if ld.is_finite() => ld,
            _ => {
                debug!(floor = config.min_determinant, "singular covariance; determinant floored");
                config.min_determinant.ln()
            }
        };
        let log_norm = -0.5 * k as f64 * (2.0 * PI).ln() - 0.5 * log_det;
        Self {
            mu: params.mu().clone(),
            precision,
            log_norm,
        }
    }

    pub fn dim(&self) -> usize {
        self.mu.len()
    }

    /// Density of a single sample of length k
    pub fn pdf(&self, x: ArrayView1<'_, f64>) -> f64 {
        let d = &x - &self.mu;
        let quad = match &self.precision {
            Precision::Diagonal(inv) => d.iter().zip(inv.iter()).map(|(di, pi)| di * di * pi).sum::<f64>(),
            Precision::Full(inv) => d.dot(&inv.dot(&d)),
        };
        // A pseudo-inverse of a PSD matrix is PSD; tiny negatives are rounding noise.
        let quad = quad.max(0.0);
        (self.log_norm - 0.5 * quad).exp().min(f64::MAX)
    }

    pub fn evaluate(&self, x: &FeatureMatrix) -> Result<DensityVector> {
        if x.ncols() != self.dim() {
            return Err(AnomalyError::DimensionMismatch {
                expected: self.dim(),
                actual: x.ncols(),
            });
        }
        let out: Array1<f64> = x.view().rows().into_iter().map(|row| self.pdf(row)).collect();
        debug!(rows = out.len(), features = self.dim(), "densities evaluated");
        Ok(out)
    }
}

/// Σ⁺ for Σ = diag(var): reciprocal of entries above the cutoff, zero otherwise.
/// Returns ln det(Σ), or `None` when det(Σ) <= 0.
fn diagonal_pinv(var: &Array1<f64>, rcond: f64) -> (Precision, Option<f64>) {
    let max = var.iter().copied().fold(0.0_f64, f64::max);
    let cutoff = rcond * max;
    let inv = var.mapv(|v| if v > cutoff { 1.0 / v } else { 0.0 });
    (Precision::Diagonal(inv), log_product(var.iter().copied()))
}

/// Sum of logs; avoids underflow of the plain product over many small factors
fn log_product(factors: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    for f in factors {
        if f <= 0.0 {
            return None;
        }
        sum += f.ln();
    }
    Some(sum)
}

/// Cholesky inverse when Σ is positive definite; SVD pseudo-inverse otherwise
fn full_pinv(cov: &Array2<f64>, rcond: f64) -> (Precision, Option<f64>) {
    let k = cov.nrows();
    let m = DMatrix::from_fn(k, k, |i, j| cov[[i, j]]);

    if let Some(chol) = m.clone().cholesky() {
        let pivots: Vec<f64> = chol.l().diagonal().iter().map(|v| v * v).collect();
        let log_det = log_product(pivots.iter().copied());
        let max_pivot = pivots.iter().copied().fold(0.0_f64, f64::max);
        let min_pivot = pivots.iter().copied().fold(f64::INFINITY, f64::min);
        let well_conditioned = min_pivot > rcond * max_pivot;
        let inv = chol.inverse();
        if well_conditioned && log_det.is_some() && inv.iter().all(|v| v.is_finite()) {
            return (Precision::Full(to_ndarray(&inv)), log_det);
        }
    }

    warn!(dim = k, "covariance not positive definite; using pseudo-inverse");
    let det = m.determinant();
    let log_det = (det.is_finite() && det > 0.0).then(|| det.ln());
    let svd = m.svd(true, true);
    let max_sv = svd.singular_values.iter().copied().fold(0.0_f64, f64::max);
    match svd.pseudo_inverse(rcond * max_sv) {
        Ok(pinv) => (Precision::Full(to_ndarray(&pinv)), log_det),
        Err(e) => {
            // Only reachable if U/Vᵀ were not computed; treat Σ as rank zero.
            warn!(error = e, "pseudo-inverse unavailable; ignoring covariance");
            (Precision::Full(Array2::zeros((k, k))), log_det)
        }
    }
}

fn to_ndarray(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Density of every row of `x` under `params`, with default numerics.
pub fn multivariate_gaussian(x: &FeatureMatrix, params: &GaussianParameters) -> Result<DensityVector> {
    PreparedGaussian::new(params, &DensityConfig::default()).evaluate(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::estimate_gaussian;
    use ndarray::array;

    fn standard_normal() -> GaussianParameters {
        GaussianParameters::diagonal(array![0.0], array![1.0]).unwrap()
    }

    #[test]
    fn standard_normal_peak() {
        let x = FeatureMatrix::new(array![[0.0], [3.0]]).unwrap();
        let p = multivariate_gaussian(&x, &standard_normal()).unwrap();
        let peak = 1.0 / (2.0 * PI).sqrt();
        assert!((p[0] - peak).abs() < 1e-12);
        assert!(p[0] > p[1]);
        assert!((p[1] - peak * (-4.5_f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn diagonal_and_full_agree() {
        let diag = GaussianParameters::diagonal(array![1.0, -1.0], array![2.0, 0.5]).unwrap();
        let full = GaussianParameters::full(array![1.0, -1.0], array![[2.0, 0.0], [0.0, 0.5]]).unwrap();
        let x = FeatureMatrix::new(array![[0.0, 0.0], [1.5, -2.0], [3.0, 1.0]]).unwrap();
        let a = multivariate_gaussian(&x, &diag).unwrap();
        let b = multivariate_gaussian(&x, &full).unwrap();
        for (pa, pb) in a.iter().zip(b.iter()) {
            assert!((pa - pb).abs() <= 1e-12 * pa.max(1.0));
        }
    }

    #[test]
    fn correlated_full_covariance() {
        // Σ = [[1, .5], [.5, 1]], det = .75; at the mean p = 1 / (2π sqrt(.75))
        let params = GaussianParameters::full(array![0.0, 0.0], array![[1.0, 0.5], [0.5, 1.0]]).unwrap();
        let x = FeatureMatrix::new(array![[0.0, 0.0], [1.0, 1.0], [1.0, -1.0]]).unwrap();
        let p = multivariate_gaussian(&x, &params).unwrap();
        assert!((p[0] - 1.0 / (2.0 * PI * 0.75_f64.sqrt())).abs() < 1e-12);
        // along the correlation axis the density falls off slower
        assert!(p[1] > p[2]);
    }

    #[test]
    fn zero_variance_stays_finite() {
        let x = FeatureMatrix::new(array![[2.0, 1.0], [4.0, 1.0], [6.0, 1.0], [8.0, 1.0]]).unwrap();
        let params = estimate_gaussian(&x).unwrap();
        let p = multivariate_gaussian(&x, &params).unwrap();
        assert_eq!(p.len(), 4);
        assert!(p.iter().all(|v| v.is_finite() && *v >= 0.0));
        // the singular feature drops out of the quadratic form; the varying one still ranks
        assert!(p[1] > p[0]);
    }

    #[test]
    fn tiny_variances_keep_exact_determinant() {
        // det(Σ) = 1e-310 is below f64::MIN_POSITIVE but still non-zero
        let params = GaussianParameters::diagonal(array![0.0, 0.0], array![1e-155, 1e-155]).unwrap();
        let p = multivariate_gaussian(&FeatureMatrix::new(array![[0.0, 0.0]]).unwrap(), &params).unwrap();
        let expected = -(2.0 * PI).ln() - 0.5 * 2.0 * 1e-155_f64.ln();
        assert!((p[0].ln() - expected).abs() < 1e-9);

        let k = 20;
        let params = GaussianParameters::diagonal(Array1::zeros(k), Array1::from_elem(k, 1e-20)).unwrap();
        let at_mu = FeatureMatrix::new(Array2::zeros((1, k))).unwrap();
        let p = multivariate_gaussian(&at_mu, &params).unwrap();
        let expected = -0.5 * k as f64 * (2.0 * PI).ln() - 0.5 * k as f64 * 1e-20_f64.ln();
        assert!((p[0].ln() - expected).abs() < 1e-9);
    }

    #[test]
    fn singular_full_covariance_stays_finite() {
        let params = GaussianParameters::full(array![0.0, 0.0], array![[1.0, 1.0], [1.0, 1.0]]).unwrap();
        let x = FeatureMatrix::new(array![[0.0, 0.0], [1.0, 1.0], [5.0, 5.0]]).unwrap();
        let p = multivariate_gaussian(&x, &params).unwrap();
        assert!(p.iter().all(|v| v.is_finite() && *v >= 0.0));
        assert!(p[0] > p[1] && p[1] > p[2]);
    }

    #[test]
    fn column_mismatch() {
        let x = FeatureMatrix::new(array![[0.0, 1.0]]).unwrap();
        assert!(matches!(
            multivariate_gaussian(&x, &standard_normal()),
            Err(AnomalyError::DimensionMismatch { expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn deterministic() {
        let x = FeatureMatrix::new(array![[0.3, 1.2], [2.5, -0.7], [1.1, 0.4]]).unwrap();
        let params = estimate_gaussian(&x).unwrap();
        let a = multivariate_gaussian(&x, &params).unwrap();
        let b = multivariate_gaussian(&x, &params).unwrap();
        assert_eq!(a, b);
    }
}
