//! Gaussian parameters: mean vector plus diagonal or full covariance.

use crate::error::{AnomalyError, Result};
use ndarray::{Array1, Array2};

/// Relative tolerance for |Σ[i,j] - Σ[j,i]|, scaled by max |Σ|
const SYMMETRY_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub enum Covariance {
    /// Per-feature variances, Σ = diag(var)
    Diagonal(Array1<f64>),
    /// Full n×n covariance
    Full(Array2<f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GaussianParameters {
    mu: Array1<f64>,
    covariance: Covariance,
}

impl GaussianParameters {
    pub fn diagonal(mu: Array1<f64>, var: Array1<f64>) -> Result<Self> {
        Self::new(mu, Covariance::Diagonal(var))
    }

    pub fn full(mu: Array1<f64>, covariance: Array2<f64>) -> Result<Self> {
        Self::new(mu, Covariance::Full(covariance))
    }

    pub fn new(mu: Array1<f64>, covariance: Covariance) -> Result<Self> {
        let k = mu.len();
        if k == 0 {
            return Err(AnomalyError::invalid("mean vector is empty"));
        }
        if mu.iter().any(|v| !v.is_finite()) {
            return Err(AnomalyError::invalid("mean vector has non-finite entries"));
        }
        match &covariance {
            Covariance::Diagonal(var) => {
                if var.len() != k {
                    return Err(AnomalyError::DimensionMismatch {
                        expected: k,
                        actual: var.len(),
                    });
                }
            }
            Covariance::Full(cov) => {
                if cov.dim() != (k, k) {
                    return Err(AnomalyError::InvalidInput(format!(
                        "covariance must be {}x{}, got {}x{}",
                        k,
                        k,
                        cov.nrows(),
                        cov.ncols()
                    )));
                }
                if cov.iter().any(|v| !v.is_finite()) {
                    return Err(AnomalyError::invalid("covariance has non-finite entries"));
                }
                let scale = cov.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
                let tol = SYMMETRY_TOLERANCE * scale;
                for i in 0..k {
                    for j in (i + 1)..k {
                        if (cov[[i, j]] - cov[[j, i]]).abs() > tol {
                            return Err(AnomalyError::InvalidInput(format!(
                                "covariance is not symmetric at ({}, {}): {} vs {}",
                                i,
                                j,
                                cov[[i, j]],
                                cov[[j, i]]
                            )));
                        }
                    }
                }
            }
        }
        let diag = match &covariance {
            Covariance::Diagonal(var) => var.clone(),
            Covariance::Full(cov) => cov.diag().to_owned(),
        };
        if let Some(j) = diag.iter().position(|v| !v.is_finite() || *v < 0.0) {
            return Err(AnomalyError::InvalidInput(format!(
                "variance of feature {} is {}; must be finite and >= 0",
                j, diag[j]
            )));
        }
        Ok(Self { mu, covariance })
    }

    /// Number of features k
    pub fn dim(&self) -> usize {
        self.mu.len()
    }

    pub fn mu(&self) -> &Array1<f64> {
        &self.mu
    }

    pub fn covariance(&self) -> &Covariance {
        &self.covariance
    }

    /// Per-feature variances (the diagonal of Σ)
    pub fn var(&self) -> Array1<f64> {
        match &self.covariance {
            Covariance::Diagonal(var) => var.clone(),
            Covariance::Full(cov) => cov.diag().to_owned(),
        }
    }

    /// Indices of features whose variance is exactly zero
    pub fn zero_variance_features(&self) -> Vec<usize> {
        self.var()
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == 0.0)
            .map(|(j, _)| j)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn diagonal_parameters() {
        let p = GaussianParameters::diagonal(array![0.0, 1.0], array![2.0, 3.0]).unwrap();
        assert_eq!(p.covariance(), &Covariance::Diagonal(array![2.0, 3.0]));
        assert_eq!(p.dim(), 2);
    }

    #[test]
    fn negative_variance_rejected() {
        let err = GaussianParameters::diagonal(array![0.0], array![-1.0]).unwrap_err();
        assert!(matches!(err, AnomalyError::InvalidInput(_)));
    }

    #[test]
    fn shape_checks() {
        assert!(matches!(
            GaussianParameters::diagonal(array![0.0, 1.0], array![1.0]),
            Err(AnomalyError::DimensionMismatch { expected: 2, actual: 1 })
        ));
        assert!(GaussianParameters::full(array![0.0, 1.0], Array2::eye(3)).is_err());
    }

    #[test]
    fn asymmetric_covariance_rejected() {
        let err = GaussianParameters::full(array![0.0, 0.0], array![[2.0, 1.5], [0.0, 2.0]]).unwrap_err();
        assert!(matches!(err, AnomalyError::InvalidInput(_)));
        // rounding-level asymmetry is accepted
        let eps = 2.0 * f64::EPSILON;
        assert!(GaussianParameters::full(array![0.0, 0.0], array![[2.0, 0.5 + eps], [0.5, 2.0]]).is_ok());
    }

    #[test]
    fn var_of_full_is_diagonal() {
        let p = GaussianParameters::full(array![0.0, 0.0], array![[4.0, 1.0], [1.0, 0.0]]).unwrap();
        assert_eq!(p.var(), array![4.0, 0.0]);
        assert_eq!(p.zero_variance_features(), vec![1]);
    }
}
