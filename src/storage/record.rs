//! Versioned JSON record of a fitted model, written atomically (temp file + rename).

use crate::error::{AnomalyError, Result};
use crate::model::{Covariance, GaussianParameters};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const RECORD_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub version: u32,
    pub mu: Vec<f64>,
    /// Diagonal of Σ
    pub var: Vec<f64>,
    /// Present only for full-covariance models, row-major
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covariance: Option<Vec<Vec<f64>>>,
    pub epsilon: f64,
    /// F1 of the calibrated epsilon, if calibration ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f1: Option<f64>,
}

impl ModelRecord {
    pub fn new(params: &GaussianParameters, epsilon: f64, f1: Option<f64>) -> Self {
        let covariance = match params.covariance() {
            Covariance::Diagonal(_) => None,
            Covariance::Full(cov) => Some(cov.rows().into_iter().map(|r| r.to_vec()).collect()),
        };
        Self {
            version: RECORD_VERSION,
            mu: params.mu().to_vec(),
            var: params.var().to_vec(),
            covariance,
            epsilon,
            f1,
        }
    }

    /// Rebuild parameters; rejects unknown versions and inconsistent shapes
    pub fn params(&self) -> Result<GaussianParameters> {
        if self.version != RECORD_VERSION {
            return Err(AnomalyError::UnsupportedVersion {
                found: self.version,
                supported: RECORD_VERSION,
            });
        }
        if !self.epsilon.is_finite() {
            return Err(AnomalyError::invalid("stored epsilon is not finite"));
        }
        let mu = Array1::from_vec(self.mu.clone());
        match &self.covariance {
            None => GaussianParameters::diagonal(mu, Array1::from_vec(self.var.clone())),
            Some(rows) => {
                let k = self.mu.len();
                if rows.len() != k || rows.iter().any(|r| r.len() != k) {
                    return Err(AnomalyError::InvalidInput(format!(
                        "stored covariance is not {}x{}",
                        k, k
                    )));
                }
                let cov = Array2::from_shape_fn((k, k), |(i, j)| rows[i][j]);
                let params = GaussianParameters::full(mu, cov)?;
                if params.var().to_vec() != self.var {
                    return Err(AnomalyError::invalid(
                        "stored variances disagree with covariance diagonal",
                    ));
                }
                Ok(params)
            }
        }
    }

    /// Write to `path` through a sibling temp file; the target is replaced only on success
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = temp_path(path);
        let written = (|| -> Result<()> {
            let mut w = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut w, self)?;
            w.write_all(b"\n")?;
            w.into_inner().map_err(|e| e.into_error())?.sync_all()?;
            Ok(())
        })();
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            AnomalyError::Io(e)
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "model".into());
    name.push(".tmp");
    path.with_file_name(name)
}
