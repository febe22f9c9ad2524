//! Validated sample × feature matrix.

use crate::error::{AnomalyError, Result};
use ndarray::{Array1, Array2, ArrayView2};

/// Row-major (m samples, n features) matrix with m, n >= 1 and only finite cells.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    data: Array2<f64>,
}

impl FeatureMatrix {
    pub fn new(data: Array2<f64>) -> Result<Self> {
        let (rows, cols) = data.dim();
        if rows == 0 {
            return Err(AnomalyError::invalid("feature matrix has zero rows"));
        }
        if cols == 0 {
            return Err(AnomalyError::invalid("feature matrix has zero columns"));
        }
        if let Some(((r, c), v)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(AnomalyError::InvalidInput(format!(
                "non-numeric cell {} at row {}, column {}",
                v, r, c
            )));
        }
        Ok(Self { data })
    }

    /// A flat sequence is one feature observed m times: shape (m, 1)
    pub fn from_column(values: Array1<f64>) -> Result<Self> {
        let m = values.len();
        let data = values
            .into_shape((m, 1))
            .map_err(|e| AnomalyError::InvalidInput(e.to_string()))?;
        Self::new(data)
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if let Some(i) = rows.iter().position(|r| r.len() != cols) {
            return Err(AnomalyError::InvalidInput(format!(
                "ragged rows: row {} has {} values, expected {}",
                i,
                rows[i].len(),
                cols
            )));
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let data = Array2::from_shape_vec((rows.len(), cols), flat)
            .map_err(|e| AnomalyError::InvalidInput(e.to_string()))?;
        Self::new(data)
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }
}

impl TryFrom<Array2<f64>> for FeatureMatrix {
    type Error = AnomalyError;

    fn try_from(data: Array2<f64>) -> Result<Self> {
        Self::new(data)
    }
}

impl TryFrom<Array1<f64>> for FeatureMatrix {
    type Error = AnomalyError;

    fn try_from(values: Array1<f64>) -> Result<Self> {
        Self::from_column(values)
    }
}

impl TryFrom<Vec<f64>> for FeatureMatrix {
    type Error = AnomalyError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::from_column(Array1::from_vec(values))
    }
}
