//! Gaussian anomaly classifier: fit → calibrate → predict, plus persistence.

use crate::config::DetectorConfig;
use crate::error::{AnomalyError, Result};
use crate::features::{AnomalyFlags, DensityVector, FeatureMatrix, LabelVector};
use crate::model::{DistributionEstimator, GaussianParameters, PreparedGaussian};
use crate::storage::ModelRecord;
use crate::threshold::{ThresholdSelection, ThresholdSelector};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    Unfit,
    /// Parameters estimated; epsilon is still the configured default (or set by hand)
    Fitted,
    /// Epsilon chosen against a labeled validation set
    Calibrated,
}

struct Fitted {
    params: GaussianParameters,
    prepared: PreparedGaussian,
}

pub struct AnomalyClassifier {
    config: DetectorConfig,
    fitted: Option<Fitted>,
    epsilon: f64,
    calibrated_f1: Option<f64>,
    selection: Option<ThresholdSelection>,
}

impl AnomalyClassifier {
    pub fn new(config: DetectorConfig) -> Self {
        let epsilon = config.threshold.default_epsilon;
        Self {
            config,
            fitted: None,
            epsilon,
            calibrated_f1: None,
            selection: None,
        }
    }

    pub fn state(&self) -> ModelState {
        match (&self.fitted, self.calibrated_f1) {
            (None, _) => ModelState::Unfit,
            (Some(_), None) => ModelState::Fitted,
            (Some(_), Some(_)) => ModelState::Calibrated,
        }
    }

    pub fn params(&self) -> Option<&GaussianParameters> {
        self.fitted.as_ref().map(|f| &f.params)
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Full report of the last calibration run in this process
    pub fn selection(&self) -> Option<&ThresholdSelection> {
        self.selection.as_ref()
    }

    /// Estimate parameters from `x`. Refitting discards any previous calibration.
    pub fn fit(&mut self, x: &FeatureMatrix) -> Result<()> {
        let params = DistributionEstimator::new(self.config.estimator.clone()).fit(x)?;
        self.install(params);
        self.epsilon = self.config.threshold.default_epsilon;
        self.calibrated_f1 = None;
        self.selection = None;
        info!(rows = x.nrows(), features = x.ncols(), epsilon = self.epsilon, "model fitted");
        Ok(())
    }

    fn install(&mut self, params: GaussianParameters) {
        let prepared = PreparedGaussian::new(&params, &self.config.density);
        self.fitted = Some(Fitted { params, prepared });
    }

    fn fitted(&self) -> Result<&Fitted> {
        self.fitted.as_ref().ok_or(AnomalyError::ModelNotFitted)
    }

    /// Density of each row under the fitted distribution
    pub fn score_samples(&self, x: &FeatureMatrix) -> Result<DensityVector> {
        self.fitted()?.prepared.evaluate(x)
    }

    /// Choose epsilon from validation densities and labels; overwrites the current epsilon.
    pub fn select_threshold(&mut self, y_val: &LabelVector, p_val: &DensityVector) -> Result<ThresholdSelection> {
        self.fitted()?;
        let selection = ThresholdSelector::new(self.config.threshold.clone()).select(p_val, y_val)?;
        self.epsilon = selection.epsilon;
        self.calibrated_f1 = Some(selection.f1);
        self.selection = Some(selection);
        info!(
            epsilon = selection.epsilon,
            f1 = selection.f1,
            precision = selection.precision,
            recall = selection.recall,
            "model calibrated"
        );
        Ok(selection)
    }

    /// Score a labeled validation matrix and calibrate on it
    pub fn calibrate(&mut self, x_val: &FeatureMatrix, y_val: &LabelVector) -> Result<ThresholdSelection> {
        let p_val = self.score_samples(x_val)?;
        self.select_threshold(y_val, &p_val)
    }

    /// Override epsilon by hand; the model no longer counts as calibrated
    pub fn set_epsilon(&mut self, epsilon: f64) -> Result<()> {
        if !epsilon.is_finite() {
            return Err(AnomalyError::invalid("epsilon must be finite"));
        }
        self.epsilon = epsilon;
        self.calibrated_f1 = None;
        self.selection = None;
        Ok(())
    }

    /// 1 where the density is strictly below epsilon, else 0; one flag per row
    pub fn predict(&self, x: &FeatureMatrix) -> Result<AnomalyFlags> {
        let densities = self.score_samples(x)?;
        let epsilon = self.epsilon;
        Ok(densities.mapv(|p| u8::from(p < epsilon)))
    }

    pub fn to_record(&self) -> Result<ModelRecord> {
        let fitted = self.fitted()?;
        Ok(ModelRecord::new(&fitted.params, self.epsilon, self.calibrated_f1))
    }

    pub fn from_record(record: &ModelRecord, config: DetectorConfig) -> Result<Self> {
        let params = record.params()?;
        let mut model = Self::new(config);
        model.install(params);
        model.epsilon = record.epsilon;
        model.calibrated_f1 = record.f1;
        Ok(model)
    }

    /// Persist mu, var (and full covariance if any) and epsilon
    pub fn save(&self, path: &Path) -> Result<()> {
        self.to_record()?.save(path)?;
        info!(path = %path.display(), "model saved");
        Ok(())
    }

    pub fn load(path: &Path, config: DetectorConfig) -> Result<Self> {
        let model = Self::from_record(&ModelRecord::load(path)?, config)?;
        info!(path = %path.display(), state = ?model.state(), epsilon = model.epsilon, "model loaded");
        Ok(model)
    }
}

impl Default for AnomalyClassifier {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_EPSILON;
    use ndarray::array;

    fn train() -> FeatureMatrix {
        FeatureMatrix::new(array![
            [1.0, 10.0],
            [1.2, 10.5],
            [0.8, 9.5],
            [1.1, 10.2],
            [0.9, 9.8],
            [1.0, 10.0]
        ])
        .unwrap()
    }

    fn validation() -> (FeatureMatrix, LabelVector) {
        let x = FeatureMatrix::new(array![[1.0, 10.1], [0.95, 9.9], [3.0, 14.0], [-1.0, 6.0]]).unwrap();
        (x, array![0u8, 0, 1, 1])
    }

    #[test]
    fn state_machine() {
        let mut m = AnomalyClassifier::default();
        assert_eq!(m.state(), ModelState::Unfit);
        m.fit(&train()).unwrap();
        assert_eq!(m.state(), ModelState::Fitted);
        assert_eq!(m.epsilon(), DEFAULT_EPSILON);
        let (x, y) = validation();
        let sel = m.calibrate(&x, &y).unwrap();
        assert_eq!(m.state(), ModelState::Calibrated);
        assert_eq!(m.epsilon(), sel.epsilon);
        assert_eq!(sel.f1, 1.0);
        m.fit(&train()).unwrap();
        assert_eq!(m.state(), ModelState::Fitted);
        assert_eq!(m.epsilon(), DEFAULT_EPSILON);
    }

    #[test]
    fn unfit_operations_fail() {
        let mut m = AnomalyClassifier::default();
        let (x, y) = validation();
        assert!(matches!(m.predict(&x), Err(AnomalyError::ModelNotFitted)));
        assert!(matches!(m.score_samples(&x), Err(AnomalyError::ModelNotFitted)));
        assert!(matches!(m.to_record(), Err(AnomalyError::ModelNotFitted)));
        assert!(matches!(
            m.select_threshold(&y, &array![0.1, 0.2, 0.3, 0.4]),
            Err(AnomalyError::ModelNotFitted)
        ));
    }

    #[test]
    fn calibrated_predictions_match_labels() {
        let mut m = AnomalyClassifier::default();
        m.fit(&train()).unwrap();
        let (x, y) = validation();
        m.calibrate(&x, &y).unwrap();
        let flags = m.predict(&x).unwrap();
        assert_eq!(flags, y);
        assert_eq!(m.predict(&x).unwrap(), flags);
    }

    #[test]
    fn uncalibrated_uses_default_epsilon() {
        let mut m = AnomalyClassifier::default();
        m.fit(&train()).unwrap();
        let (x, _) = validation();
        let p = m.score_samples(&x).unwrap();
        let flags = m.predict(&x).unwrap();
        for (pi, fi) in p.iter().zip(flags.iter()) {
            assert_eq!(*fi, u8::from(*pi < DEFAULT_EPSILON));
        }
    }

    #[test]
    fn predict_rejects_wrong_width() {
        let mut m = AnomalyClassifier::default();
        m.fit(&train()).unwrap();
        let x = FeatureMatrix::try_from(vec![1.0, 2.0]).unwrap();
        assert!(matches!(
            m.predict(&x),
            Err(AnomalyError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn manual_epsilon_clears_calibration() {
        let mut m = AnomalyClassifier::default();
        m.fit(&train()).unwrap();
        let (x, y) = validation();
        m.calibrate(&x, &y).unwrap();
        m.set_epsilon(0.5).unwrap();
        assert_eq!(m.state(), ModelState::Fitted);
        assert!(m.set_epsilon(f64::NAN).is_err());
    }

    #[test]
    fn record_restores_decisions() {
        let mut m = AnomalyClassifier::default();
        m.fit(&train()).unwrap();
        let (x, y) = validation();
        m.calibrate(&x, &y).unwrap();
        let restored = AnomalyClassifier::from_record(&m.to_record().unwrap(), DetectorConfig::default()).unwrap();
        assert_eq!(restored.state(), ModelState::Calibrated);
        assert_eq!(restored.epsilon(), m.epsilon());
        assert_eq!(restored.predict(&x).unwrap(), m.predict(&x).unwrap());
    }
}
