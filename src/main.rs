//! gauss-anomaly entrypoint.
//!
//! `gauss-anomaly train <dataset.json> <model.json>` fits on `train`, calibrates on `validation` when
//! present, and saves the model. `gauss-anomaly predict <model.json> <matrix.json>` prints one flag per row.
//! Config is read from `GAUSS_ANOMALY_CONFIG` (default `config.json`).

use gauss_anomaly::{
    config::DetectorConfig,
    logging::{LogEvent, StructuredLogger},
    AnomalyClassifier, FeatureMatrix, LabelVector,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Deserialize)]
struct Dataset {
    train: Vec<Vec<f64>>,
    #[serde(default)]
    validation: Option<Validation>,
}

#[derive(Deserialize)]
struct Validation {
    x: Vec<Vec<f64>>,
    y: Vec<u8>,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, BoxError> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn train(config: DetectorConfig, dataset: &Path, model_path: &Path) -> Result<(), BoxError> {
    let data: Dataset = read_json(dataset)?;
    let x = FeatureMatrix::from_rows(&data.train)?;

    let mut model = AnomalyClassifier::new(config);
    model.fit(&x)?;
    let selection = match data.validation {
        Some(v) => {
            let x_val = FeatureMatrix::from_rows(&v.x)?;
            let y_val = LabelVector::from_vec(v.y);
            Some(model.calibrate(&x_val, &y_val)?)
        }
        None => {
            info!("no validation set; keeping default epsilon");
            None
        }
    };
    model.save(model_path)?;

    let model_name = model_path.display().to_string();
    let mut ev = LogEvent::new("train");
    ev.model = Some(model_name.as_str());
    ev.rows = Some(x.nrows());
    ev.features = Some(x.ncols());
    ev.epsilon = Some(model.epsilon());
    ev.f1 = selection.map(|s| s.f1);
    StructuredLogger::emit_json(&ev, &mut std::io::stdout().lock())?;
    Ok(())
}

fn predict(config: DetectorConfig, model_path: &Path, matrix: &Path) -> Result<(), BoxError> {
    let model = AnomalyClassifier::load(model_path, config)?;
    let rows: Vec<Vec<f64>> = read_json(matrix)?;
    let x = FeatureMatrix::from_rows(&rows)?;
    let flags = model.predict(&x)?.to_vec();

    let model_name = model_path.display().to_string();
    let mut ev = LogEvent::new("predict");
    ev.model = Some(model_name.as_str());
    ev.rows = Some(flags.len());
    ev.epsilon = Some(model.epsilon());
    ev.anomalies = Some(flags.iter().filter(|&&f| f == 1).count());
    ev.flags = Some(flags.as_slice());
    StructuredLogger::emit_json(&ev, &mut std::io::stdout().lock())?;
    Ok(())
}

fn usage() -> BoxError {
    "usage: gauss-anomaly train <dataset.json> <model.json> | predict <model.json> <matrix.json>".into()
}

fn main() -> Result<(), BoxError> {
    let config_path = std::env::var("GAUSS_ANOMALY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.json"));
    let config = DetectorConfig::load(&config_path);

    StructuredLogger::init(config.log.json, &config.log.level);
    config.validate()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.as_slice() {
        [cmd, a, b] if cmd == "train" => train(config, Path::new(a), Path::new(b)),
        [cmd, a, b] if cmd == "predict" => predict(config, Path::new(a), Path::new(b)),
        _ => Err(usage()),
    };

    if let Err(e) = &result {
        let msg = e.to_string();
        let mut ev = LogEvent::new("error");
        ev.error = Some(msg.as_str());
        let _ = StructuredLogger::emit_json(&ev, &mut std::io::stderr().lock());
    }
    result
}
