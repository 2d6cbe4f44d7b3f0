//! Churn prediction behind the `Predictor` seam.

use crate::customer::Customer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("model file not found at {0}")]
    ModelNotFound(String),
    #[error("failed to load model: {0}")]
    Load(String),
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    pub churn_prediction: u8,
    pub churn_label: String,
    pub churn_probability: Option<f64>,
}

impl Prediction {
    /// Builds a prediction whose label always agrees with the class.
    pub fn from_class(churn: bool, probability: Option<f64>) -> Result<Self, PredictionError> {
        if let Some(p) = probability {
            if !(0.0..=1.0).contains(&p) {
                return Err(PredictionError::Failed(format!(
                    "probability {p} outside [0, 1]"
                )));
            }
        }
        Ok(Self {
            churn_prediction: u8::from(churn),
            churn_label: if churn { "Churn" } else { "No Churn" }.to_string(),
            churn_probability: probability,
        })
    }
}

pub trait Predictor: Send + Sync {
    fn predict(&self, customer: &Customer) -> Result<Prediction, PredictionError>;
}

/// Logistic regression over numeric columns plus one-hot categories.
///
/// Categorical weights are keyed `Column=Value`, e.g. `Contract_Type=Two year`;
/// a missing key contributes nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub intercept: f64,
    #[serde(default)]
    pub weights: HashMap<String, f64>,
    #[serde(default)]
    pub categorical: HashMap<String, f64>,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_emit_probability")]
    pub emit_probability: bool,
}

fn default_threshold() -> f64 {
    0.5
}

fn default_emit_probability() -> bool {
    true
}

impl LogisticModel {
    pub fn load(path: &Path) -> Result<Self, PredictionError> {
        if !path.exists() {
            return Err(PredictionError::ModelNotFound(path.display().to_string()));
        }
        let raw = fs::read_to_string(path).map_err(|e| PredictionError::Load(e.to_string()))?;
        let model: LogisticModel =
            serde_json::from_str(&raw).map_err(|e| PredictionError::Load(e.to_string()))?;

        if !(0.0..=1.0).contains(&model.threshold) {
            return Err(PredictionError::Load(format!(
                "threshold {} outside [0, 1]",
                model.threshold
            )));
        }

        info!(
            path = %path.display(),
            numeric = model.weights.len(),
            categorical = model.categorical.len(),
            "loaded churn model"
        );
        Ok(model)
    }

    fn score(&self, customer: &Customer) -> f64 {
        let numeric: f64 = customer
            .numeric_features()
            .iter()
            .map(|(name, value)| self.weights.get(*name).copied().unwrap_or(0.0) * value)
            .sum();
        let categorical: f64 = customer
            .categorical_features()
            .iter()
            .filter_map(|(name, value)| self.categorical.get(&format!("{name}={value}")))
            .sum();
        self.intercept + numeric + categorical
    }
}

impl Predictor for LogisticModel {
    fn predict(&self, customer: &Customer) -> Result<Prediction, PredictionError> {
        let z = self.score(customer);
        if !z.is_finite() {
            return Err(PredictionError::Failed(format!(
                "model produced a non-finite score for {customer}"
            )));
        }
        let probability = 1.0 / (1.0 + (-z).exp());
        let churn = probability >= self.threshold;
        Prediction::from_class(churn, self.emit_probability.then_some(probability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::sample_input;
    use std::io::Write;

    fn customer() -> Customer {
        Customer::try_from(sample_input()).unwrap()
    }

    fn model(intercept: f64) -> LogisticModel {
        LogisticModel {
            intercept,
            weights: HashMap::new(),
            categorical: HashMap::new(),
            threshold: 0.5,
            emit_probability: true,
        }
    }

    #[test]
    fn test_label_follows_class() {
        let churn = Prediction::from_class(true, Some(0.9)).unwrap();
        assert_eq!(churn.churn_prediction, 1);
        assert_eq!(churn.churn_label, "Churn");

        let stay = Prediction::from_class(false, None).unwrap();
        assert_eq!(stay.churn_prediction, 0);
        assert_eq!(stay.churn_label, "No Churn");
        assert_eq!(stay.churn_probability, None);
    }

    #[test]
    fn test_probability_out_of_range_rejected() {
        assert!(Prediction::from_class(true, Some(1.5)).is_err());
    }

    #[test]
    fn test_intercept_only_model() {
        let churn = model(3.0).predict(&customer()).unwrap();
        assert_eq!(churn.churn_prediction, 1);
        assert!(churn.churn_probability.unwrap() > 0.9);

        let stay = model(-3.0).predict(&customer()).unwrap();
        assert_eq!(stay.churn_prediction, 0);
        assert!(stay.churn_probability.unwrap() < 0.1);
    }

    #[test]
    fn test_categorical_weights_apply() {
        let mut m = model(0.0);
        m.categorical
            .insert("Contract_Type=Month-to-month".to_string(), 2.0);
        m.categorical.insert("Contract_Type=Two year".to_string(), -2.0);
        let p = m.predict(&customer()).unwrap();
        assert_eq!(p.churn_label, "Churn");
    }

    #[test]
    fn test_without_probability_output() {
        let mut m = model(1.0);
        m.emit_probability = false;
        let p = m.predict(&customer()).unwrap();
        assert_eq!(p.churn_prediction, 1);
        assert_eq!(p.churn_probability, None);
    }

    #[test]
    fn test_non_finite_score_fails() {
        let mut m = model(0.0);
        m.weights.insert("Age".to_string(), f64::INFINITY);
        m.weights.insert("Tenure".to_string(), f64::NEG_INFINITY);
        assert!(matches!(
            m.predict(&customer()),
            Err(PredictionError::Failed(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"intercept": -1.0, "weights": {{"Tenure": -0.05}}, "categorical": {{"InternetService=Fiber optic": 0.8}}}}"#
        )
        .unwrap();

        let m = LogisticModel::load(file.path()).unwrap();
        assert_eq!(m.threshold, 0.5);
        assert!(m.emit_probability);
        let p = m.predict(&customer()).unwrap();
        assert!((0.0..=1.0).contains(&p.churn_probability.unwrap()));
    }

    #[test]
    fn test_load_missing_file() {
        let err = LogisticModel::load(Path::new("/nonexistent/churn.json")).unwrap_err();
        assert!(matches!(err, PredictionError::ModelNotFound(_)));
    }

    #[test]
    fn test_shipped_model_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("model/churn_model.json");
        let m = LogisticModel::load(&path).unwrap();
        let p = m.predict(&customer()).unwrap();
        assert!(p.churn_prediction <= 1);
    }
}
