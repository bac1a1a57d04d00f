//! Mood classification.
//!
//! The classifier is a pure batched function from model inputs to
//! (happiness, excitedness) predictions. Its artifacts are loaded once per
//! process and shared by every caller; see [`shared_model`].

use crate::song::{ModelInput, MODEL_INPUT_LEN};
use anyhow::{bail, Context, Result};
use log::{debug, info};
use once_cell::sync::OnceCell;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Two parallel prediction lists, same length and order as the input batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predictions {
    pub happiness: Vec<f64>,
    pub excitedness: Vec<f64>,
}

/// Batched mood prediction.
///
/// Callers re-associate predictions with songs by position, so implementations
/// must return exactly one prediction per input, in input order.
pub trait MoodClassifier: Send + Sync {
    fn predict(&self, inputs: &[ModelInput]) -> Result<Predictions>;
}

/// One regression head: `intercept + Σ weights[i] * input[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearHead {
    pub weights: [f64; MODEL_INPUT_LEN],
    pub intercept: f64,
}

impl LinearHead {
    #[inline]
    fn apply(&self, input: &ModelInput) -> f64 {
        self.weights
            .iter()
            .zip(input)
            .fold(self.intercept, |acc, (w, x)| acc + w * x)
    }
}

/// Pre-trained linear mood model exported as JSON:
///
/// ```json
/// { "happiness":   { "weights": [11 numbers], "intercept": 0.0 },
///   "excitedness": { "weights": [11 numbers], "intercept": 0.0 } }
/// ```
///
/// Weight order follows [`crate::song::AudioFeatures::model_input`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearMoodModel {
    pub happiness: LinearHead,
    pub excitedness: LinearHead,
}

impl LinearMoodModel {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read mood model {}", path.display()))?;
        let model: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid mood model JSON in {}", path.display()))?;

        let all_finite = [&model.happiness, &model.excitedness]
            .iter()
            .all(|head| head.intercept.is_finite() && head.weights.iter().all(|w| w.is_finite()));
        if !all_finite {
            bail!("Mood model {} contains non-finite coefficients", path.display());
        }

        info!("Loaded mood model from {}", path.display());
        Ok(model)
    }
}

impl MoodClassifier for LinearMoodModel {
    fn predict(&self, inputs: &[ModelInput]) -> Result<Predictions> {
        debug!("Classifying {} songs", inputs.len());
        // Indexed parallel iterators collect in input order.
        let (happiness, excitedness) = inputs
            .par_iter()
            .map(|input| (self.happiness.apply(input), self.excitedness.apply(input)))
            .unzip();

        Ok(Predictions { happiness, excitedness })
    }
}

static SHARED_MODEL: OnceCell<Arc<LinearMoodModel>> = OnceCell::new();

/// The process-wide model, loaded from `path` on first use.
///
/// Later calls return the already loaded model regardless of `path`: the
/// artifacts are never reloaded during the lifetime of the process.
pub fn shared_model(path: &Path) -> Result<Arc<LinearMoodModel>> {
    SHARED_MODEL
        .get_or_try_init(|| LinearMoodModel::load(path).map(Arc::new))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> LinearMoodModel {
        let mut happiness = [0.0; MODEL_INPUT_LEN];
        happiness[9] = 10.0; // valence
        let mut excitedness = [0.0; MODEL_INPUT_LEN];
        excitedness[4] = 10.0; // energy
        LinearMoodModel {
            happiness: LinearHead { weights: happiness, intercept: -5.0 },
            excitedness: LinearHead { weights: excitedness, intercept: -5.0 },
        }
    }

    fn input(energy: f64, valence: f64) -> ModelInput {
        let mut input = [0.0; MODEL_INPUT_LEN];
        input[4] = energy;
        input[9] = valence;
        input
    }

    #[test]
    fn test_predictions_keep_input_order() {
        let inputs: Vec<ModelInput> = (0..64)
            .map(|i| input(f64::from(i) / 64.0, 1.0 - f64::from(i) / 64.0))
            .collect();
        let predictions = model().predict(&inputs).unwrap();

        assert_eq!(predictions.happiness.len(), inputs.len());
        assert_eq!(predictions.excitedness.len(), inputs.len());
        for (i, input) in inputs.iter().enumerate() {
            assert!((predictions.excitedness[i] - (input[4] * 10.0 - 5.0)).abs() < 1e-9);
            assert!((predictions.happiness[i] - (input[9] * 10.0 - 5.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_empty_batch() {
        let predictions = model().predict(&[]).unwrap();
        assert_eq!(predictions, Predictions::default());
    }

    #[test]
    fn test_load_round_trip_and_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, serde_json::to_string(&model()).unwrap()).unwrap();
        assert_eq!(LinearMoodModel::load(&path).unwrap(), model());

        fs::write(&path, r#"{"happiness": {"weights": [1, 2], "intercept": 0}}"#).unwrap();
        assert!(LinearMoodModel::load(&path).is_err(), "wrong arity is rejected");
    }

    #[test]
    fn test_shared_model_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, serde_json::to_string(&model()).unwrap()).unwrap();

        let first = shared_model(&path).unwrap();
        let second = shared_model(Path::new("/nonexistent/model.json")).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
