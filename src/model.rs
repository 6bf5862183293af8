use crate::encoder::FeatureVector;
use crate::schema::Field;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const HEURISTIC_BASE: f64 = 45000.0;
const HEURISTIC_PER_YEAR_OF_AGE: f64 = 500.0;
const HEURISTIC_DEFAULT_AGE: f64 = 25.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("model expects {expected} features, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("feature {position} is {got:?} but the model was trained on {expected:?}")]
    ColumnMismatch {
        position: usize,
        expected: String,
        got: String,
    },

    #[error("model produced a non-finite prediction ({0})")]
    NonFinite(f64),
}

// salary = intercept + weights . x
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LinearModel {
    pub intercept: f64,
    pub weights: Vec<f64>,
    pub feature_order: Vec<String>,
}

impl LinearModel {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
        let model: LinearModel = serde_json::from_str(&data)?;
        if model.weights.len() != model.feature_order.len() {
            anyhow::bail!(
                "{} weights for {} features in {}",
                model.weights.len(),
                model.feature_order.len(),
                path.display()
            );
        }
        debug!("Loaded linear model from {} ({} features)", path.display(), model.weights.len());
        Ok(model)
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        if features.values().len() != self.weights.len() {
            return Err(ModelError::ShapeMismatch {
                expected: self.weights.len(),
                got: features.values().len(),
            });
        }
        for (position, (expected, got)) in self.feature_order.iter().zip(features.names()).enumerate() {
            if expected != got {
                return Err(ModelError::ColumnMismatch {
                    position,
                    expected: expected.clone(),
                    got: got.clone(),
                });
            }
        }

        let w = DVector::from_column_slice(&self.weights);
        let x = DVector::from_column_slice(features.values());
        Ok(self.intercept + w.dot(&x))
    }
}

#[derive(Clone, Debug)]
pub enum ModelBackend {
    LoadedModel(LinearModel),
    // 45000 + edad * 500
    HeuristicStub,
}

impl ModelBackend {
    pub fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let y = match self {
            ModelBackend::LoadedModel(model) => model.predict(features)?,
            ModelBackend::HeuristicStub => {
                let edad = features.get_field(Field::Edad).unwrap_or(HEURISTIC_DEFAULT_AGE);
                HEURISTIC_BASE + edad * HEURISTIC_PER_YEAR_OF_AGE
            }
        };

        if !y.is_finite() {
            return Err(ModelError::NonFinite(y));
        }
        Ok(y)
    }

    pub fn is_real(&self) -> bool {
        matches!(self, ModelBackend::LoadedModel(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(names: &[&str], values: &[f64]) -> FeatureVector {
        FeatureVector::new(names.iter().map(|s| s.to_string()).collect(), values.to_vec())
    }

    fn model() -> LinearModel {
        LinearModel {
            intercept: 1000.0,
            weights: vec![100.0, 10.0],
            feature_order: vec!["edad".into(), "nota_media".into()],
        }
    }

    #[test]
    fn test_heuristic_uses_age() {
        let v = vector(&["edad", "pais"], &[28.0, 2.0]);
        assert_eq!(ModelBackend::HeuristicStub.predict(&v).unwrap(), 59000.0);
        let v = vector(&["pais"], &[2.0]);
        assert_eq!(ModelBackend::HeuristicStub.predict(&v).unwrap(), 57500.0);
        assert!(!ModelBackend::HeuristicStub.is_real());
    }

    #[test]
    fn test_linear_prediction() {
        let backend = ModelBackend::LoadedModel(model());
        let v = vector(&["edad", "nota_media"], &[30.0, 8.0]);
        assert_eq!(backend.predict(&v).unwrap(), 1000.0 + 3000.0 + 80.0);
        assert!(backend.is_real());
    }

    #[test]
    fn test_linear_rejects_wrong_shape() {
        let v = vector(&["edad"], &[30.0]);
        assert_eq!(
            model().predict(&v).unwrap_err(),
            ModelError::ShapeMismatch { expected: 2, got: 1 }
        );
    }

    #[test]
    fn test_linear_rejects_reordered_columns() {
        let v = vector(&["nota_media", "edad"], &[8.0, 30.0]);
        assert!(matches!(
            model().predict(&v).unwrap_err(),
            ModelError::ColumnMismatch { position: 0, .. }
        ));
    }

    #[test]
    fn test_non_finite_output_is_an_error() {
        let mut m = model();
        m.intercept = f64::INFINITY;
        let v = vector(&["edad", "nota_media"], &[30.0, 8.0]);
        assert!(matches!(
            ModelBackend::LoadedModel(m).predict(&v).unwrap_err(),
            ModelError::NonFinite(_)
        ));
    }
}
