use crate::encoder::FeatureVector;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScaleError {
    #[error("scaler was fitted on column {0:?} which the feature vector lacks")]
    ColumnMismatch(String),

    #[error("scaler artifact is inconsistent: {0}")]
    InvalidArtifact(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnScaleError {
    Abort,
    #[default]
    Skip,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StandardScaler {
    columns: Vec<String>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(columns: Vec<String>, mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ScaleError> {
        let scaler = Self { columns, mean, scale };
        scaler.check()?;
        Ok(scaler)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let StandardScaler { columns, mean, scale } = serde_json::from_str(&content)?;
        let scaler = Self::new(columns, mean, scale)?;
        debug!("Loaded scaler from {} ({} columns)", path.display(), scaler.columns.len());
        Ok(scaler)
    }

    fn check(&self) -> Result<(), ScaleError> {
        if self.mean.len() != self.columns.len() || self.scale.len() != self.columns.len() {
            return Err(ScaleError::InvalidArtifact(format!(
                "{} columns but {} means and {} scales",
                self.columns.len(),
                self.mean.len(),
                self.scale.len()
            )));
        }
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn scale(&self, vector: &FeatureVector) -> Result<FeatureVector, ScaleError> {
        let mut scaled = vector.clone();
        for (i, column) in self.columns.iter().enumerate() {
            let idx = vector
                .position(column)
                .ok_or_else(|| ScaleError::ColumnMismatch(column.clone()))?;
            // sklearn treats a zero variance column as scale 1
            let s = if self.scale[i] == 0.0 { 1.0 } else { self.scale[i] };
            scaled.set(idx, (vector.values()[idx] - self.mean[i]) / s);
        }
        Ok(scaled)
    }
}

// Identity when no scaler is configured.
#[derive(Debug, Clone, Default)]
pub struct ScalingStage {
    scaler: Option<StandardScaler>,
    on_error: OnScaleError,
}

impl ScalingStage {
    pub fn new(scaler: Option<StandardScaler>, on_error: OnScaleError) -> Self {
        Self { scaler, on_error }
    }

    pub fn identity() -> Self {
        Self::default()
    }

    pub fn is_identity(&self) -> bool {
        self.scaler.is_none()
    }

    pub fn apply(&self, vector: FeatureVector) -> Result<FeatureVector, ScaleError> {
        let Some(scaler) = &self.scaler else {
            return Ok(vector);
        };

        match scaler.scale(&vector) {
            Ok(scaled) => Ok(scaled),
            Err(e) if self.on_error == OnScaleError::Skip => {
                warn!("Scaling failed, using unscaled features: {}", e);
                Ok(vector)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector() -> FeatureVector {
        FeatureVector::new(
            vec!["edad".into(), "pais".into(), "nota_media".into()],
            vec![28.0, 2.0, 8.5],
        )
    }

    fn scaler(columns: &[&str]) -> StandardScaler {
        let n = columns.len();
        StandardScaler::new(
            columns.iter().map(|s| s.to_string()).collect(),
            vec![20.0; n],
            vec![4.0; n],
        )
        .unwrap()
    }

    #[test]
    fn test_identity_when_absent() {
        let stage = ScalingStage::identity();
        assert!(stage.is_identity());
        assert_eq!(stage.apply(vector()).unwrap(), vector());
    }

    #[test]
    fn test_only_fitted_columns_change() {
        let stage = ScalingStage::new(Some(scaler(&["edad"])), OnScaleError::Abort);
        let out = stage.apply(vector()).unwrap();
        assert_eq!(out.values(), &[2.0, 2.0, 8.5]);
        assert_eq!(out.names(), vector().names());
    }

    #[test]
    fn test_zero_scale_is_treated_as_one() {
        let s = StandardScaler::new(vec!["nota_media".into()], vec![8.0], vec![0.0]).unwrap();
        let out = s.scale(&vector()).unwrap();
        assert_eq!(out.get("nota_media"), Some(0.5));
    }

    #[test]
    fn test_column_mismatch_skip_falls_back() {
        let stage = ScalingStage::new(Some(scaler(&["edad", "anios_desde_titulo"])), OnScaleError::Skip);
        assert_eq!(stage.apply(vector()).unwrap(), vector());
    }

    #[test]
    fn test_column_mismatch_abort_fails() {
        let stage = ScalingStage::new(Some(scaler(&["anios_desde_titulo"])), OnScaleError::Abort);
        assert_eq!(
            stage.apply(vector()).unwrap_err(),
            ScaleError::ColumnMismatch("anios_desde_titulo".into())
        );
    }

    #[test]
    fn test_inconsistent_artifact_rejected() {
        let err = StandardScaler::new(vec!["edad".into()], vec![], vec![1.0]).unwrap_err();
        assert!(matches!(err, ScaleError::InvalidArtifact(_)));
    }

    #[test]
    fn test_load_checks_artifact_shape() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("scaler.json");
        std::fs::write(&good, r#"{"columns": ["edad"], "mean": [30.0], "scale": [5.0]}"#).unwrap();
        assert_eq!(StandardScaler::load(&good).unwrap().columns(), &["edad".to_string()]);

        let bad = dir.path().join("short.json");
        std::fs::write(&bad, r#"{"columns": ["edad", "nota_media"], "mean": [30.0], "scale": [5.0]}"#).unwrap();
        let err = StandardScaler::load(&bad).unwrap_err();
        assert!(matches!(err.downcast_ref::<ScaleError>(), Some(ScaleError::InvalidArtifact(_))));
    }
}
