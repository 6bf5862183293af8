use crate::config::{BackendKind, ModelConfig};
use crate::encoder::FeatureVector;
use crate::error::AppError;
use crate::model::{LinearModel, ModelBackend, ModelError};
use crate::scaler::{ScalingStage, StandardScaler};
use crate::schema::Field;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

// Bump when COLUMN_ORDER changes.
pub const COLUMN_ORDER_VERSION: u32 = 1;

// Used when no metadata file is deployed.
pub const COLUMN_ORDER: [&str; 12] = [
    "edad",
    "pais",
    "genero",
    "titulacion",
    "anios_desde_titulo",
    "campo_estudio",
    "nivel_ingles",
    "universidad_ranking",
    "region_estudio",
    "nota_media",
    "practicas",
    "situacion_laboral",
];

pub const MOCK_VERSION: &str = "mock";
pub const ERROR_VERSION: &str = "error";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictError {
    #[error("{0}")]
    Unavailable(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ModelMetadata {
    pub version: String,
    pub trained_at: String,
    #[serde(default)]
    pub metrics: BTreeMap<String, Value>,
    pub features: Vec<String>,
}

impl ModelMetadata {
    fn default_columns() -> Vec<String> {
        COLUMN_ORDER.iter().map(|c| c.to_string()).collect()
    }

    pub fn synthesized(version: &str) -> Self {
        let mut metrics = BTreeMap::new();
        metrics.insert("column_order_version".to_string(), Value::from(COLUMN_ORDER_VERSION));
        Self {
            version: version.to_string(),
            trained_at: chrono::Utc::now().to_rfc3339(),
            metrics,
            features: Self::default_columns(),
        }
    }

    fn placeholder(version: &str, note: Option<&str>) -> Self {
        let mut metrics = BTreeMap::new();
        if let Some(note) = note {
            metrics.insert("note".to_string(), Value::from(note));
        }
        Self {
            version: version.to_string(),
            trained_at: chrono::Utc::now().to_rfc3339(),
            metrics,
            features: Self::default_columns(),
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    // Extra or unknown features are left for the encoder to report.
    pub fn validate(&self) -> Result<(), AppError> {
        let declared: Vec<Field> = self.features.iter().filter_map(|f| Field::from_key(f)).collect();
        let missing: Vec<&str> = Field::ALL
            .iter()
            .filter(|f| f.is_model_input() && !declared.contains(f))
            .map(|f| f.name())
            .collect();

        if !missing.is_empty() {
            return Err(AppError::MetadataMismatch(format!(
                "metadata features omit required column(s): {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredictorState {
    Loaded,
    Heuristic,
    Degraded { reason: String },
}

#[derive(Debug)]
pub struct Predictor {
    backend: Option<ModelBackend>,
    metadata: ModelMetadata,
    scaling: ScalingStage,
    state: PredictorState,
}

impl Predictor {
    // A missing or unreadable model artifact degrades instead of failing.
    pub fn load(config: &ModelConfig) -> Result<Self, AppError> {
        if config.backend == BackendKind::Heuristic {
            info!("Using heuristic backend, no model artifact loaded");
            return Ok(Self::heuristic());
        }

        let model = match LinearModel::load(&config.model_path) {
            Ok(model) => model,
            Err(e) => {
                warn!("Model artifact unavailable, predictions disabled: {:#}", e);
                return Ok(Self::degraded(format!("{:#}", e)));
            }
        };

        let metadata = if config.metadata_path.exists() {
            ModelMetadata::load(&config.metadata_path).map_err(|e| {
                AppError::MetadataMismatch(format!("unreadable metadata {}: {:#}", config.metadata_path.display(), e))
            })?
        } else {
            warn!(
                "No metadata at {}, assuming default column order v{}",
                config.metadata_path.display(),
                COLUMN_ORDER_VERSION
            );
            ModelMetadata::synthesized(&config.default_version)
        };

        let scaler = match &config.scaler_path {
            Some(path) if path.exists() => Some(
                StandardScaler::load(path)
                    .map_err(|e| AppError::MetadataMismatch(format!("unreadable scaler {}: {:#}", path.display(), e)))?,
            ),
            Some(path) => {
                warn!("Scaler {} not found, features go to the model unscaled", path.display());
                None
            }
            None => None,
        };
        if let Some(scaler) = &scaler {
            info!("Standardizing columns {:?}", scaler.columns());
        }
        let scaling = ScalingStage::new(scaler, config.on_scale_error);

        let predictor = Self::from_parts(ModelBackend::LoadedModel(model), metadata, scaling)?;
        info!(
            "Loaded model {} with {} features",
            predictor.metadata.version,
            predictor.metadata.features.len()
        );
        Ok(predictor)
    }

    pub fn from_parts(backend: ModelBackend, metadata: ModelMetadata, scaling: ScalingStage) -> Result<Self, AppError> {
        metadata.validate()?;

        // The heuristic reads raw edad, scaled inputs would skew it silently.
        if !backend.is_real() && !scaling.is_identity() {
            return Err(AppError::Config(config::ConfigError::Message(
                "a scaler cannot be combined with the heuristic backend".to_string(),
            )));
        }

        if let ModelBackend::LoadedModel(model) = &backend {
            if model.feature_order != metadata.features {
                return Err(AppError::MetadataMismatch(format!(
                    "model was trained on {:?} but metadata declares {:?}",
                    model.feature_order, metadata.features
                )));
            }
        }

        let state = if backend.is_real() {
            PredictorState::Loaded
        } else {
            PredictorState::Heuristic
        };
        Ok(Self {
            backend: Some(backend),
            metadata,
            scaling,
            state,
        })
    }

    pub fn heuristic() -> Self {
        Self {
            backend: Some(ModelBackend::HeuristicStub),
            metadata: ModelMetadata::placeholder(MOCK_VERSION, None),
            scaling: ScalingStage::identity(),
            state: PredictorState::Heuristic,
        }
    }

    pub fn degraded(reason: String) -> Self {
        Self {
            backend: None,
            metadata: ModelMetadata::placeholder(ERROR_VERSION, Some(&reason)),
            scaling: ScalingStage::identity(),
            state: PredictorState::Degraded { reason },
        }
    }

    pub fn load_meta(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn column_order(&self) -> &[String] {
        &self.metadata.features
    }

    pub fn scaling(&self) -> &ScalingStage {
        &self.scaling
    }

    pub fn state(&self) -> &PredictorState {
        &self.state
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn using_real_model(&self) -> bool {
        matches!(self.state, PredictorState::Loaded)
    }

    pub fn predict_one(&self, features: &FeatureVector) -> Result<f64, PredictError> {
        let backend = self.backend.as_ref().ok_or_else(|| match &self.state {
            PredictorState::Degraded { reason } => PredictError::Unavailable(reason.clone()),
            _ => PredictError::Unavailable("no model backend".to_string()),
        })?;
        Ok(backend.predict(features)?)
    }

    pub fn health(&self) -> (&'static str, Option<String>) {
        match &self.state {
            PredictorState::Loaded => ("ok", None),
            PredictorState::Heuristic => ("ok (mock)", None),
            PredictorState::Degraded { reason } => ("ok (mock)", Some(reason.clone())),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::scaler::OnScaleError;
    use tempfile::TempDir;

    pub(crate) fn columns() -> Vec<String> {
        COLUMN_ORDER.iter().map(|c| c.to_string()).collect()
    }

    pub(crate) fn linear_model() -> LinearModel {
        let mut weights = vec![0.0; 12];
        weights[0] = 1000.0;
        weights[9] = 2000.0;
        LinearModel {
            intercept: 10000.0,
            weights,
            feature_order: columns(),
        }
    }

    pub(crate) fn loaded_predictor() -> Predictor {
        Predictor::from_parts(
            ModelBackend::LoadedModel(linear_model()),
            ModelMetadata::synthesized("test-1"),
            ScalingStage::identity(),
        )
        .unwrap()
    }

    fn vector(edad: f64, nota: f64) -> FeatureVector {
        let mut values = vec![0.0; 12];
        values[0] = edad;
        values[9] = nota;
        FeatureVector::new(columns(), values)
    }

    fn model_config(dir: &Path, backend: BackendKind) -> ModelConfig {
        ModelConfig {
            backend,
            model_path: dir.join("model.json"),
            metadata_path: dir.join("metadata.json"),
            scaler_path: None,
            on_scale_error: OnScaleError::Skip,
            default_version: "v-default".to_string(),
        }
    }

    fn artifact_dir() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_loaded_predicts() {
        let p = loaded_predictor();
        assert!(p.using_real_model());
        assert_eq!(p.predict_one(&vector(30.0, 8.0)).unwrap(), 10000.0 + 30000.0 + 16000.0);
        assert_eq!(p.health(), ("ok", None));
    }

    #[test]
    fn test_heuristic_reports_mock() {
        let p = Predictor::heuristic();
        assert!(!p.using_real_model());
        assert!(p.is_available());
        assert_eq!(p.load_meta().version, MOCK_VERSION);
        assert_eq!(p.predict_one(&vector(28.0, 0.0)).unwrap(), 59000.0);
        assert_eq!(p.health().0, "ok (mock)");
    }

    #[test]
    fn test_degraded_refuses_predictions() {
        let p = Predictor::degraded("model.json missing".into());
        assert!(!p.is_available());
        assert_eq!(p.load_meta().version, ERROR_VERSION);
        assert_eq!(
            p.predict_one(&vector(28.0, 7.0)).unwrap_err(),
            PredictError::Unavailable("model.json missing".into())
        );
        let (status, detail) = p.health();
        assert_eq!(status, "ok (mock)");
        assert_eq!(detail.as_deref(), Some("model.json missing"));
    }

    #[test]
    fn test_metadata_must_cover_required_columns() {
        let mut meta = ModelMetadata::synthesized("v");
        meta.features.retain(|f| f != "nota_media");
        let err = meta.validate().unwrap_err();
        assert!(matches!(err, AppError::MetadataMismatch(ref m) if m.contains("nota_media")));
    }

    #[test]
    fn test_metadata_accepts_alias_names() {
        let meta = ModelMetadata {
            version: "v".into(),
            trained_at: "2024-01-01".into(),
            metrics: BTreeMap::new(),
            features: vec![
                "Age", "Country_of_Origin", "Gender", "Education_Level", "Years_Since_Graduation", "Field_of_Study",
                "Language_Proficiency", "University_Ranking", "Region_of_Study", "GPA_10", "Internship_Experience",
                "Employment_Status",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        };
        assert!(meta.validate().is_ok());
    }

    #[test]
    fn test_model_and_metadata_order_must_agree() {
        let mut meta = ModelMetadata::synthesized("v");
        meta.features.swap(0, 1);
        let err = Predictor::from_parts(ModelBackend::LoadedModel(linear_model()), meta, ScalingStage::identity())
            .unwrap_err();
        assert_eq!(err.kind(), "metadata_mismatch");
    }

    #[test]
    fn test_load_missing_artifact_degrades() {
        let dir = artifact_dir();
        let p = Predictor::load(&model_config(dir.path(), BackendKind::Model)).unwrap();
        assert!(matches!(p.state(), PredictorState::Degraded { .. }));
        assert!(p.column_order().len() == 12);
    }

    #[test]
    fn test_load_without_metadata_uses_default_order() {
        let dir = artifact_dir();
        std::fs::write(dir.path().join("model.json"), serde_json::to_string(&linear_model()).unwrap()).unwrap();
        let p = Predictor::load(&model_config(dir.path(), BackendKind::Model)).unwrap();
        assert!(p.using_real_model());
        assert_eq!(p.load_meta().version, "v-default");
        assert_eq!(p.column_order(), columns().as_slice());
    }

    #[test]
    fn test_load_with_bad_metadata_is_fatal() {
        let dir = artifact_dir();
        std::fs::write(dir.path().join("model.json"), serde_json::to_string(&linear_model()).unwrap()).unwrap();
        std::fs::write(
            dir.path().join("metadata.json"),
            r#"{"version": "v2", "trained_at": "2024-05-01", "features": ["edad", "pais"]}"#,
        )
        .unwrap();
        assert!(Predictor::load(&model_config(dir.path(), BackendKind::Model)).is_err());
    }

    #[test]
    fn test_heuristic_config_skips_artifacts() {
        let dir = artifact_dir();
        let p = Predictor::load(&model_config(dir.path(), BackendKind::Heuristic)).unwrap();
        assert_eq!(p.state(), &PredictorState::Heuristic);
    }

    #[test]
    fn test_heuristic_with_scaler_is_rejected() {
        let scaler = StandardScaler::new(vec!["edad".into()], vec![30.0], vec![5.0]).unwrap();
        let err = Predictor::from_parts(
            ModelBackend::HeuristicStub,
            ModelMetadata::synthesized("v"),
            ScalingStage::new(Some(scaler), OnScaleError::Skip),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "config_error");

        let p = Predictor::from_parts(
            ModelBackend::HeuristicStub,
            ModelMetadata::synthesized("v"),
            ScalingStage::identity(),
        )
        .unwrap();
        assert_eq!(p.predict_one(&vector(28.0, 0.0)).unwrap(), 59000.0);
    }

    #[test]
    fn test_load_applies_scaler_file() {
        let dir = artifact_dir();
        std::fs::write(dir.path().join("model.json"), serde_json::to_string(&linear_model()).unwrap()).unwrap();
        let scaler_path = dir.path().join("scaler.json");
        std::fs::write(&scaler_path, r#"{"columns": ["edad"], "mean": [20.0], "scale": [2.0]}"#).unwrap();
        let mut config = model_config(dir.path(), BackendKind::Model);
        config.scaler_path = Some(scaler_path);

        let p = Predictor::load(&config).unwrap();
        assert!(!p.scaling().is_identity());
        let scaled = p.scaling().apply(vector(30.0, 8.0)).unwrap();
        assert_eq!(scaled.get("edad"), Some(5.0));
    }
}
