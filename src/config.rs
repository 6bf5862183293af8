use crate::scaler::OnScaleError;
use serde::Deserialize;
use std::path::PathBuf;

const CONFIG_PATH_VAR: &str = "SALARY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub validation: ValidationConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    // "*" allows any origin
    pub front_origin: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Model,
    Heuristic,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub backend: BackendKind,
    pub model_path: PathBuf,
    pub metadata_path: PathBuf,
    pub scaler_path: Option<PathBuf>,
    pub on_scale_error: OnScaleError,
    pub default_version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    pub accept_numeric_codes: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub prediction_ttl_seconds: u64,
    pub prediction_capacity: u64,
}

impl Config {
    // Defaults, then the SALARY_CONFIG toml, then SALARY__SECTION__KEY env vars.
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        Self::builder()?
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix("SALARY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        config::Config::builder()
            .set_default("server.bind_addr", "0.0.0.0:5000")?
            .set_default("server.front_origin", "*")?
            .set_default("model.backend", "model")?
            .set_default("model.model_path", "data/model.json")?
            .set_default("model.metadata_path", "data/metadata.json")?
            .set_default("model.on_scale_error", "skip")?
            .set_default("model.default_version", "v1.0.0")?
            .set_default("validation.accept_numeric_codes", false)?
            .set_default("cache.prediction_ttl_seconds", 3600)?
            .set_default("cache.prediction_capacity", 10_000)
    }
}
