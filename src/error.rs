use crate::encoder::EncodeError;
use crate::predictor::PredictError;
use crate::scaler::ScaleError;
use crate::validation::FieldError;
use crate::vocabulary::VocabularyError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Metadata mismatch: {0}")]
    MetadataMismatch(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Prediction error: {0}")]
    Prediction(String),

    #[error("Scaling error: {0}")]
    Scale(#[from] ScaleError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Vocabulary error: {0}")]
    Vocabulary(#[from] VocabularyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    // The `error` field of every error body.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::MalformedInput(_) => "malformed_input",
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::MissingColumn(_) => "missing_column",
            AppError::MetadataMismatch(_) => "metadata_mismatch",
            AppError::ModelUnavailable(_) => "model_unavailable",
            AppError::Prediction(_) => "prediction_error",
            AppError::Scale(_) => "scale_error",
            AppError::Config(_) => "config_error",
            AppError::Vocabulary(_) | AppError::Io(_) | AppError::Serialization(_) | AppError::Internal(_) => {
                "internal"
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Value {
        match self {
            AppError::Validation(errors) => json!(errors),
            AppError::MalformedInput(msg)
            | AppError::NotFound(msg)
            | AppError::MissingColumn(msg)
            | AppError::MetadataMismatch(msg)
            | AppError::ModelUnavailable(msg)
            | AppError::Prediction(msg)
            | AppError::Internal(msg) => json!(msg),
            other => json!(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::MissingColumn(_) | AppError::MetadataMismatch(_) => {
                tracing::error!("Deployment defect, model and schema disagree: {}", self);
            }
            AppError::Validation(errors) => {
                tracing::warn!("Rejected request with {} field error(s)", errors.len());
            }
            AppError::MalformedInput(_) | AppError::NotFound(_) => {
                tracing::debug!("{}", self);
            }
            _ => tracing::error!("{}", self),
        }
        metrics::counter!("request_errors_total", "kind" => self.kind()).increment(1);

        let body = Json(json!({
            "error": self.kind(),
            "details": self.details(),
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }));

        (status, body).into_response()
    }
}

impl From<Vec<FieldError>> for AppError {
    fn from(errors: Vec<FieldError>) -> Self {
        AppError::Validation(errors)
    }
}

impl From<EncodeError> for AppError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::MissingColumn { .. } => AppError::MissingColumn(err.to_string()),
            EncodeError::UnencodableColumn { .. } => AppError::MetadataMismatch(err.to_string()),
            EncodeError::UnknownEncoding { .. } => AppError::Internal(err.to_string()),
        }
    }
}

impl From<PredictError> for AppError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::Unavailable(reason) => AppError::ModelUnavailable(reason),
            PredictError::Model(e) => AppError::Prediction(e.to_string()),
        }
    }
}
