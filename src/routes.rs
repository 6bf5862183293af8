use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Map, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    engine::SalaryEngine,
    error::AppError,
    types::{HealthResponse, ModelInfoResponse, PredictionResult, StatisticsResponse},
};

pub type AppState = Arc<SalaryEngine>;

pub fn router(engine: AppState, cors: CorsLayer, metrics: Option<PrometheusHandle>) -> Router {
    let api = Router::new()
        .route("/predict", post(predict))
        .route("/prediction/:id", get(prediction))
        .route("/health", get(health))
        .route("/model/info", get(model_info))
        .route("/statistics", post(statistics))
        .with_state(engine);

    let mut app = Router::new().nest("/api", api);
    if let Some(handle) = metrics {
        app = app.route("/metrics", get(move || render_metrics(handle.clone())));
    }
    app.layer(cors).layer(TraceLayer::new_for_http())
}

pub fn cors_layer(front_origin: &str) -> Result<CorsLayer, AppError> {
    if front_origin.trim() == "*" {
        return Ok(CorsLayer::permissive());
    }
    let origin = HeaderValue::from_str(front_origin.trim())
        .map_err(|e| config::ConfigError::Message(format!("invalid server.front_origin {:?}: {}", front_origin, e)))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any))
}

// Parsed by hand so non-object input maps onto malformed_input.
fn json_object(body: &[u8]) -> Result<Map<String, Value>, AppError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AppError::MalformedInput(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
        Err(e) => Err(AppError::MalformedInput(format!("unparsable JSON: {}", e))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

async fn predict(State(engine): State<AppState>, body: Bytes) -> Result<Json<PredictionResult>, AppError> {
    let payload = json_object(&body)?;
    let result = engine.predict(&payload).await?;
    Ok(Json(result.as_ref().clone()))
}

async fn prediction(
    State(engine): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PredictionResult>, AppError> {
    let result = engine.lookup(&id).await?;
    Ok(Json(result.as_ref().clone()))
}

async fn health(State(engine): State<AppState>) -> Json<HealthResponse> {
    Json(engine.health())
}

async fn model_info(State(engine): State<AppState>) -> Json<ModelInfoResponse> {
    Json(engine.model_info())
}

async fn statistics(State(engine): State<AppState>, body: Bytes) -> Result<Json<StatisticsResponse>, AppError> {
    // An empty body means "no filters".
    let filters = if body.iter().all(u8::is_ascii_whitespace) {
        Map::new()
    } else {
        json_object(&body)?
    };
    Ok(Json(engine.statistics(&filters)?))
}

async fn render_metrics(handle: PrometheusHandle) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
}
