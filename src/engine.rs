use crate::{
    comparisons::{build_comparisons, ReferenceTable},
    config::Config,
    encoder::FeatureEncoder,
    error::AppError,
    predictor::Predictor,
    statistics::{base_profile, StatisticsCache, StatsFilters, StatsSnapshot, UNAVAILABLE_AVERAGE_SALARY},
    store::PredictionStore,
    types::*,
    validation::RequestValidator,
    vocabulary::Vocabulary,
};
use serde_json::{Map, Value};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

const SALARY_RANGE_BELOW: f64 = 5000.0;
const SALARY_RANGE_ABOVE: f64 = 8000.0;

// Built once at startup, shared read-only between handlers.
pub struct SalaryEngine {
    vocabulary: Arc<Vocabulary>,
    validator: RequestValidator,
    encoder: FeatureEncoder,
    predictor: Predictor,
    reference: ReferenceTable,
    stats: StatisticsCache,
    store: PredictionStore,
    total_predictions: AtomicU64,
    session_id: String,
}

impl SalaryEngine {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        info!("Initializing salary engine...");

        let predictor = Predictor::load(&config.model)?;
        let store = PredictionStore::new(
            Duration::from_secs(config.cache.prediction_ttl_seconds),
            config.cache.prediction_capacity,
        );
        let engine = Self::with_predictor(predictor, store, config.validation.accept_numeric_codes)?;

        info!(
            "Salary engine initialized (model {}, state {:?})",
            engine.predictor.load_meta().version,
            engine.predictor.state()
        );
        Ok(engine)
    }

    pub fn with_predictor(
        predictor: Predictor,
        store: PredictionStore,
        accept_numeric_codes: bool,
    ) -> Result<Self, AppError> {
        let vocabulary = Arc::new(Vocabulary::standard()?);

        let engine = Self {
            validator: RequestValidator::new(Arc::clone(&vocabulary), accept_numeric_codes),
            encoder: FeatureEncoder::new(Arc::clone(&vocabulary)),
            vocabulary,
            predictor,
            reference: ReferenceTable::default(),
            stats: StatisticsCache::new(),
            store,
            total_predictions: AtomicU64::new(0),
            session_id: Uuid::new_v4().to_string(),
        };

        // An encoder that cannot fill the model's columns is a deployment
        // defect; surface it before serving.
        let baseline = engine.encoder.encode(&base_profile(), engine.predictor.column_order())?;
        engine.predictor.scaling().apply(baseline)?;

        engine.refresh_statistics();
        Ok(engine)
    }

    // No-op while the model is unavailable.
    pub fn refresh_statistics(&self) {
        if !self.predictor.is_available() {
            warn!("Model unavailable, statistics not computed");
            return;
        }
        let snapshot = StatsSnapshot::compute(&base_profile(), &self.vocabulary, |p| self.run_pipeline(p));
        self.stats.replace(snapshot);
    }

    // Input is already validated; errors here are never the caller's fault.
    fn run_pipeline(&self, req: &PredictionRequest) -> Result<f64, AppError> {
        let features = self.encoder.encode(req, self.predictor.column_order())?;
        let features = self.predictor.scaling().apply(features)?;
        debug!("Feature vector: {:?}", features.values());
        Ok(self.predictor.predict_one(&features)?)
    }

    pub async fn predict(&self, payload: &Map<String, Value>) -> Result<Arc<PredictionResult>, AppError> {
        let start = Instant::now();

        let request = self.validator.validate(payload).map_err(|errors| {
            metrics::counter!("validation_failures_total").increment(1);
            AppError::Validation(errors)
        })?;

        let salary = self.run_pipeline(&request).map_err(|e| {
            metrics::counter!("prediction_errors_total", "kind" => e.kind()).increment(1);
            e
        })?;

        let total = self.total_predictions.fetch_add(1, Ordering::Relaxed) + 1;
        let stats = self.stats.snapshot();
        let meta = self.predictor.load_meta();

        let result = PredictionResult {
            form_id: PredictionStore::next_id(),
            salary,
            model_version: meta.version.clone(),
            using_real_model: self.predictor.using_real_model(),
            timestamp: chrono::Utc::now(),
            comparisons: build_comparisons(&request, salary, &stats, &self.reference, &self.vocabulary),
            statistics: PredictionStatistics {
                total_predictions: total,
                salary_range: SalaryRange {
                    min: salary - SALARY_RANGE_BELOW,
                    max: salary + SALARY_RANGE_ABOVE,
                },
            },
        };
        let result = self.store.insert(result).await;

        let latency = start.elapsed().as_secs_f64() * 1000.0;
        metrics::counter!("predictions_total").increment(1);
        metrics::histogram!("prediction_duration_ms").record(latency);
        info!("Prediction {} = {:.2} in {:.2}ms", result.form_id, salary, latency);

        Ok(result)
    }

    pub async fn lookup(&self, id: &str) -> Result<Arc<PredictionResult>, AppError> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| AppError::NotFound(format!("prediction {}", id)))
    }

    pub fn statistics(&self, filters: &Map<String, Value>) -> Result<StatisticsResponse, AppError> {
        let filters = StatsFilters::from_payload(filters, &self.vocabulary)?;

        if !self.predictor.is_available() {
            let mut response = self.stats.snapshot().to_response();
            response.average_salary = UNAVAILABLE_AVERAGE_SALARY;
            let profile = filters.apply(base_profile());
            response.average_age = profile.edad;
            response.average_grade = profile.nota_media;
            return Ok(response);
        }

        if filters.is_empty() {
            return Ok(self.stats.snapshot().to_response());
        }

        let profile = filters.apply(base_profile());
        let snapshot = StatsSnapshot::compute(&profile, &self.vocabulary, |p| self.run_pipeline(p));
        Ok(snapshot.to_response())
    }

    pub fn health(&self) -> HealthResponse {
        let (status, detail) = self.predictor.health();
        HealthResponse {
            status,
            detail,
            version: self.predictor.load_meta().version.clone(),
            timestamp: chrono::Utc::now(),
            server_session_id: self.session_id.clone(),
        }
    }

    pub fn model_info(&self) -> ModelInfoResponse {
        let meta = self.predictor.load_meta();
        ModelInfoResponse {
            version: meta.version.clone(),
            trained_at: meta.trained_at.clone(),
            metrics: meta.metrics.clone(),
            features: meta.features.clone(),
            predictor_available: self.predictor.is_available(),
        }
    }
}
