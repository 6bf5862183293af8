use crate::types::PredictionResult;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const ID_PREFIX: &str = "pred_";

#[derive(Clone)]
pub struct PredictionStore {
    cache: Cache<String, Arc<PredictionResult>>,
}

impl PredictionStore {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        let cache = Cache::builder().time_to_live(ttl).max_capacity(capacity).build();
        Self { cache }
    }

    pub fn next_id() -> String {
        format!("{}{}", ID_PREFIX, Uuid::new_v4())
    }

    pub async fn insert(&self, result: PredictionResult) -> Arc<PredictionResult> {
        let result = Arc::new(result);
        self.cache.insert(result.form_id.clone(), Arc::clone(&result)).await;
        result
    }

    pub async fn get(&self, id: &str) -> Option<Arc<PredictionResult>> {
        if !id.starts_with(ID_PREFIX) {
            return None;
        }
        self.cache.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparisons::{build_comparisons, ReferenceTable};
    use crate::statistics::StatsSnapshot;
    use crate::types::{sample_request, PredictionStatistics, SalaryRange};
    use crate::vocabulary::Vocabulary;

    fn result(form_id: String) -> PredictionResult {
        let vocab = Vocabulary::standard().unwrap();
        PredictionResult {
            form_id,
            salary: 59000.0,
            model_version: "mock".into(),
            using_real_model: false,
            timestamp: chrono::Utc::now(),
            comparisons: build_comparisons(
                &sample_request(),
                59000.0,
                &StatsSnapshot::default(),
                &ReferenceTable::default(),
                &vocab,
            ),
            statistics: PredictionStatistics {
                total_predictions: 1,
                salary_range: SalaryRange { min: 54000.0, max: 67000.0 },
            },
        }
    }

    #[test]
    fn test_ids_are_prefixed_and_unique() {
        let a = PredictionStore::next_id();
        let b = PredictionStore::next_id();
        assert!(a.starts_with("pred_"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let store = PredictionStore::new(Duration::from_secs(60), 100);
        let id = PredictionStore::next_id();
        store.insert(result(id.clone())).await;

        let found = store.get(&id).await.unwrap();
        assert_eq!(found.salary, 59000.0);
        assert!(store.get(&PredictionStore::next_id()).await.is_none());
        assert!(store.get("not-an-id").await.is_none());
    }
}
