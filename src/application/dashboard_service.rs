// Dashboard service - Use case for building the funnel dashboard
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::application::analytics_repository::AnalyticsRepository;
use crate::application::response_cache::{cache_key, ResponseCache};
use crate::domain::dashboard::{aggregate, FunnelDashboard};
use crate::domain::error::AnalyticsError;
use crate::domain::filters::FilterSet;
use crate::domain::funnel::{normalize, Stage};

/// One fully resolved dashboard request. The input collector supplies a
/// non-empty token and validated filters before this type exists.
#[derive(Debug, Clone)]
pub struct DashboardRequest {
    pub token: String,
    pub filters: FilterSet,
    pub stages: BTreeSet<Stage>,
}

#[derive(Clone)]
pub struct DashboardService {
    repository: Arc<dyn AnalyticsRepository>,
    cache: Arc<dyn ResponseCache>,
    cache_ttl: Duration,
}

impl DashboardService {
    pub fn new(
        repository: Arc<dyn AnalyticsRepository>,
        cache: Arc<dyn ResponseCache>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            repository,
            cache,
            cache_ttl,
        }
    }

    /// Runs the pipeline: cached or fresh payload, then normalize, then
    /// aggregate. Fatal conditions abort with no partial result.
    pub async fn build_dashboard(
        &self,
        request: &DashboardRequest,
    ) -> Result<FunnelDashboard, AnalyticsError> {
        let body = self.fetch_cached(request).await?;
        let analytics = body
            .get("analytics")
            .ok_or_else(|| AnalyticsError::Schema {
                body: body.to_string(),
            })?;

        let rows = normalize(analytics);
        aggregate(rows, &request.stages)
    }

    /// Returns the cached body for this parameter tuple, or fetches and
    /// stores it. Only bodies that passed the status and schema checks are
    /// ever stored.
    async fn fetch_cached(&self, request: &DashboardRequest) -> Result<Value, AnalyticsError> {
        let key = cache_key(&request.token, &request.filters);
        if let Some(body) = self.cache.get(key) {
            tracing::debug!(key, "analytics cache hit");
            return Ok(body);
        }

        let params = request.filters.query_params(&request.token);
        let body = self.repository.fetch_analytics(&params).await?;
        self.cache.put(key, body.clone(), self.cache_ttl);
        tracing::debug!(key, "analytics cache fill");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::domain::filters::RawSelection;
    use crate::infrastructure::memory_cache::MemoryCache;

    struct StubRepository {
        calls: AtomicUsize,
        body: Value,
    }

    impl StubRepository {
        fn new(body: Value) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                body,
            })
        }
    }

    #[async_trait]
    impl AnalyticsRepository for StubRepository {
        async fn fetch_analytics(
            &self,
            _params: &[(&'static str, String)],
        ) -> Result<Value, AnalyticsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    struct FailingRepository;

    #[async_trait]
    impl AnalyticsRepository for FailingRepository {
        async fn fetch_analytics(
            &self,
            _params: &[(&'static str, String)],
        ) -> Result<Value, AnalyticsError> {
            Err(AnalyticsError::Transport {
                status: 401,
                body: "{\"error\":\"bad token\"}".to_string(),
            })
        }
    }

    fn request() -> DashboardRequest {
        DashboardRequest {
            token: "secret".to_string(),
            filters: FilterSet::resolve(&RawSelection {
                exchange_type: Some("Outgoing"),
                programmes: None,
                entity_id: Some("1606"),
                start_date: Some("2024-01-01"),
                end_date: Some("2024-12-31"),
            })
            .unwrap(),
            stages: Stage::FUNNEL.into_iter().collect(),
        }
    }

    fn payload() -> Value {
        json!({
            "analytics": {
                "total_applications": {
                    "applications": {
                        "buckets": [{"key_as_string": "2024-01-01T00:00:00Z", "doc_count": 10}]
                    }
                }
            }
        })
    }

    fn service(
        repository: Arc<dyn AnalyticsRepository>,
        ttl: Duration,
    ) -> DashboardService {
        DashboardService::new(repository, Arc::new(MemoryCache::new()), ttl)
    }

    #[tokio::test]
    async fn second_identical_request_skips_the_network() {
        let repository = StubRepository::new(payload());
        let service = service(repository.clone(), Duration::from_secs(3600));

        let first = service.build_dashboard(&request()).await.unwrap();
        let second = service.build_dashboard(&request()).await.unwrap();

        assert_eq!(repository.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.metrics.total_applied, second.metrics.total_applied);
    }

    #[tokio::test]
    async fn expired_cache_entries_fetch_again() {
        let repository = StubRepository::new(payload());
        let service = service(repository.clone(), Duration::ZERO);

        service.build_dashboard(&request()).await.unwrap();
        service.build_dashboard(&request()).await.unwrap();

        assert_eq!(repository.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn transport_errors_abort_with_the_raw_body() {
        let service = service(Arc::new(FailingRepository), Duration::from_secs(3600));

        let err = service.build_dashboard(&request()).await.expect_err("401");
        match err {
            AnalyticsError::Transport { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("bad token"));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_analytics_reports_no_data() {
        let repository = StubRepository::new(json!({"analytics": {}}));
        let service = service(repository, Duration::from_secs(3600));

        let err = service.build_dashboard(&request()).await.expect_err("empty");
        assert!(matches!(err, AnalyticsError::NoData));
    }

    #[tokio::test]
    async fn missing_analytics_object_is_a_schema_error() {
        let repository = StubRepository::new(json!({"message": "try again"}));
        let service = service(repository, Duration::from_secs(3600));

        let err = service.build_dashboard(&request()).await.expect_err("schema");
        match err {
            AnalyticsError::Schema { body } => assert!(body.contains("try again")),
            other => panic!("expected schema error, got {other:?}"),
        }
    }
}
