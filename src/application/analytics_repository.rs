// Repository trait for the remote analytics API
use async_trait::async_trait;
use serde_json::Value;

use crate::domain::error::AnalyticsError;

#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    /// Issues one GET with the resolved query parameters and returns the full
    /// decoded body. Implementations fail on non-2xx statuses and on bodies
    /// without a top-level "analytics" object, surfacing the raw body either
    /// way.
    async fn fetch_analytics(
        &self,
        params: &[(&'static str, String)],
    ) -> Result<Value, AnalyticsError>;
}
