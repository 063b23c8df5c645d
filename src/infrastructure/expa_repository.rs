// EXPA analytics API repository implementation
use async_trait::async_trait;
use serde_json::Value;

use crate::application::analytics_repository::AnalyticsRepository;
use crate::domain::error::AnalyticsError;

#[derive(Debug, Clone)]
pub struct ExpaRepository {
    endpoint: String,
    client: reqwest::Client,
}

impl ExpaRepository {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Builds the request URL by hand; the protocol uses bracketed parameter
    /// names (`histogram[type]`, `programmes[]`), which must be
    /// percent-encoded like any other name.
    fn build_request_url(&self, params: &[(&'static str, String)]) -> String {
        let query: Vec<String> = params
            .iter()
            .map(|(name, value)| {
                format!("{}={}", urlencoding::encode(name), urlencoding::encode(value))
            })
            .collect();
        format!("{}?{}", self.endpoint, query.join("&"))
    }
}

#[async_trait]
impl AnalyticsRepository for ExpaRepository {
    async fn fetch_analytics(
        &self,
        params: &[(&'static str, String)],
    ) -> Result<Value, AnalyticsError> {
        let url = self.build_request_url(params);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "analytics request failed");
            return Err(AnalyticsError::Transport {
                status: status.as_u16(),
                body: text,
            });
        }

        let body: Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) => return Err(AnalyticsError::Schema { body: text }),
        };
        if body.get("analytics").is_none() {
            return Err(AnalyticsError::Schema {
                body: body.to_string(),
            });
        }

        Ok(body)
    }
}
