// Error taxonomy for the funnel pipeline
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Bad user input, caught before any network access.
    #[error("{0}")]
    Input(String),

    /// The HTTP request itself failed (connect, timeout, body read).
    #[error("analytics request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx status from the API; the body is kept verbatim for diagnosis.
    #[error("analytics request failed with status {status}")]
    Transport { status: u16, body: String },

    /// 2xx response without the top-level "analytics" object.
    #[error("analytics response does not contain 'analytics'")]
    Schema { body: String },

    /// Every row was filtered out; distinct from a transport failure.
    #[error("no data returned from the API for the selected filters")]
    NoData,
}
