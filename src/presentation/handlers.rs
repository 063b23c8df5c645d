// HTTP request handlers
use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::application::dashboard_service::DashboardRequest;
use crate::domain::dashboard::{format_percent, FunnelDashboard};
use crate::domain::error::AnalyticsError;
use crate::domain::filters::{FilterSet, RawSelection};
use crate::domain::funnel::Stage;
use crate::presentation::app_state::AppState;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub access_token: Option<String>,
    pub exchange_type: Option<String>,
    pub programmes: Option<String>,
    pub entity_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub stages: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub series: Vec<SeriesResponse>,
    pub funnel: Vec<FunnelStepResponse>,
    pub metrics: MetricsResponse,
}

#[derive(Debug, Serialize)]
pub struct SeriesResponse {
    pub stage: &'static str,
    pub points: Vec<PointResponse>,
}

#[derive(Debug, Serialize)]
pub struct PointResponse {
    pub date: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct FunnelStepResponse {
    pub step: String,
    pub from_count: u64,
    pub to_count: u64,
    pub conversion: String,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub total_applied: u64,
    pub total_approved: u64,
    pub total_realized: u64,
    pub realization_rate: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_body: Option<String>,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Builds the funnel dashboard for the query-string filters.
pub async fn get_dashboard(
    Query(query): Query<DashboardQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let request = match resolve_request(&query) {
        Ok(request) => request,
        Err(err) => return error_response(&err),
    };

    match state.dashboard_service.build_dashboard(&request).await {
        Ok(dashboard) => Json(DashboardResponse::from_dashboard(&dashboard)).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "dashboard build failed");
            error_response(&err)
        }
    }
}

/// The input-collector boundary: nothing past this point runs without a
/// credential and fully validated filters.
fn resolve_request(query: &DashboardQuery) -> Result<DashboardRequest, AnalyticsError> {
    let token = query.access_token.as_deref().unwrap_or("").trim();
    if token.is_empty() {
        return Err(AnalyticsError::Input("access_token is required".into()));
    }

    let filters = FilterSet::resolve(&RawSelection {
        exchange_type: query.exchange_type.as_deref(),
        programmes: query.programmes.as_deref(),
        entity_id: query.entity_id.as_deref(),
        start_date: query.start_date.as_deref(),
        end_date: query.end_date.as_deref(),
    })?;

    let stages = resolve_stages(query.stages.as_deref())?;

    Ok(DashboardRequest {
        token: token.to_string(),
        filters,
        stages,
    })
}

fn resolve_stages(raw: Option<&str>) -> Result<BTreeSet<Stage>, AnalyticsError> {
    let Some(list) = raw else {
        return Ok(Stage::FUNNEL.into_iter().collect());
    };

    let mut stages = BTreeSet::new();
    for label in list.split(',').map(str::trim).filter(|l| !l.is_empty()) {
        let stage = Stage::from_label(label)
            .ok_or_else(|| AnalyticsError::Input(format!("unknown stage {label:?}")))?;
        stages.insert(stage);
    }
    Ok(stages)
}

fn error_response(err: &AnalyticsError) -> Response {
    let (status, upstream_body) = match err {
        AnalyticsError::Input(_) => (StatusCode::BAD_REQUEST, None),
        AnalyticsError::Network(_) => (StatusCode::BAD_GATEWAY, None),
        AnalyticsError::Transport { body, .. } => (StatusCode::BAD_GATEWAY, Some(body.clone())),
        AnalyticsError::Schema { body } => (StatusCode::BAD_GATEWAY, Some(body.clone())),
        AnalyticsError::NoData => (StatusCode::NOT_FOUND, None),
    };

    let payload = ErrorResponse {
        error: err.to_string(),
        upstream_body,
    };
    (status, Json(payload)).into_response()
}

impl DashboardResponse {
    fn from_dashboard(dashboard: &FunnelDashboard) -> Self {
        let series = dashboard
            .series
            .iter()
            .map(|series| SeriesResponse {
                stage: series.stage.label(),
                points: series
                    .points
                    .iter()
                    .map(|point| PointResponse {
                        date: point.date.to_string(),
                        count: point.count,
                    })
                    .collect(),
            })
            .collect();

        let funnel = dashboard
            .steps
            .iter()
            .map(|step| FunnelStepResponse {
                step: format!("{} → {}", step.from.label(), step.to.label()),
                from_count: step.from_total,
                to_count: step.to_total,
                conversion: format_percent(step.conversion_rate),
            })
            .collect();

        let metrics = MetricsResponse {
            total_applied: dashboard.metrics.total_applied,
            total_approved: dashboard.metrics.total_approved,
            total_realized: dashboard.metrics.total_realized,
            realization_rate: format_percent(dashboard.metrics.realization_rate),
        };

        Self {
            series,
            funnel,
            metrics,
        }
    }
}
