//! HTTP surface
//!
//! Tracking endpoints called by rendered pages, metrics endpoints for the
//! dashboard, the two scheduled jobs, and SEO render/invalidate helpers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::links::{SeoRenderer, SourcePage};
use crate::seo::{SeoContext, SeoTemplates};
use crate::tracking::{LinkClickEvent, LinkImpressionEvent, LinkTrackingService};

#[derive(Clone)]
pub struct AppState {
    pub renderer: SeoRenderer,
    pub tracking: LinkTrackingService,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        let body = json!({
            "error": status.canonical_reason().unwrap_or("Error"),
            "details": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/track-click", post(track_click))
        .route("/track-impression", post(track_impression))
        .route("/metrics/report", get(performance_report))
        .route("/metrics/{link_type}", get(metrics_by_link_type))
        .route("/aggregate", post(aggregate))
        .route("/cleanup", post(cleanup))
        .route("/seo/render", post(render_seo))
        .route("/seo/cache/{pg_id}", delete(invalidate_seo_cache))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let listener = TcpListener::bind(addr).await?;
    info!("SEO engine listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl WindowQuery {
    fn resolve(&self) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
        Ok((
            parse_date(self.start_date.as_deref(), false)?,
            parse_date(self.end_date.as_deref(), true)?,
        ))
    }
}

/// RFC 3339 timestamp or plain `YYYY-MM-DD`. A plain end date covers the whole day.
fn parse_date(value: Option<&str>, end_of_day: bool) -> Result<Option<DateTime<Utc>>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(ts.with_timezone(&Utc)));
    }
    let day = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| Error::InvalidInput(format!("invalid date: {value}")))?;
    let time = if end_of_day {
        day.and_hms_opt(23, 59, 59)
    } else {
        day.and_hms_opt(0, 0, 0)
    };
    Ok(time.map(|t| t.and_utc()))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn track_click(
    State(state): State<AppState>,
    Json(event): Json<LinkClickEvent>,
) -> Json<serde_json::Value> {
    let success = state.tracking.track_click(event).await;
    Json(json!({ "success": success }))
}

async fn track_impression(
    State(state): State<AppState>,
    Json(event): Json<LinkImpressionEvent>,
) -> Json<serde_json::Value> {
    let success = state.tracking.track_impression(event).await;
    Json(json!({ "success": success }))
}

async fn metrics_by_link_type(
    State(state): State<AppState>,
    Path(link_type): Path<String>,
    Query(query): Query<WindowQuery>,
) -> Result<impl IntoResponse> {
    let (start, end) = query.resolve()?;
    let metrics = state
        .tracking
        .get_metrics_by_link_type(&link_type, start, end)
        .await
        .ok_or_else(|| Error::InvalidInput("invalid metrics window".to_string()))?;
    Ok(Json(metrics))
}

async fn performance_report(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Result<impl IntoResponse> {
    let (start, end) = query.resolve()?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(Error::InvalidInput("startDate is after endDate".to_string()));
        }
    }
    Ok(Json(state.tracking.get_performance_report(start, end).await?))
}

async fn aggregate(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.tracking.aggregate_daily_metrics().await;
    let status = if report.success {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupQuery {
    pub days_to_keep: Option<i64>,
}

async fn cleanup(
    State(state): State<AppState>,
    Query(query): Query<CleanupQuery>,
) -> Result<impl IntoResponse> {
    let days = query
        .days_to_keep
        .unwrap_or(state.tracking.config().retention_days);
    let report = state.tracking.cleanup_old_data(days).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    /// Looked up by `context.pg_id` when absent
    #[serde(default)]
    pub templates: Option<SeoTemplates>,
    pub context: SeoContext,
    #[serde(default)]
    pub source: SourcePage,
}

async fn render_seo(
    State(state): State<AppState>,
    Json(request): Json<RenderRequest>,
) -> impl IntoResponse {
    let rendered = match &request.templates {
        Some(templates) => {
            state
                .renderer
                .render(templates, &request.context, &request.source)
                .await
        }
        None => {
            state
                .renderer
                .render_for_family(&request.context, &request.source)
                .await
        }
    };
    Json(rendered)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidateQuery {
    pub type_id: Option<i64>,
}

async fn invalidate_seo_cache(
    State(state): State<AppState>,
    Path(pg_id): Path<i64>,
    Query(query): Query<InvalidateQuery>,
) -> Result<impl IntoResponse> {
    let deleted = state
        .renderer
        .processor()
        .invalidate_cache(pg_id, query.type_id)
        .await?;
    Ok(Json(json!({ "deleted": deleted })))
}
