//! Metric ingestion API routes
//!
//! Direct create/read glue: devices push snapshots, clients read recent
//! history. All derived computation lives behind the insights routes.

use crate::error::ApiError;
use crate::services::metrics::LogSnapshotInput;
use crate::services::MetricsService;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use vitalsync_shared::types::{
    LogMetricRequest, MetricCategory, MetricHistoryQuery, MetricHistoryResponse,
    MetricSnapshotResponse,
};

/// Create metric ingestion routes
pub fn metrics_routes() -> Router<AppState> {
    Router::new().route("/:user_id/:category", post(log_metric).get(get_history))
}

fn parse_category(category: &str) -> Result<MetricCategory, ApiError> {
    category.parse().map_err(ApiError::BadRequest)
}

fn to_response(
    snapshot: crate::repositories::MetricSnapshot,
    category: MetricCategory,
) -> MetricSnapshotResponse {
    MetricSnapshotResponse {
        id: snapshot.id.to_string(),
        category,
        device: snapshot.device,
        recorded_at: snapshot.recorded_at,
        fields: snapshot.fields,
    }
}

/// POST /api/v1/metrics/{user_id}/{category} - Store a pushed snapshot
async fn log_metric(
    State(state): State<AppState>,
    Path((user_id, category)): Path<(Uuid, String)>,
    Json(req): Json<LogMetricRequest>,
) -> Result<Json<MetricSnapshotResponse>, ApiError> {
    let category = parse_category(&category)?;

    let input = LogSnapshotInput {
        device: req.device,
        recorded_at: req.recorded_at,
        fields: req.fields,
    };

    let snapshot = MetricsService::log_snapshot(state.db(), user_id, category, input).await?;

    Ok(Json(to_response(snapshot, category)))
}

/// GET /api/v1/metrics/{user_id}/{category} - Recent snapshots
async fn get_history(
    State(state): State<AppState>,
    Path((user_id, category)): Path<(Uuid, String)>,
    Query(query): Query<MetricHistoryQuery>,
) -> Result<Json<MetricHistoryResponse>, ApiError> {
    let category = parse_category(&category)?;

    let snapshots =
        MetricsService::get_history(state.db(), user_id, category, query.days_clamped()).await?;

    let items: Vec<MetricSnapshotResponse> = snapshots
        .into_iter()
        .map(|s| to_response(s, category))
        .collect();

    Ok(Json(MetricHistoryResponse {
        success: true,
        category,
        count: items.len(),
        items,
    }))
}
