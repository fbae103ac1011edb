//! Insight API routes
//!
//! The caller supplies a previously-issued user identifier; its format is
//! not validated beyond UUID parsing. Missing data yields a sparse
//! successful response, never an error.

use crate::error::ApiError;
use crate::services::{InsightsService, MetricsService};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use uuid::Uuid;
use vitalsync_shared::types::{DailyTrendResponse, InsightsResponse, MetricCategory};

/// Create insight routes
pub fn insights_routes() -> Router<AppState> {
    Router::new()
        .route("/:user_id", get(get_insights))
        .route("/:user_id/trends/:category", get(get_daily_trends))
}

/// GET /api/v1/insights/{user_id} - Derive the full insight bundle
async fn get_insights(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<InsightsResponse>, ApiError> {
    let insights =
        InsightsService::get_insights(state.db(), &state.config().insights, user_id).await?;

    Ok(Json(InsightsResponse {
        success: true,
        insights,
    }))
}

/// GET /api/v1/insights/{user_id}/trends/{category} - Day-bucketed averages
async fn get_daily_trends(
    State(state): State<AppState>,
    Path((user_id, category)): Path<(Uuid, String)>,
) -> Result<Json<DailyTrendResponse>, ApiError> {
    let category: MetricCategory = category.parse().map_err(ApiError::BadRequest)?;

    let days = MetricsService::get_daily_trends(state.db(), user_id, category).await?;

    Ok(Json(DailyTrendResponse {
        success: true,
        category,
        days,
    }))
}
