//! Overview handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tally_core::{AnalyticsService, WorkspaceOverview};

use super::parse_as_of;
use crate::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    /// Reference date (YYYY-MM-DD), defaults to today
    pub as_of: Option<String>,
}

/// GET /api/health - Liveness probe
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/workspaces/:id/overview - Workspace summary
pub async fn get_overview(
    State(state): State<Arc<AppState>>,
    Path(workspace_id): Path<i64>,
    Query(params): Query<OverviewQuery>,
) -> Result<Json<WorkspaceOverview>, AppError> {
    let as_of = parse_as_of(params.as_of.as_deref())?;
    let service = AnalyticsService::new(state.ledger.as_ref(), &state.analytics);

    let overview = service.overview(workspace_id, as_of).await?;
    Ok(Json(overview))
}
