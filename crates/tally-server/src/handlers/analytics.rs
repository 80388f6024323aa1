//! Analytics handlers: breakdowns, trends and cash flow

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tally_core::analytics::resolve_period;
use tally_core::{
    AnalyticsService, CashFlowProfile, CategoryBreakdownEntry, DateRange, Granularity, TrendPoint,
};

use super::parse_as_of;
use crate::{AppError, AppState, MAX_TREND_PERIODS};

/// Default number of periods in a trend series
const DEFAULT_TREND_PERIODS: u32 = 12;

#[derive(Debug, Deserialize)]
pub struct AnalysisQuery {
    /// Period preset (this-month, last-month, etc)
    pub period: Option<String>,
    /// Custom start date (YYYY-MM-DD)
    pub from: Option<String>,
    /// Custom end date (YYYY-MM-DD)
    pub to: Option<String>,
    /// Compare against the preceding range of equal length
    pub compare: Option<bool>,
    pub as_of: Option<String>,
}

impl AnalysisQuery {
    fn range(&self) -> Result<DateRange, AppError> {
        if self.from.is_some() != self.to.is_some() {
            return Err(AppError::bad_request("from and to must be given together"));
        }
        let today = parse_as_of(self.as_of.as_deref())?;
        Ok(resolve_period(
            self.period.as_deref().unwrap_or("this-month"),
            self.from.as_deref(),
            self.to.as_deref(),
            today,
        )?)
    }
}

/// GET /api/workspaces/:id/analytics/spending - Expense breakdown by category
pub async fn get_spending_analysis(
    State(state): State<Arc<AppState>>,
    Path(workspace_id): Path<i64>,
    Query(params): Query<AnalysisQuery>,
) -> Result<Json<Vec<CategoryBreakdownEntry>>, AppError> {
    let range = params.range()?;
    let service = AnalyticsService::new(state.ledger.as_ref(), &state.analytics);

    let entries = service
        .spending_analysis(workspace_id, range, params.compare.unwrap_or(false))
        .await?;
    Ok(Json(entries))
}

/// GET /api/workspaces/:id/analytics/income - Income breakdown by category
pub async fn get_income_analysis(
    State(state): State<Arc<AppState>>,
    Path(workspace_id): Path<i64>,
    Query(params): Query<AnalysisQuery>,
) -> Result<Json<Vec<CategoryBreakdownEntry>>, AppError> {
    let range = params.range()?;
    let service = AnalyticsService::new(state.ledger.as_ref(), &state.analytics);

    let entries = service
        .income_analysis(workspace_id, range, params.compare.unwrap_or(false))
        .await?;
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    /// month, quarter or year (default: month)
    pub granularity: Option<String>,
    /// Number of periods (default: 12)
    pub count: Option<u32>,
    /// Embed a per-period expense breakdown
    pub detailed: Option<bool>,
    pub as_of: Option<String>,
}

/// GET /api/workspaces/:id/analytics/trends - Trend series
pub async fn get_trends(
    State(state): State<Arc<AppState>>,
    Path(workspace_id): Path<i64>,
    Query(params): Query<TrendsQuery>,
) -> Result<Json<Vec<TrendPoint>>, AppError> {
    let granularity = match params.granularity.as_deref() {
        Some(g) => Granularity::from_str(g)?,
        None => Granularity::Month,
    };
    let count = params.count.unwrap_or(DEFAULT_TREND_PERIODS);
    if count > MAX_TREND_PERIODS {
        return Err(AppError::bad_request(&format!(
            "count cannot exceed {}",
            MAX_TREND_PERIODS
        )));
    }
    let as_of = parse_as_of(params.as_of.as_deref())?;
    let service = AnalyticsService::new(state.ledger.as_ref(), &state.analytics);

    let points = service
        .trends(
            workspace_id,
            granularity,
            count,
            params.detailed.unwrap_or(false),
            as_of,
        )
        .await?;
    Ok(Json(points))
}

#[derive(Debug, Deserialize)]
pub struct CashFlowQuery {
    /// Months to forecast (default from config)
    pub horizon: Option<u32>,
    pub as_of: Option<String>,
}

/// GET /api/workspaces/:id/analytics/cash-flow - Cash-flow profile and forecast
pub async fn get_cash_flow(
    State(state): State<Arc<AppState>>,
    Path(workspace_id): Path<i64>,
    Query(params): Query<CashFlowQuery>,
) -> Result<Json<CashFlowProfile>, AppError> {
    let horizon = params
        .horizon
        .unwrap_or(state.analytics.default_horizon_months);
    let as_of = parse_as_of(params.as_of.as_deref())?;
    let service = AnalyticsService::new(state.ledger.as_ref(), &state.analytics);

    let profile = service.cash_flow(workspace_id, horizon, as_of).await?;
    Ok(Json(profile))
}
