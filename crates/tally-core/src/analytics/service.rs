//! Overview aggregator and per-endpoint orchestration
//!
//! The only part of the engine that talks to a [`LedgerSource`]. Reads are
//! issued concurrently and joined before any computation starts; a failed
//! read fails the whole request.

use chrono::{FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::breakdown::breakdown;
use super::bucketer::{bucketize, in_range};
use super::cash_flow::analyze;
use super::forecaster::forecast;
use super::period::{advance, period_start, trailing_range};
use super::trends::{build_detailed_series, build_series};
use crate::config::AnalyticsConfig;
use crate::error::{Error, Result};
use crate::ledger::{LedgerQuery, LedgerSource};
use crate::models::{
    CashFlowProfile, CategoryBreakdownEntry, DateRange, FlowDirection, Granularity, PeriodBucket,
    TransactionRecord, TrendPoint, WorkspaceOverview,
};

/// Percent change from `previous` to `current`, None when `previous` is zero
pub fn percent_change(previous: Decimal, current: Decimal) -> Option<Decimal> {
    if previous.is_zero() {
        return None;
    }
    Some(((current - previous) / previous.abs() * Decimal::ONE_HUNDRED).round_dp(2))
}

/// Net as a percentage of income, 0 when there was no income
pub fn savings_rate(bucket: &PeriodBucket) -> Decimal {
    if bucket.income.is_zero() {
        return Decimal::ZERO;
    }
    (bucket.net / bucket.income * Decimal::ONE_HUNDRED).round_dp(2)
}

fn net_total(transactions: &[TransactionRecord]) -> Decimal {
    transactions.iter().map(|tx| tx.net_contribution()).sum()
}

/// Entries on or before `date` in the workspace timezone
fn on_or_before(
    transactions: Vec<TransactionRecord>,
    date: NaiveDate,
    offset: FixedOffset,
) -> Vec<TransactionRecord> {
    transactions
        .into_iter()
        .filter(|tx| tx.local_date(offset) <= date)
        .collect()
}

/// Analytics over one ledger source
///
/// Cheap to build; construct one per request.
pub struct AnalyticsService<'a> {
    ledger: &'a dyn LedgerSource,
    config: &'a AnalyticsConfig,
}

impl<'a> AnalyticsService<'a> {
    pub fn new(ledger: &'a dyn LedgerSource, config: &'a AnalyticsConfig) -> Self {
        Self { ledger, config }
    }

    /// Top-level summary of a workspace as of `as_of`
    pub async fn overview(&self, workspace_id: i64, as_of: NaiveDate) -> Result<WorkspaceOverview> {
        let through = LedgerQuery::through(as_of)?;
        let (settings, metadata, ledger) = tokio::try_join!(
            self.ledger.workspace_settings(workspace_id),
            self.ledger.workspace_metadata(workspace_id),
            self.ledger.list_transactions(workspace_id, through),
        )?;
        let offset = settings.timezone;
        let transactions = on_or_before(ledger, as_of, offset);

        let this_month = period_start(as_of, Granularity::Month);
        let last_month = advance(this_month, Granularity::Month, -1)?;
        let months = bucketize(
            &transactions,
            Granularity::Month,
            DateRange::new(last_month, as_of)?,
            offset,
        )?;
        let (previous_period, current_period) = match months.as_slice() {
            [previous, current] => (previous.clone(), current.clone()),
            _ => {
                return Err(Error::InvalidRange(format!(
                    "expected two months ending {}",
                    as_of
                )))
            }
        };

        let current_txs = in_range(
            &transactions,
            DateRange::new(current_period.start, current_period.end)?,
            offset,
        );
        let previous_txs = in_range(
            &transactions,
            DateRange::new(previous_period.start, previous_period.end)?,
            offset,
        );
        let mut top_spending = breakdown(
            &current_txs,
            FlowDirection::Expense,
            Some(previous_txs.as_slice()),
        );
        top_spending.truncate(self.config.top_categories);

        let cash_flow = if transactions.is_empty() {
            None
        } else {
            let window = trailing_range(as_of, Granularity::Month, self.config.overview_history_months)?;
            Some(self.profile(
                &transactions,
                window,
                metadata.opening_balance,
                offset,
                self.config.default_horizon_months,
            )?)
        };

        let overview = WorkspaceOverview {
            workspace_id,
            as_of,
            currency: settings.currency,
            net_worth: metadata.opening_balance + net_total(&transactions),
            income_change: percent_change(previous_period.income, current_period.income),
            expense_change: percent_change(previous_period.expenses, current_period.expenses),
            savings_rate: savings_rate(&current_period),
            active_accounts: metadata.active_accounts,
            active_budgets: metadata.active_budgets,
            active_goals: metadata.active_goals,
            transaction_count: transactions.len() as i64,
            top_spending,
            cash_flow,
            current_period,
            previous_period,
        };

        debug!(
            workspace_id,
            transactions = overview.transaction_count,
            "Built workspace overview"
        );
        Ok(overview)
    }

    /// Expense breakdown for `range`, optionally compared with the preceding range
    pub async fn spending_analysis(
        &self,
        workspace_id: i64,
        range: DateRange,
        compare: bool,
    ) -> Result<Vec<CategoryBreakdownEntry>> {
        self.analysis(workspace_id, range, compare, FlowDirection::Expense)
            .await
    }

    /// Income breakdown for `range`, optionally compared with the preceding range
    pub async fn income_analysis(
        &self,
        workspace_id: i64,
        range: DateRange,
        compare: bool,
    ) -> Result<Vec<CategoryBreakdownEntry>> {
        self.analysis(workspace_id, range, compare, FlowDirection::Income)
            .await
    }

    async fn analysis(
        &self,
        workspace_id: i64,
        range: DateRange,
        compare: bool,
        direction: FlowDirection,
    ) -> Result<Vec<CategoryBreakdownEntry>> {
        range.validate()?;
        let current_query = LedgerQuery::covering(range)?;
        let previous_range = if compare {
            Some(range.preceding()?)
        } else {
            None
        };
        let previous_query = previous_range.map(LedgerQuery::covering).transpose()?;

        let previous_read = async {
            match previous_query {
                Some(query) => self
                    .ledger
                    .list_transactions(workspace_id, query)
                    .await
                    .map(Some),
                None => Ok(None),
            }
        };
        let (settings, current, previous) = tokio::try_join!(
            self.ledger.workspace_settings(workspace_id),
            self.ledger.list_transactions(workspace_id, current_query),
            previous_read,
        )?;

        let offset = settings.timezone;
        let current = in_range(&current, range, offset);
        let previous = previous
            .zip(previous_range)
            .map(|(txs, previous_range)| in_range(&txs, previous_range, offset));

        let entries = breakdown(&current, direction, previous.as_deref());
        debug!(
            workspace_id,
            direction = direction.as_str(),
            range = %range,
            categories = entries.len(),
            "Computed breakdown"
        );
        Ok(entries)
    }

    /// The trailing `count` periods ending at `as_of`'s period
    pub async fn trends(
        &self,
        workspace_id: i64,
        granularity: Granularity,
        count: u32,
        detailed: bool,
        as_of: NaiveDate,
    ) -> Result<Vec<TrendPoint>> {
        let window = trailing_range(as_of, granularity, count)?;
        let through = LedgerQuery::through(as_of)?;
        let (settings, metadata, ledger) = tokio::try_join!(
            self.ledger.workspace_settings(workspace_id),
            self.ledger.workspace_metadata(workspace_id),
            self.ledger.list_transactions(workspace_id, through),
        )?;
        let offset = settings.timezone;
        let transactions = on_or_before(ledger, as_of, offset);

        let opening = metadata.opening_balance + net_before(&transactions, window.start, offset);
        let buckets = bucketize(&transactions, granularity, window, offset)?;

        let points = if detailed {
            build_detailed_series(&buckets, opening, &transactions, granularity, offset)
        } else {
            build_series(&buckets, opening)
        };
        Ok(points)
    }

    /// Cash-flow profile with `horizon` months of predictions
    pub async fn cash_flow(
        &self,
        workspace_id: i64,
        horizon: u32,
        as_of: NaiveDate,
    ) -> Result<CashFlowProfile> {
        if horizon > self.config.max_horizon_months {
            return Err(Error::InvalidRange(format!(
                "horizon {} exceeds the maximum of {} months",
                horizon, self.config.max_horizon_months
            )));
        }

        let window = trailing_range(as_of, Granularity::Month, self.config.cash_flow_history_months)?;
        let through = LedgerQuery::through(as_of)?;
        let (settings, metadata, ledger) = tokio::try_join!(
            self.ledger.workspace_settings(workspace_id),
            self.ledger.workspace_metadata(workspace_id),
            self.ledger.list_transactions(workspace_id, through),
        )?;
        let offset = settings.timezone;
        let transactions = on_or_before(ledger, as_of, offset);

        self.profile(&transactions, window, metadata.opening_balance, offset, horizon)
    }

    /// Monthly series over `window`, analyzed and forecast
    ///
    /// A forecast that cannot be made leaves the prediction list empty.
    fn profile(
        &self,
        transactions: &[TransactionRecord],
        window: DateRange,
        opening_balance: Decimal,
        offset: FixedOffset,
        horizon: u32,
    ) -> Result<CashFlowProfile> {
        let opening = opening_balance + net_before(transactions, window.start, offset);
        let buckets = bucketize(transactions, Granularity::Month, window, offset)?;
        let points = build_series(&buckets, opening);

        let mut profile = analyze(&points, self.config)?;
        profile.predictions = match forecast(&points, horizon, self.config) {
            Ok(predictions) => predictions,
            Err(Error::InsufficientData(reason)) => {
                warn!(reason = %reason, "Forecast unavailable");
                vec![]
            }
            Err(e) => return Err(e),
        };
        Ok(profile)
    }
}

/// Net of all entries dated before `start`
fn net_before(transactions: &[TransactionRecord], start: NaiveDate, offset: FixedOffset) -> Decimal {
    transactions
        .iter()
        .filter(|tx| tx.local_date(offset) < start)
        .map(|tx| tx.net_contribution())
        .sum()
}
