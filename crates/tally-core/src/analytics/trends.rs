//! Trend Series Builder
//!
//! Turns an ordered run of period buckets into a trend series with a running
//! balance and period-over-period growth of net cash flow.

use chrono::FixedOffset;
use rust_decimal::Decimal;
use tracing::debug;

use super::breakdown::breakdown;
use super::bucketer::group_by_period;
use crate::models::{
    DateRange, FlowDirection, Granularity, PeriodBucket, TrendPoint, TransactionRecord,
};

/// Decimal places kept for growth rates
const GROWTH_RATE_DP: u32 = 4;

/// Relative change from `previous` to `current`, or None when `previous` is zero
pub fn growth_rate(previous: Decimal, current: Decimal) -> Option<Decimal> {
    if previous.is_zero() {
        return None;
    }
    Some(((current - previous) / previous.abs()).round_dp(GROWTH_RATE_DP))
}

fn ordered(buckets: &[PeriodBucket]) -> Vec<&PeriodBucket> {
    let mut ordered: Vec<&PeriodBucket> = buckets.iter().collect();
    ordered.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| a.period_key.cmp(&b.period_key))
    });
    ordered
}

/// Build a balance-only trend series
///
/// Yields exactly one point per bucket. `growth_rate` is null for the first
/// point and for any point whose predecessor had zero net.
pub fn build_series(buckets: &[PeriodBucket], opening_balance: Decimal) -> Vec<TrendPoint> {
    let mut balance = opening_balance;
    let mut previous_net: Option<Decimal> = None;

    let points: Vec<TrendPoint> = ordered(buckets)
        .into_iter()
        .map(|bucket| {
            balance += bucket.net;
            let point = TrendPoint {
                period: bucket.period_key.clone(),
                income: bucket.income,
                expenses: bucket.expenses,
                net: bucket.net,
                balance,
                growth_rate: previous_net.and_then(|prev| growth_rate(prev, bucket.net)),
                category_breakdown: None,
            };
            previous_net = Some(bucket.net);
            point
        })
        .collect();

    debug!(points = points.len(), "Built trend series");
    points
}

/// Build a trend series with an expense breakdown embedded in every point
///
/// Each point's breakdown is compared against the previous point's period.
/// `transactions` may cover more than the buckets; extra entries are ignored.
pub fn build_detailed_series(
    buckets: &[PeriodBucket],
    opening_balance: Decimal,
    transactions: &[TransactionRecord],
    granularity: Granularity,
    offset: FixedOffset,
) -> Vec<TrendPoint> {
    let mut points = build_series(buckets, opening_balance);
    let (Some(first), Some(last)) = (
        buckets.iter().map(|b| b.start).min(),
        buckets.iter().map(|b| b.end).max(),
    ) else {
        return points;
    };

    let groups = group_by_period(
        transactions,
        granularity,
        DateRange {
            start: first,
            end: last,
        },
        offset,
    );
    let empty: Vec<TransactionRecord> = Vec::new();

    let mut previous: Option<&[TransactionRecord]> = None;
    for point in points.iter_mut() {
        let current = groups.get(&point.period).unwrap_or(&empty);
        point.category_breakdown = Some(breakdown(current, FlowDirection::Expense, previous));
        previous = Some(current.as_slice());
    }

    points
}
