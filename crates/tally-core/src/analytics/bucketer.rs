//! Period Bucketer
//!
//! Groups ledger entries into calendar periods. Every period in the requested
//! range gets a bucket, including empty ones, so trend series never have gaps.

use std::collections::BTreeMap;

use chrono::{FixedOffset, NaiveDate};
use tracing::debug;

use super::period::{advance, period_end, period_key, period_start};
use crate::error::Result;
use crate::models::{DateRange, Direction, Granularity, PeriodBucket, TransactionRecord};

/// Bucket `transactions` into `granularity` periods covering `range`
///
/// Entries are placed by their local date in `offset`; entries outside the
/// range are dropped. Transfers count towards `transaction_count` only.
/// Output is sorted by period and independent of input order.
pub fn bucketize(
    transactions: &[TransactionRecord],
    granularity: Granularity,
    range: DateRange,
    offset: FixedOffset,
) -> Result<Vec<PeriodBucket>> {
    range.validate()?;

    let mut buckets: BTreeMap<NaiveDate, PeriodBucket> = BTreeMap::new();
    let mut start = period_start(range.start, granularity);
    while start <= range.end {
        let end = period_end(start, granularity)?;
        buckets.insert(
            start,
            PeriodBucket::empty(
                period_key(start, granularity),
                start.max(range.start),
                end.min(range.end),
            ),
        );
        start = advance(start, granularity, 1)?;
    }

    let mut dropped = 0usize;
    for tx in transactions {
        let date = tx.local_date(offset);
        if !range.contains(date) {
            dropped += 1;
            continue;
        }

        let Some(bucket) = buckets.get_mut(&period_start(date, granularity)) else {
            dropped += 1;
            continue;
        };

        bucket.transaction_count += 1;
        match tx.direction {
            Direction::Income => bucket.income += tx.amount,
            Direction::Expense => bucket.expenses += tx.amount,
            Direction::Transfer => {}
        }
    }

    let buckets: Vec<PeriodBucket> = buckets
        .into_values()
        .map(|mut b| {
            b.net = b.income - b.expenses;
            b
        })
        .collect();

    debug!(
        granularity = granularity.as_str(),
        range = %range,
        buckets = buckets.len(),
        dropped,
        "Bucketed transactions"
    );

    Ok(buckets)
}

/// Summarize an arbitrary range as a single bucket keyed by the range itself
pub fn summarize(
    transactions: &[TransactionRecord],
    range: DateRange,
    offset: FixedOffset,
) -> Result<PeriodBucket> {
    range.validate()?;

    let mut bucket = PeriodBucket::empty(range.to_string(), range.start, range.end);
    for tx in in_range(transactions, range, offset) {
        bucket.transaction_count += 1;
        match tx.direction {
            Direction::Income => bucket.income += tx.amount,
            Direction::Expense => bucket.expenses += tx.amount,
            Direction::Transfer => {}
        }
    }
    bucket.net = bucket.income - bucket.expenses;
    Ok(bucket)
}

/// Entries whose local date falls inside `range`
pub fn in_range(
    transactions: &[TransactionRecord],
    range: DateRange,
    offset: FixedOffset,
) -> Vec<TransactionRecord> {
    transactions
        .iter()
        .filter(|tx| range.contains(tx.local_date(offset)))
        .cloned()
        .collect()
}

/// Entries grouped by the start date of the period they fall in
pub fn group_by_period(
    transactions: &[TransactionRecord],
    granularity: Granularity,
    range: DateRange,
    offset: FixedOffset,
) -> BTreeMap<String, Vec<TransactionRecord>> {
    let mut groups: BTreeMap<String, Vec<TransactionRecord>> = BTreeMap::new();
    for tx in transactions {
        let date = tx.local_date(offset);
        if !range.contains(date) {
            continue;
        }
        groups
            .entry(period_key(period_start(date, granularity), granularity))
            .or_default()
            .push(tx.clone());
    }
    groups
}
