//! Calendar period arithmetic shared by the bucketer and the service layer

use chrono::{Datelike, Months, NaiveDate};

use crate::error::{Error, Result};
use crate::models::{DateRange, Granularity};

/// Named reporting periods accepted by the CLI and the API
pub const PERIOD_PRESETS: &[&str] = &[
    "this-month",
    "last-month",
    "this-quarter",
    "this-year",
    "last-year",
    "last-30-days",
    "last-90-days",
    "last-12-months",
];

/// First day of the period containing `date`
pub fn period_start(date: NaiveDate, granularity: Granularity) -> NaiveDate {
    let month = match granularity {
        Granularity::Month => date.month(),
        Granularity::Quarter => ((date.month() - 1) / 3) * 3 + 1,
        Granularity::Year => 1,
    };
    // Day 1 of an existing month in the same year always exists
    NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
}

/// Move a period start forward (or backward, for negative `n`) by `n` periods
pub fn advance(start: NaiveDate, granularity: Granularity, n: i32) -> Result<NaiveDate> {
    let out_of_range = || Error::InvalidRange(format!("date out of range near {}", start));
    let months = granularity
        .months()
        .checked_mul(n.unsigned_abs())
        .map(Months::new)
        .ok_or_else(out_of_range)?;
    let moved = if n >= 0 {
        start.checked_add_months(months)
    } else {
        start.checked_sub_months(months)
    };
    moved.ok_or_else(out_of_range)
}

/// Last day of the period starting at `start`
pub fn period_end(start: NaiveDate, granularity: Granularity) -> Result<NaiveDate> {
    advance(start, granularity, 1)?
        .pred_opt()
        .ok_or_else(|| Error::InvalidRange(format!("date out of range near {}", start)))
}

/// Stable string key for the period starting at `start`
pub fn period_key(start: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Month => start.format("%Y-%m").to_string(),
        Granularity::Quarter => format!("{}-Q{}", start.year(), (start.month() - 1) / 3 + 1),
        Granularity::Year => start.year().to_string(),
    }
}

/// Parse a month key (`YYYY-MM`) back into the first day of that month
pub fn parse_month_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", key), "%Y-%m-%d").ok()
}

/// The `count` most recent periods ending at `as_of` (inclusive of the partial current one)
pub fn trailing_range(as_of: NaiveDate, granularity: Granularity, count: u32) -> Result<DateRange> {
    if count == 0 {
        return Err(Error::InvalidRange("period count must be at least 1".into()));
    }
    let back = i32::try_from(count - 1)
        .map_err(|_| Error::InvalidRange(format!("period count {} is too large", count)))?;
    let current = period_start(as_of, granularity);
    let first = advance(current, granularity, -back)?;
    DateRange::new(first, as_of)
}

/// The `days` days before `today` through `today`
fn trailing_days(today: NaiveDate, days: i64) -> Result<DateRange> {
    let start = today
        .checked_sub_signed(chrono::Duration::days(days))
        .ok_or_else(|| Error::InvalidRange(format!("no {}-day window ends {}", days, today)))?;
    DateRange::new(start, today)
}

/// Resolve a named preset relative to `today`
pub fn resolve_preset(preset: &str, today: NaiveDate) -> Result<DateRange> {
    let range = match preset.to_lowercase().as_str() {
        "this-month" => DateRange {
            start: period_start(today, Granularity::Month),
            end: today,
        },
        "last-month" => {
            let this_month = period_start(today, Granularity::Month);
            let start = advance(this_month, Granularity::Month, -1)?;
            DateRange {
                start,
                end: period_end(start, Granularity::Month)?,
            }
        }
        "this-quarter" => DateRange {
            start: period_start(today, Granularity::Quarter),
            end: today,
        },
        "this-year" => DateRange {
            start: period_start(today, Granularity::Year),
            end: today,
        },
        "last-year" => {
            let start = advance(period_start(today, Granularity::Year), Granularity::Year, -1)?;
            DateRange {
                start,
                end: period_end(start, Granularity::Year)?,
            }
        }
        "last-30-days" => trailing_days(today, 30)?,
        "last-90-days" => trailing_days(today, 90)?,
        "last-12-months" => trailing_range(today, Granularity::Month, 12)?,
        _ => {
            return Err(Error::InvalidData(format!(
                "Unknown period: {}. Available: {}",
                preset,
                PERIOD_PRESETS.join(", ")
            )))
        }
    };
    Ok(range)
}

/// Resolve either an explicit `from`/`to` pair (YYYY-MM-DD) or a named preset
pub fn resolve_period(
    preset: &str,
    custom_from: Option<&str>,
    custom_to: Option<&str>,
    today: NaiveDate,
) -> Result<DateRange> {
    if let (Some(from), Some(to)) = (custom_from, custom_to) {
        let start = NaiveDate::parse_from_str(from, "%Y-%m-%d").map_err(|_| {
            Error::InvalidData("Invalid from date format (use YYYY-MM-DD)".to_string())
        })?;
        let end = NaiveDate::parse_from_str(to, "%Y-%m-%d").map_err(|_| {
            Error::InvalidData("Invalid to date format (use YYYY-MM-DD)".to_string())
        })?;
        return DateRange::new(start, end);
    }

    resolve_preset(preset, today)
}
