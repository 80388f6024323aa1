//! Read-side collaborator interface
//!
//! The engine never talks to storage directly. Everything it needs comes
//! through a [`LedgerSource`]: transactions, workspace settings and
//! workspace metadata. Implementations own retries, pooling and timeouts.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::{Error, Result};
use crate::models::{DateRange, TransactionRecord, WorkspaceMetadata, WorkspaceSettings};

/// UTC window of a ledger read, `[from, until)`
///
/// Windows built from local dates are widened by a day on each side so that
/// a read can be issued before the workspace timezone is known. Callers
/// narrow the result with their own local-date filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerQuery {
    /// None reads from the beginning of the ledger
    pub from: Option<DateTime<Utc>>,
    pub until: DateTime<Utc>,
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Shift `date`'s midnight by `days`, failing at the edges of the calendar
fn shifted_midnight(date: NaiveDate, days: i64) -> Result<DateTime<Utc>> {
    midnight_utc(date)
        .checked_add_signed(Duration::days(days))
        .ok_or_else(|| Error::InvalidRange(format!("date {} is out of range", date)))
}

impl LedgerQuery {
    /// Every entry that could fall on a local date inside `range`
    pub fn covering(range: DateRange) -> Result<Self> {
        Ok(Self {
            from: Some(shifted_midnight(range.start, -1)?),
            until: shifted_midnight(range.end, 2)?,
        })
    }

    /// Every entry that could fall on or before the local date `date`
    pub fn through(date: NaiveDate) -> Result<Self> {
        Ok(Self {
            from: None,
            until: shifted_midnight(date, 2)?,
        })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && at < self.until
    }
}

/// Source of ledger and workspace data for one tenant at a time
///
/// Failures should surface as `Error::UpstreamRead` (or `Error::NotFound`
/// for an unknown workspace).
#[async_trait]
pub trait LedgerSource: Send + Sync {
    /// Transactions of `workspace_id` with `occurred_at` inside `query`
    async fn list_transactions(
        &self,
        workspace_id: i64,
        query: LedgerQuery,
    ) -> Result<Vec<TransactionRecord>>;

    /// Currency and timezone used for bucketing
    async fn workspace_settings(&self, workspace_id: i64) -> Result<WorkspaceSettings>;

    /// Active account/budget/goal counts and the opening balance
    async fn workspace_metadata(&self, workspace_id: i64) -> Result<WorkspaceMetadata>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::date;

    #[test]
    fn test_covering_widens_by_a_day() {
        let range = DateRange::new(date(2024, 3, 1), date(2024, 3, 31)).unwrap();
        let query = LedgerQuery::covering(range).unwrap();

        assert!(query.contains("2024-02-29T12:00:00Z".parse().unwrap()));
        assert!(query.contains("2024-04-01T13:59:00Z".parse().unwrap()));
        assert!(!query.contains("2024-04-02T00:00:00Z".parse().unwrap()));
        assert!(!query.contains("2024-02-28T23:59:59Z".parse().unwrap()));
    }

    #[test]
    fn test_through_is_open_ended() {
        let query = LedgerQuery::through(date(2024, 3, 31)).unwrap();
        assert!(query.from.is_none());
        assert!(query.contains("1999-01-01T00:00:00Z".parse().unwrap()));
        assert!(!query.contains("2024-04-05T00:00:00Z".parse().unwrap()));
    }

    #[test]
    fn test_windows_at_calendar_edges_are_invalid() {
        let last = NaiveDate::MAX;
        let first = NaiveDate::MIN;

        assert!(matches!(
            LedgerQuery::through(last),
            Err(Error::InvalidRange(_))
        ));
        let tail = DateRange::new(last, last).unwrap();
        assert!(matches!(
            LedgerQuery::covering(tail),
            Err(Error::InvalidRange(_))
        ));
        let head = DateRange::new(first, first).unwrap();
        assert!(matches!(
            LedgerQuery::covering(head),
            Err(Error::InvalidRange(_))
        ));
    }
}
