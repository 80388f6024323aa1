//! Test utilities for tally-core
//!
//! Fixture builders for ledger entries and buckets, plus an in-memory
//! [`LedgerSource`] that can be told to fail.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;

use crate::analytics::period::{parse_month_key, period_end};
use crate::error::{Error, Result};
use crate::ledger::{LedgerQuery, LedgerSource};
use crate::models::{
    Direction, Granularity, PeriodBucket, TransactionRecord, WorkspaceMetadata, WorkspaceSettings,
};

static NEXT_ID: AtomicI64 = AtomicI64::new(1);

/// Calendar date shorthand; panics on an invalid date
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date")
}

/// Income entry at an exact RFC 3339 instant
pub fn tx_at(rfc3339: &str, amount: Decimal) -> TransactionRecord {
    let at = DateTime::parse_from_rfc3339(rfc3339)
        .expect("valid fixture timestamp")
        .with_timezone(&Utc);
    TxBuilder::income(amount).at(at).build()
}

/// Bucket for month `key` with the given net (income when positive, expenses when negative)
pub fn bucket_with_net(key: &str, net: Decimal) -> PeriodBucket {
    let start = parse_month_key(key).expect("month key fixture");
    let end = period_end(start, Granularity::Month).expect("fixture period end");
    let (income, expenses) = if net.is_sign_negative() {
        (Decimal::ZERO, -net)
    } else {
        (net, Decimal::ZERO)
    };
    PeriodBucket {
        period_key: key.to_string(),
        start,
        end,
        income,
        expenses,
        net,
        transaction_count: 1,
    }
}

/// Builder for [`TransactionRecord`] fixtures
///
/// Defaults: workspace 1, account 1, USD, 2024-01-15 12:00 UTC, no category.
pub struct TxBuilder {
    record: TransactionRecord,
}

impl TxBuilder {
    fn new(amount: Decimal, direction: Direction) -> Self {
        Self {
            record: TransactionRecord {
                id: NEXT_ID.fetch_add(1, Ordering::SeqCst),
                workspace_id: 1,
                account_id: 1,
                amount,
                direction,
                category: None,
                occurred_at: noon_utc(date(2024, 1, 15)),
                currency: "USD".to_string(),
            },
        }
    }

    pub fn income(amount: Decimal) -> Self {
        Self::new(amount, Direction::Income)
    }

    pub fn expense(amount: Decimal) -> Self {
        Self::new(amount, Direction::Expense)
    }

    pub fn transfer(amount: Decimal) -> Self {
        Self::new(amount, Direction::Transfer)
    }

    /// Noon UTC on the given date
    pub fn on(self, year: i32, month: u32, day: u32) -> Self {
        self.at(noon_utc(date(year, month, day)))
    }

    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.record.occurred_at = at;
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.record.category = Some(category.to_string());
        self
    }

    pub fn account(mut self, account_id: i64) -> Self {
        self.record.account_id = account_id;
        self
    }

    pub fn workspace(mut self, workspace_id: i64) -> Self {
        self.record.workspace_id = workspace_id;
        self
    }

    pub fn build(self) -> TransactionRecord {
        self.record
    }
}

fn noon_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::from_hms_opt(12, 0, 0).expect("noon"))
        .and_utc()
}

/// Which read a [`StaticLedger`] should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailingRead {
    Transactions,
    Settings,
    Metadata,
}

/// In-memory ledger holding fixed data for any number of workspaces
#[derive(Default)]
pub struct StaticLedger {
    pub transactions: Vec<TransactionRecord>,
    pub settings: WorkspaceSettings,
    pub metadata: WorkspaceMetadata,
    pub fail: Option<FailingRead>,
}

impl StaticLedger {
    pub fn new(transactions: Vec<TransactionRecord>) -> Self {
        Self {
            transactions,
            ..Self::default()
        }
    }

    pub fn with_settings(mut self, settings: WorkspaceSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_metadata(mut self, metadata: WorkspaceMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn failing(mut self, read: FailingRead) -> Self {
        self.fail = Some(read);
        self
    }

    fn check(&self, read: FailingRead) -> Result<()> {
        if self.fail == Some(read) {
            return Err(Error::UpstreamRead(format!("{:?} read failed", read)));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerSource for StaticLedger {
    async fn list_transactions(
        &self,
        workspace_id: i64,
        query: LedgerQuery,
    ) -> Result<Vec<TransactionRecord>> {
        self.check(FailingRead::Transactions)?;
        Ok(self
            .transactions
            .iter()
            .filter(|tx| tx.workspace_id == workspace_id && query.contains(tx.occurred_at))
            .cloned()
            .collect())
    }

    async fn workspace_settings(&self, _workspace_id: i64) -> Result<WorkspaceSettings> {
        self.check(FailingRead::Settings)?;
        Ok(self.settings.clone())
    }

    async fn workspace_metadata(&self, _workspace_id: i64) -> Result<WorkspaceMetadata> {
        self.check(FailingRead::Metadata)?;
        Ok(self.metadata.clone())
    }
}
