//! Tally Core Library
//!
//! Financial analytics for the Tally finance tracker:
//! - Value objects for ledger entries, buckets, trends and forecasts
//! - Pure analytics engine (bucketing, breakdowns, trends, volatility, forecasts)
//! - Workspace overview and per-endpoint orchestration over a ledger source
//! - SQLite ledger store with migrations
//! - CSV ledger import
//! - Tunable analytics configuration

pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod ledger;
pub mod models;

/// Test utilities including an in-memory ledger and fixture builders
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use analytics::AnalyticsService;
pub use config::AnalyticsConfig;
pub use db::Database;
pub use error::{Error, Result};
pub use import::{import_csv, parse_ledger_csv, ImportSummary, SkippedRow};
pub use ledger::{LedgerQuery, LedgerSource};
pub use models::{
    Account, Budget, CashFlowProfile, CategoryBreakdownEntry, DateRange, Direction, FlowDirection,
    Granularity, MonthlyPrediction, PeriodBucket, SavingsGoal, TransactionRecord, TrendDirection,
    TrendPoint, Workspace, WorkspaceMetadata, WorkspaceOverview, WorkspaceSettings,
};
