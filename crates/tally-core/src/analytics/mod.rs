//! Analytics Engine
//!
//! Turns raw ledger entries into the aggregates the dashboard shows. Every
//! component except the service is a pure function over explicit inputs.
//!
//! ## Components
//!
//! - **Period Bucketer** - Groups entries into month/quarter/year buckets
//! - **Breakdown Calculator** - Per-category totals, shares and deltas
//! - **Trend Series Builder** - Running balance and growth per period
//! - **Cash-Flow Analyzer** - Monthly average, trend direction, volatility
//! - **Forecaster** - Linear net cash-flow predictions with decaying confidence
//! - **Analytics Service** - Reads from a [`LedgerSource`](crate::LedgerSource)
//!   and assembles the views above
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_core::analytics::AnalyticsService;
//!
//! let service = AnalyticsService::new(&db, &config);
//! let overview = service.overview(workspace_id, today).await?;
//! ```

pub mod breakdown;
pub mod bucketer;
pub mod cash_flow;
pub mod forecaster;
pub mod period;
pub mod service;
pub mod trends;

pub use breakdown::{breakdown, breakdown_total};
pub use bucketer::{bucketize, group_by_period, in_range, summarize};
pub use cash_flow::{analyze, trend_direction, volatility_score};
pub use forecaster::forecast;
pub use period::{resolve_period, resolve_preset, trailing_range, PERIOD_PRESETS};
pub use service::{percent_change, savings_rate, AnalyticsService};
pub use trends::{build_detailed_series, build_series, growth_rate};
