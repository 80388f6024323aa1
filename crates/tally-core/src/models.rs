//! Domain models for Tally
//!
//! Everything the engine computes is a value object: built fresh from the
//! ledger on each call, never mutated in place.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Category name that transactions without a category collapse into
pub const UNCATEGORIZED: &str = "uncategorized";

/// Direction of money movement for a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Income,
    Expense,
    /// Movement between the workspace's own accounts
    Transfer,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" | "credit" => Ok(Self::Income),
            "expense" | "debit" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The side of the ledger a category breakdown is computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    Income,
    Expense,
}

impl FlowDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Whether a ledger entry belongs to this side
    pub fn matches(&self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (Self::Income, Direction::Income) | (Self::Expense, Direction::Expense)
        )
    }
}

/// A ledger entry as supplied by the storage collaborator
///
/// `amount` is never negative; its meaning comes from `direction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub workspace_id: i64,
    pub account_id: i64,
    pub amount: Decimal,
    pub direction: Direction,
    pub category: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub currency: String,
}

impl TransactionRecord {
    /// Contribution of this entry to net cash flow (transfers contribute nothing)
    pub fn net_contribution(&self) -> Decimal {
        match self.direction {
            Direction::Income => self.amount,
            Direction::Expense => -self.amount,
            Direction::Transfer => Decimal::ZERO,
        }
    }

    /// Calendar date of the entry in the given timezone
    pub fn local_date(&self, offset: FixedOffset) -> NaiveDate {
        self.occurred_at.with_timezone(&offset).date_naive()
    }

    /// Category name with missing or blank categories mapped to `uncategorized`
    pub fn category_or_default(&self) -> &str {
        match self.category.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c,
            _ => UNCATEGORIZED,
        }
    }
}

/// Calendar period size used for bucketing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Month,
    Quarter,
    Year,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
        }
    }

    /// Number of calendar months in one period
    pub fn months(&self) -> u32 {
        match self {
            Self::Month => 1,
            Self::Quarter => 3,
            Self::Year => 12,
        }
    }
}

impl std::str::FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "month" | "monthly" => Ok(Self::Month),
            "quarter" | "quarterly" => Ok(Self::Quarter),
            "year" | "yearly" | "annual" => Ok(Self::Year),
            _ => Err(Error::UnsupportedGranularity(s.to_string())),
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inclusive range of calendar dates in the workspace timezone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, failing if `start` is after `end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(Error::InvalidRange(format!(
                "start {} is after end {}",
                self.start, self.end
            )));
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of days covered, counting both ends
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// The range of equal length ending the day before this one starts
    pub fn preceding(&self) -> Result<Self> {
        let out_of_range =
            || Error::InvalidRange(format!("no range precedes {}", self));
        let end = self.start.pred_opt().ok_or_else(out_of_range)?;
        let start = end
            .checked_sub_signed(chrono::Duration::days(self.days() - 1))
            .ok_or_else(out_of_range)?;
        Ok(Self { start, end })
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Aggregated totals for one calendar period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodBucket {
    pub period_key: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub income: Decimal,
    pub expenses: Decimal,
    pub net: Decimal,
    pub transaction_count: i64,
}

impl PeriodBucket {
    /// An empty bucket (no transactions in the period)
    pub fn empty(period_key: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            period_key: period_key.into(),
            start,
            end,
            income: Decimal::ZERO,
            expenses: Decimal::ZERO,
            net: Decimal::ZERO,
            transaction_count: 0,
        }
    }
}

/// One category's share of income or spending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdownEntry {
    pub category: String,
    pub amount: Decimal,
    /// Share of the in-scope total, 0..100, rounded to 2 decimal places
    pub percentage: Decimal,
    pub transaction_count: i64,
    /// Amount minus the previous period's amount for the same category
    pub change_from_previous: Option<Decimal>,
}

/// One point of a trend series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub period: String,
    pub income: Decimal,
    pub expenses: Decimal,
    pub net: Decimal,
    /// Running balance including this point's net
    pub balance: Decimal,
    /// Relative change of net vs. the previous point; null when undefined
    pub growth_rate: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_breakdown: Option<Vec<CategoryBreakdownEntry>>,
}

/// Direction of a net cash-flow trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Stable => "stable",
        }
    }
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A forecast for one future month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPrediction {
    pub period: String,
    pub predicted_income: Decimal,
    pub predicted_expenses: Decimal,
    pub predicted_net: Decimal,
    /// 0..100, non-increasing with horizon
    pub confidence: Decimal,
}

/// Cash-flow statistics over a trend series plus forward predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowProfile {
    pub monthly_average: Decimal,
    pub trend_direction: TrendDirection,
    /// 0..1, higher means noisier net cash flow
    pub volatility_score: Decimal,
    pub predictions: Vec<MonthlyPrediction>,
    /// Set when the series was too short to classify a trend
    pub low_confidence: bool,
}

/// Per-workspace presentation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    pub currency: String,
    #[serde(with = "utc_offset")]
    pub timezone: FixedOffset,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            timezone: utc(),
        }
    }
}

/// Counts and balances the storage collaborator tracks per workspace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceMetadata {
    pub active_accounts: i64,
    pub active_budgets: i64,
    pub active_goals: i64,
    /// Sum of the active accounts' opening balances
    pub opening_balance: Decimal,
}

/// Top-level workspace summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceOverview {
    pub workspace_id: i64,
    pub as_of: NaiveDate,
    pub currency: String,
    pub net_worth: Decimal,
    pub current_period: PeriodBucket,
    pub previous_period: PeriodBucket,
    /// Percent change of income vs. the previous month
    pub income_change: Option<Decimal>,
    /// Percent change of expenses vs. the previous month
    pub expense_change: Option<Decimal>,
    pub savings_rate: Decimal,
    pub active_accounts: i64,
    pub active_budgets: i64,
    pub active_goals: i64,
    pub transaction_count: i64,
    pub top_spending: Vec<CategoryBreakdownEntry>,
    pub cash_flow: Option<CashFlowProfile>,
}

// ========== Storage Models ==========

/// A tenant workspace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: i64,
    pub name: String,
    pub settings: WorkspaceSettings,
    pub created_at: DateTime<Utc>,
}

/// An account inside a workspace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub workspace_id: i64,
    pub name: String,
    pub opening_balance: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A spending limit for one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub workspace_id: i64,
    pub category: String,
    pub amount: Decimal,
    pub period: Granularity,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A savings target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsGoal {
    pub id: i64,
    pub workspace_id: i64,
    pub name: String,
    pub target_amount: Decimal,
    pub target_date: Option<NaiveDate>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A transaction to be written to the store (before DB insertion)
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: i64,
    pub amount: Decimal,
    pub direction: Direction,
    pub category: Option<String>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    /// Hash for deduplication
    pub import_hash: String,
}

/// UTC offset as used for workspace timezones
pub fn utc() -> FixedOffset {
    Utc.fix()
}

/// Parse a fixed UTC offset: `UTC`, `Z`, `+HH:MM`, `-HH:MM` or `+HHMM`
pub fn parse_utc_offset(s: &str) -> Result<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("utc") || s == "Z" {
        return Ok(utc());
    }

    let invalid = || Error::InvalidData(format!("Invalid UTC offset: {} (use +HH:MM)", s));

    let (sign, rest) = match s.chars().next() {
        Some('+') => (1, &s[1..]),
        Some('-') => (-1, &s[1..]),
        _ => return Err(invalid()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Format an offset the way `parse_utc_offset` reads it
pub fn format_utc_offset(offset: FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    if secs == 0 {
        return "UTC".to_string();
    }
    let sign = if secs < 0 { '-' } else { '+' };
    let secs = secs.abs();
    format!("{}{:02}:{:02}", sign, secs / 3600, (secs % 3600) / 60)
}

mod utc_offset {
    use chrono::FixedOffset;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(offset: &FixedOffset, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_utc_offset(*offset))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<FixedOffset, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_utc_offset(&raw).map_err(serde::de::Error::custom)
    }
}
