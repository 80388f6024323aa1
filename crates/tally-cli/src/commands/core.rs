//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` - Resolve the analytics config
//! - `cmd_init` - Initialize the database

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tally_core::{AnalyticsConfig, Database};
use tracing::debug;

pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    debug!(path = path_str, "Opening database");
    Database::new(path_str).context("Failed to open database")
}

pub fn load_config(explicit: Option<&Path>) -> Result<AnalyticsConfig> {
    AnalyticsConfig::load(explicit).context("Failed to load analytics config")
}

/// Parse a YYYY-MM-DD argument, defaulting to today (UTC)
pub fn parse_as_of(as_of: Option<&str>) -> Result<NaiveDate> {
    match as_of {
        Some(s) => parse_date(s, "--as-of"),
        None => Ok(Utc::now().date_naive()),
    }
}

pub fn parse_date(s: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid {} date format (use YYYY-MM-DD)", flag))
}

pub fn parse_amount(s: &str) -> Result<Decimal> {
    Decimal::from_str(s.trim()).with_context(|| format!("Invalid amount: {}", s))
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path)?;

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Create a workspace: tally workspace add household");
    println!("  2. Add an account: tally account add -w household checking");
    println!("  3. Import transactions: tally import -w household -a checking -f ledger.csv");
    println!("  4. Start web UI: tally serve");

    Ok(())
}
