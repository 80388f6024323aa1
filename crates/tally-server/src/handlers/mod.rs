//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod analytics;
pub mod overview;

// Re-export all handlers for use in router
pub use analytics::*;
pub use overview::*;

use chrono::{NaiveDate, Utc};

use crate::AppError;

/// Parse an optional `as_of` date, defaulting to today (UTC)
pub(crate) fn parse_as_of(as_of: Option<&str>) -> Result<NaiveDate, AppError> {
    match as_of {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| AppError::bad_request("Invalid as_of date format (use YYYY-MM-DD)")),
        None => Ok(Utc::now().date_naive()),
    }
}
