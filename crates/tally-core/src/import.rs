//! CSV ledger import
//!
//! Format: `date,amount,direction,category,description` with a header row.
//! Columns are matched by header name, so order does not matter and only
//! `date` and `amount` are required.

use std::collections::HashMap;
use std::io::Read;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use csv::{ReaderBuilder, StringRecord};
use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Direction, NewTransaction, Workspace};

/// A row that could not be imported
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: String,
}

/// Rows parsed from one file
#[derive(Debug, Default)]
pub struct ParsedLedger {
    pub transactions: Vec<NewTransaction>,
    pub skipped: Vec<SkippedRow>,
}

/// Outcome of an import
#[derive(Debug, Default, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub duplicates: usize,
    pub skipped: Vec<SkippedRow>,
}

struct Columns {
    date: usize,
    amount: usize,
    direction: Option<usize>,
    category: Option<usize>,
    description: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        Ok(Self {
            date: find("date").ok_or_else(|| Error::Import("Missing 'date' column".into()))?,
            amount: find("amount").ok_or_else(|| Error::Import("Missing 'amount' column".into()))?,
            direction: find("direction"),
            category: find("category"),
            description: find("description"),
        })
    }
}

fn field<'r>(record: &'r StringRecord, idx: Option<usize>) -> Option<&'r str> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Parse a timestamp: RFC 3339, or a calendar date taken as local noon
fn parse_occurred_at(s: &str, offset: FixedOffset) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Ok(at.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%m/%d/%Y", // 01/15/2024
        "%m/%d/%y", // 01/15/24
    ];
    let date = formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .ok_or_else(|| Error::Import(format!("Unable to parse date: {}", s)))?;

    let noon = date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN));
    offset
        .from_local_datetime(&noon)
        .single()
        .map(|at| at.with_timezone(&Utc))
        .ok_or_else(|| Error::Import(format!("Unable to place date: {}", s)))
}

/// Parse an amount string, handling currency symbols, commas and parentheses
fn parse_amount(s: &str) -> Result<Decimal> {
    let cleaned: String = s
        .trim()
        .replace(['$', '€', '£', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    Decimal::from_str(&cleaned).map_err(|_| Error::Import(format!("Unable to parse amount: {}", s)))
}

/// Resolve the direction and unsigned amount of a row
fn resolve_direction(amount: Decimal, direction: Option<&str>) -> Result<(Direction, Decimal)> {
    match direction {
        Some(d) => {
            let direction = Direction::from_str(d).map_err(Error::Import)?;
            Ok((direction, amount.abs()))
        }
        None if amount > Decimal::ZERO => Ok((Direction::Income, amount)),
        None if amount < Decimal::ZERO => Ok((Direction::Expense, -amount)),
        None => Err(Error::Import(
            "zero amount needs an explicit direction".into(),
        )),
    }
}

fn generate_hash(account_id: i64, tx: &NewTransaction, ordinal: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(account_id.to_be_bytes());
    hasher.update(tx.occurred_at.timestamp().to_be_bytes());
    hasher.update(tx.amount.normalize().to_string().as_bytes());
    hasher.update(tx.direction.as_str().as_bytes());
    hasher.update(tx.category.as_deref().unwrap_or("").as_bytes());
    hasher.update(tx.description.as_deref().unwrap_or("").as_bytes());
    // Distinguishes identical rows within the same file
    hasher.update(ordinal.to_be_bytes());
    hex::encode(hasher.finalize())
}

fn parse_row(
    record: &StringRecord,
    columns: &Columns,
    account_id: i64,
    offset: FixedOffset,
) -> Result<NewTransaction> {
    let date = field(record, Some(columns.date)).ok_or_else(|| Error::Import("Missing date".into()))?;
    let amount =
        field(record, Some(columns.amount)).ok_or_else(|| Error::Import("Missing amount".into()))?;

    let (direction, amount) = resolve_direction(parse_amount(amount)?, field(record, columns.direction))?;

    Ok(NewTransaction {
        account_id,
        amount,
        direction,
        category: field(record, columns.category).map(str::to_string),
        description: field(record, columns.description).map(str::to_string),
        occurred_at: parse_occurred_at(date, offset)?,
        import_hash: String::new(),
    })
}

/// Parse a ledger CSV for `account_id`, dating entries in `offset`
///
/// Malformed rows are collected in `skipped` with their line number; a
/// missing header is an error.
pub fn parse_ledger_csv<R: Read>(reader: R, account_id: i64, offset: FixedOffset) -> Result<ParsedLedger> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns = Columns::from_headers(rdr.headers()?)?;
    let mut parsed = ParsedLedger::default();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for result in rdr.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                parsed.skipped.push(SkippedRow {
                    line,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        match parse_row(&record, &columns, account_id, offset) {
            Ok(mut tx) => {
                let base = generate_hash(account_id, &tx, 0);
                let ordinal = seen.entry(base).or_insert(0);
                tx.import_hash = generate_hash(account_id, &tx, *ordinal);
                *ordinal += 1;
                parsed.transactions.push(tx);
            }
            Err(e) => {
                warn!(line, error = %e, "Skipping malformed row");
                parsed.skipped.push(SkippedRow {
                    line,
                    reason: e.to_string(),
                });
            }
        }
    }

    debug!(
        parsed = parsed.transactions.len(),
        skipped = parsed.skipped.len(),
        "Parsed ledger CSV"
    );
    Ok(parsed)
}

/// Import a ledger CSV into an account of `workspace`
///
/// Re-importing the same file inserts nothing.
pub fn import_csv<R: Read>(
    db: &Database,
    workspace: &Workspace,
    account_id: i64,
    reader: R,
) -> Result<ImportSummary> {
    let account = db.find_account(workspace.id, &account_id.to_string())?;
    let parsed = parse_ledger_csv(reader, account.id, workspace.settings.timezone)?;

    let mut summary = ImportSummary {
        skipped: parsed.skipped,
        ..ImportSummary::default()
    };
    for tx in &parsed.transactions {
        match db.insert_transaction(workspace.id, tx)? {
            Some(_) => summary.imported += 1,
            None => summary.duplicates += 1,
        }
    }

    info!(
        workspace = %workspace.name,
        account = %account.name,
        imported = summary.imported,
        duplicates = summary.duplicates,
        skipped = summary.skipped.len(),
        "Imported ledger"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{parse_utc_offset, utc, WorkspaceSettings};
    use rust_decimal_macros::dec;

    const SAMPLE: &str = "date,amount,direction,category,description
2024-01-15,3000,income,Salary,ACME payroll
2024-01-16,-45.20,,Groceries,Corner shop
2024-01-16,\"$1,200.00\",expense,Rent,January rent
2024-01-17,500,transfer,,To savings
";

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,234.56").unwrap(), dec!(1234.56));
        assert_eq!(parse_amount("-123.45").unwrap(), dec!(-123.45));
        assert_eq!(parse_amount("(100.00)").unwrap(), dec!(-100.00));
        assert!(parse_amount("12abc").is_err());
    }

    #[test]
    fn test_parse_ledger() {
        let parsed = parse_ledger_csv(SAMPLE.as_bytes(), 7, utc()).unwrap();
        assert!(parsed.skipped.is_empty());
        assert_eq!(parsed.transactions.len(), 4);

        let groceries = &parsed.transactions[1];
        assert_eq!(groceries.direction, Direction::Expense);
        assert_eq!(groceries.amount, dec!(45.20));
        assert_eq!(groceries.account_id, 7);
        assert_eq!(groceries.occurred_at.to_rfc3339(), "2024-01-16T12:00:00+00:00");

        assert_eq!(parsed.transactions[2].amount, dec!(1200.00));
        assert_eq!(parsed.transactions[3].direction, Direction::Transfer);
        assert_eq!(parsed.transactions[3].category, None);
    }

    #[test]
    fn test_dates_are_local_noon() {
        let offset = parse_utc_offset("-05:00").unwrap();
        let at = parse_occurred_at("2024-03-01", offset).unwrap();
        assert_eq!(at.to_rfc3339(), "2024-03-01T17:00:00+00:00");

        let exact = parse_occurred_at("2024-03-01T23:30:00+02:00", offset).unwrap();
        assert_eq!(exact.to_rfc3339(), "2024-03-01T21:30:00+00:00");
    }

    #[test]
    fn test_malformed_rows_reported_by_line() {
        let csv = "date,amount,category
2024-01-01,10,A
not-a-date,10,B
2024-01-03,,C
2024-01-04,0,D
2024-01-05,-3,E
";
        let parsed = parse_ledger_csv(csv.as_bytes(), 1, utc()).unwrap();
        assert_eq!(parsed.transactions.len(), 2);
        let lines: Vec<u64> = parsed.skipped.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
    }

    #[test]
    fn test_missing_required_column() {
        let result = parse_ledger_csv("when,amount\n2024-01-01,1\n".as_bytes(), 1, utc());
        assert!(matches!(result, Err(Error::Import(_))));
    }

    #[test]
    fn test_identical_rows_get_distinct_hashes() {
        let csv = "date,amount,category
2024-01-01,-4.50,Coffee
2024-01-01,-4.50,Coffee
";
        let parsed = parse_ledger_csv(csv.as_bytes(), 1, utc()).unwrap();
        assert_ne!(
            parsed.transactions[0].import_hash,
            parsed.transactions[1].import_hash
        );

        let again = parse_ledger_csv(csv.as_bytes(), 1, utc()).unwrap();
        assert_eq!(
            parsed.transactions[1].import_hash,
            again.transactions[1].import_hash
        );
    }

    #[test]
    fn test_import_is_idempotent() {
        let db = Database::in_memory().unwrap();
        let ws_id = db
            .create_workspace("Home", &WorkspaceSettings::default())
            .unwrap();
        let account = db.create_account(ws_id, "Checking", Decimal::ZERO).unwrap();
        let ws = db.get_workspace(ws_id).unwrap().unwrap();

        let first = import_csv(&db, &ws, account, SAMPLE.as_bytes()).unwrap();
        assert_eq!(first.imported, 4);
        assert_eq!(first.duplicates, 0);

        let second = import_csv(&db, &ws, account, SAMPLE.as_bytes()).unwrap();
        assert_eq!(second.imported, 0);
        assert_eq!(second.duplicates, 4);
        assert_eq!(db.count_transactions(ws_id).unwrap(), 4);
    }
}
