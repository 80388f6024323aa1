//! Transaction operations

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension};

use super::{parse_decimal, Database};
use crate::error::{Error, Result};
use crate::ledger::LedgerQuery;
use crate::models::{Direction, NewTransaction, TransactionRecord};

/// Canonical storage form of a timestamp; sorts lexically in time order
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A transaction row as stored, before validation
struct LedgerRow {
    id: i64,
    workspace_id: i64,
    account_id: i64,
    amount: String,
    direction: String,
    category: Option<String>,
    occurred_at: String,
    currency: String,
}

impl LedgerRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            workspace_id: row.get(1)?,
            account_id: row.get(2)?,
            amount: row.get(3)?,
            direction: row.get(4)?,
            category: row.get(5)?,
            occurred_at: row.get(6)?,
            currency: row.get(7)?,
        })
    }

    /// Map into a strict record, rejecting anything the engine could misread
    fn into_record(self) -> Result<TransactionRecord> {
        let amount = parse_decimal(&self.amount)?;
        if amount.is_sign_negative() {
            return Err(Error::InvalidData(format!(
                "transaction {} has a negative amount",
                self.id
            )));
        }
        let direction: Direction = self
            .direction
            .parse()
            .map_err(|e| Error::InvalidData(format!("transaction {}: {}", self.id, e)))?;
        let occurred_at = DateTime::parse_from_rfc3339(&self.occurred_at)
            .map_err(|e| {
                Error::InvalidData(format!("transaction {} timestamp: {}", self.id, e))
            })?
            .with_timezone(&Utc);
        let category = self
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Ok(TransactionRecord {
            id: self.id,
            workspace_id: self.workspace_id,
            account_id: self.account_id,
            amount,
            direction,
            category,
            occurred_at,
            currency: self.currency,
        })
    }
}

impl Database {
    /// Insert a transaction (skips duplicates based on import_hash)
    ///
    /// Returns None when the workspace already holds an entry with the same hash.
    pub fn insert_transaction(&self, workspace_id: i64, tx: &NewTransaction) -> Result<Option<i64>> {
        if tx.amount.is_sign_negative() {
            return Err(Error::InvalidData("amount must not be negative".into()));
        }
        let account = self
            .get_account(tx.account_id)?
            .filter(|a| a.workspace_id == workspace_id)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "account {} in workspace {}",
                    tx.account_id, workspace_id
                ))
            })?;

        let conn = self.conn()?;

        // Check for duplicate
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM transactions WHERE workspace_id = ? AND import_hash = ?",
                params![workspace_id, tx.import_hash],
                |row| row.get(0),
            )
            .optional()?;

        if existing.is_some() {
            return Ok(None); // Duplicate, skip
        }

        conn.execute(
            r#"
            INSERT INTO transactions (workspace_id, account_id, amount, direction, category, description, occurred_at, import_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                workspace_id,
                account.id,
                tx.amount.to_string(),
                tx.direction.as_str(),
                tx.category,
                tx.description,
                format_timestamp(tx.occurred_at),
                tx.import_hash,
            ],
        )?;

        Ok(Some(conn.last_insert_rowid()))
    }

    /// Ledger entries of a workspace inside a UTC window, oldest first
    pub fn ledger_transactions(
        &self,
        workspace_id: i64,
        query: LedgerQuery,
    ) -> Result<Vec<TransactionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT t.id, t.workspace_id, t.account_id, t.amount, t.direction, t.category,
                   t.occurred_at, w.currency
            FROM transactions t
            JOIN workspaces w ON w.id = t.workspace_id
            WHERE t.workspace_id = ?1
              AND (?2 IS NULL OR t.occurred_at >= ?2)
              AND t.occurred_at < ?3
            ORDER BY t.occurred_at, t.id
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![
                    workspace_id,
                    query.from.map(format_timestamp),
                    format_timestamp(query.until)
                ],
                LedgerRow::from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(LedgerRow::into_record).collect()
    }

    /// Count the transactions of a workspace
    pub fn count_transactions(&self, workspace_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE workspace_id = ?",
            params![workspace_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
