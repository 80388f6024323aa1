//! Account operations

use rust_decimal::Decimal;
use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, parse_decimal, Database};
use crate::error::{Error, Result};
use crate::models::Account;

const ACCOUNT_COLUMNS: &str = "id, workspace_id, name, opening_balance, active, created_at";

type AccountRow = (i64, i64, String, String, bool, String);

fn row_to_account(row: &rusqlite::Row) -> rusqlite::Result<AccountRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn into_account(
    (id, workspace_id, name, opening_balance, active, created_at): AccountRow,
) -> Result<Account> {
    Ok(Account {
        id,
        workspace_id,
        name,
        opening_balance: parse_decimal(&opening_balance)?,
        active,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Create an account inside a workspace
    pub fn create_account(
        &self,
        workspace_id: i64,
        name: &str,
        opening_balance: Decimal,
    ) -> Result<i64> {
        if self.get_workspace(workspace_id)?.is_none() {
            return Err(Error::NotFound(format!("workspace {}", workspace_id)));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO accounts (workspace_id, name, opening_balance) VALUES (?, ?, ?)",
            params![workspace_id, name.trim(), opening_balance.to_string()],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// List the accounts of a workspace
    pub fn list_accounts(&self, workspace_id: i64) -> Result<Vec<Account>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM accounts WHERE workspace_id = ? ORDER BY name",
            ACCOUNT_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![workspace_id], row_to_account)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(into_account).collect()
    }

    /// Get an account by ID
    pub fn get_account(&self, id: i64) -> Result<Option<Account>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM accounts WHERE id = ?", ACCOUNT_COLUMNS),
                params![id],
                row_to_account,
            )
            .optional()?;

        row.map(into_account).transpose()
    }

    /// Resolve an account of `workspace_id` by numeric ID or by name
    pub fn find_account(&self, workspace_id: i64, id_or_name: &str) -> Result<Account> {
        if let Ok(id) = id_or_name.parse::<i64>() {
            if let Some(account) = self.get_account(id)?.filter(|a| a.workspace_id == workspace_id) {
                return Ok(account);
            }
        }

        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM accounts WHERE workspace_id = ? AND name = ?",
                    ACCOUNT_COLUMNS
                ),
                params![workspace_id, id_or_name],
                row_to_account,
            )
            .optional()?;

        match row {
            Some(row) => into_account(row),
            None => Err(Error::NotFound(format!("account {}", id_or_name))),
        }
    }

    /// Mark an account active or closed
    pub fn set_account_active(&self, id: i64, active: bool) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE accounts SET active = ? WHERE id = ?",
            params![active, id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("account {}", id)));
        }
        Ok(())
    }
}
