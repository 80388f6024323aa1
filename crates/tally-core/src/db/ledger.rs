//! `LedgerSource` implementation for the SQLite store
//!
//! Reads run on tokio's blocking pool so that concurrent reads issued by
//! the analytics service overlap. Storage failures surface as
//! `Error::UpstreamRead`; an unknown workspace stays `Error::NotFound`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rusqlite::params;
use tracing::warn;

use super::{parse_decimal, Database};
use crate::error::{Error, Result};
use crate::ledger::{LedgerQuery, LedgerSource};
use crate::models::{TransactionRecord, WorkspaceMetadata, WorkspaceSettings};

impl Database {
    /// Active counts and the summed opening balance of a workspace
    pub fn load_workspace_metadata(&self, workspace_id: i64) -> Result<WorkspaceMetadata> {
        if self.get_workspace(workspace_id)?.is_none() {
            return Err(Error::NotFound(format!("workspace {}", workspace_id)));
        }

        let conn = self.conn()?;
        let count = |table: &str| -> Result<i64> {
            Ok(conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE workspace_id = ? AND active = 1",
                    table
                ),
                params![workspace_id],
                |row| row.get(0),
            )?)
        };
        let active_accounts = count("accounts")?;
        let active_budgets = count("budgets")?;
        let active_goals = count("savings_goals")?;

        let mut stmt = conn.prepare(
            "SELECT opening_balance FROM accounts WHERE workspace_id = ? AND active = 1",
        )?;
        let balances = stmt
            .query_map(params![workspace_id], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let opening_balance = balances
            .iter()
            .map(|b| parse_decimal(b))
            .sum::<Result<Decimal>>()?;

        Ok(WorkspaceMetadata {
            active_accounts,
            active_budgets,
            active_goals,
            opening_balance,
        })
    }
}

/// Run a blocking store read and translate its failure for the engine
async fn read<T, F>(what: &'static str, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::UpstreamRead(format!("{} read task failed: {}", what, e)))?;

    result.map_err(|e| match e {
        Error::NotFound(_) | Error::UpstreamRead(_) => e,
        other => {
            warn!(read = what, error = %other, "Ledger read failed");
            Error::UpstreamRead(format!("{} read failed: {}", what, other))
        }
    })
}

#[async_trait]
impl LedgerSource for Database {
    async fn list_transactions(
        &self,
        workspace_id: i64,
        query: LedgerQuery,
    ) -> Result<Vec<TransactionRecord>> {
        let db = self.clone();
        read("ledger", move || {
            if db.get_workspace(workspace_id)?.is_none() {
                return Err(Error::NotFound(format!("workspace {}", workspace_id)));
            }
            db.ledger_transactions(workspace_id, query)
        })
        .await
    }

    async fn workspace_settings(&self, workspace_id: i64) -> Result<WorkspaceSettings> {
        let db = self.clone();
        read("settings", move || {
            db.get_workspace(workspace_id)?
                .map(|ws| ws.settings)
                .ok_or_else(|| Error::NotFound(format!("workspace {}", workspace_id)))
        })
        .await
    }

    async fn workspace_metadata(&self, workspace_id: i64) -> Result<WorkspaceMetadata> {
        let db = self.clone();
        read("metadata", move || db.load_workspace_metadata(workspace_id)).await
    }
}
