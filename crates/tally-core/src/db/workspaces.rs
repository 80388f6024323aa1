//! Workspace operations

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{format_utc_offset, parse_utc_offset, Workspace, WorkspaceSettings};

fn row_to_workspace(row: &rusqlite::Row) -> rusqlite::Result<(i64, String, String, String, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn into_workspace(
    (id, name, currency, timezone, created_at): (i64, String, String, String, String),
) -> Result<Workspace> {
    Ok(Workspace {
        id,
        name,
        settings: WorkspaceSettings {
            currency,
            timezone: parse_utc_offset(&timezone)?,
        },
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Create a workspace, failing if the name is taken
    pub fn create_workspace(&self, name: &str, settings: &WorkspaceSettings) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("workspace name cannot be empty".into()));
        }

        let conn = self.conn()?;
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM workspaces WHERE name = ?",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(Error::InvalidData(format!("workspace '{}' already exists", name)));
        }

        conn.execute(
            "INSERT INTO workspaces (name, currency, timezone) VALUES (?, ?, ?)",
            params![
                name,
                settings.currency.to_uppercase(),
                format_utc_offset(settings.timezone)
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// List all workspaces
    pub fn list_workspaces(&self) -> Result<Vec<Workspace>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, currency, timezone, created_at FROM workspaces ORDER BY name",
        )?;

        let rows = stmt
            .query_map([], row_to_workspace)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(into_workspace).collect()
    }

    /// Get a workspace by ID
    pub fn get_workspace(&self, id: i64) -> Result<Option<Workspace>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, name, currency, timezone, created_at FROM workspaces WHERE id = ?",
                params![id],
                row_to_workspace,
            )
            .optional()?;

        row.map(into_workspace).transpose()
    }

    /// Resolve a workspace by numeric ID or by name
    pub fn find_workspace(&self, id_or_name: &str) -> Result<Workspace> {
        if let Ok(id) = id_or_name.parse::<i64>() {
            if let Some(ws) = self.get_workspace(id)? {
                return Ok(ws);
            }
        }

        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, name, currency, timezone, created_at FROM workspaces WHERE name = ?",
                params![id_or_name],
                row_to_workspace,
            )
            .optional()?;

        match row {
            Some(row) => into_workspace(row),
            None => Err(Error::NotFound(format!("workspace {}", id_or_name))),
        }
    }

    /// Replace a workspace's currency and timezone
    pub fn update_workspace_settings(&self, id: i64, settings: &WorkspaceSettings) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE workspaces SET currency = ?, timezone = ? WHERE id = ?",
            params![
                settings.currency.to_uppercase(),
                format_utc_offset(settings.timezone),
                id
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("workspace {}", id)));
        }
        Ok(())
    }
}
