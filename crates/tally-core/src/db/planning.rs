//! Budget and savings goal operations

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rusqlite::params;

use super::{parse_datetime, parse_decimal, Database};
use crate::error::{Error, Result};
use crate::models::{Budget, Granularity, SavingsGoal};

impl Database {
    /// Create a budget for one category
    pub fn create_budget(
        &self,
        workspace_id: i64,
        category: &str,
        amount: Decimal,
        period: Granularity,
    ) -> Result<i64> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidData("budget amount must be positive".into()));
        }
        if self.get_workspace(workspace_id)?.is_none() {
            return Err(Error::NotFound(format!("workspace {}", workspace_id)));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO budgets (workspace_id, category, amount, period) VALUES (?, ?, ?, ?)",
            params![workspace_id, category.trim(), amount.to_string(), period.as_str()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List the budgets of a workspace
    pub fn list_budgets(&self, workspace_id: i64) -> Result<Vec<Budget>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, workspace_id, category, amount, period, active, created_at
             FROM budgets WHERE workspace_id = ? ORDER BY category",
        )?;

        let rows = stmt
            .query_map(params![workspace_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, bool>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, workspace_id, category, amount, period, active, created_at)| {
                Ok(Budget {
                    id,
                    workspace_id,
                    category,
                    amount: parse_decimal(&amount)?,
                    period: period.parse()?,
                    active,
                    created_at: parse_datetime(&created_at),
                })
            })
            .collect()
    }

    /// Create a savings goal
    pub fn create_goal(
        &self,
        workspace_id: i64,
        name: &str,
        target_amount: Decimal,
        target_date: Option<NaiveDate>,
    ) -> Result<i64> {
        if target_amount <= Decimal::ZERO {
            return Err(Error::InvalidData("goal target must be positive".into()));
        }
        if self.get_workspace(workspace_id)?.is_none() {
            return Err(Error::NotFound(format!("workspace {}", workspace_id)));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO savings_goals (workspace_id, name, target_amount, target_date) VALUES (?, ?, ?, ?)",
            params![
                workspace_id,
                name.trim(),
                target_amount.to_string(),
                target_date.map(|d| d.to_string())
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List the savings goals of a workspace
    pub fn list_goals(&self, workspace_id: i64) -> Result<Vec<SavingsGoal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, workspace_id, name, target_amount, target_date, active, created_at
             FROM savings_goals WHERE workspace_id = ? ORDER BY name",
        )?;

        let rows = stmt
            .query_map(params![workspace_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, bool>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, workspace_id, name, target, target_date, active, created_at)| {
                Ok(SavingsGoal {
                    id,
                    workspace_id,
                    name,
                    target_amount: parse_decimal(&target)?,
                    target_date: target_date
                        .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
                    active,
                    created_at: parse_datetime(&created_at),
                })
            })
            .collect()
    }

    /// Mark a budget active or retired
    pub fn set_budget_active(&self, id: i64, active: bool) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE budgets SET active = ? WHERE id = ?",
            params![active, id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("budget {}", id)));
        }
        Ok(())
    }

    /// Mark a savings goal active or retired
    pub fn set_goal_active(&self, id: i64, active: bool) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE savings_goals SET active = ? WHERE id = ?",
            params![active, id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("savings goal {}", id)));
        }
        Ok(())
    }
}
