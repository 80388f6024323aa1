//! Workspace, account, budget and goal commands

use anyhow::{Context, Result};
use tally_core::db::Database;
use tally_core::models::parse_utc_offset;
use tally_core::{Granularity, WorkspaceSettings};

use super::{parse_amount, parse_date, truncate};

pub fn cmd_workspace_add(db: &Database, name: &str, currency: &str, timezone: &str) -> Result<()> {
    let settings = WorkspaceSettings {
        currency: currency.to_string(),
        timezone: parse_utc_offset(timezone)?,
    };
    let id = db
        .create_workspace(name, &settings)
        .context("Failed to create workspace")?;

    println!("✅ Created workspace '{}' (id {})", name, id);
    Ok(())
}

pub fn cmd_workspace_list(db: &Database) -> Result<()> {
    let workspaces = db.list_workspaces()?;

    if workspaces.is_empty() {
        println!("No workspaces yet. Create one with: tally workspace add <name>");
        return Ok(());
    }

    println!();
    println!("   {:>4} │ {:25} │ {:8} │ {:8}", "ID", "Name", "Currency", "Offset");
    println!("   ─────┼───────────────────────────┼──────────┼─────────");
    for ws in &workspaces {
        println!(
            "   {:>4} │ {:25} │ {:8} │ {:8}",
            ws.id,
            truncate(&ws.name, 25),
            ws.settings.currency,
            ws.settings.timezone.to_string()
        );
    }
    Ok(())
}

pub fn cmd_account_add(
    db: &Database,
    workspace: &str,
    name: &str,
    opening_balance: &str,
) -> Result<()> {
    let ws = db.find_workspace(workspace)?;
    let opening_balance = parse_amount(opening_balance)?;
    let id = db.create_account(ws.id, name, opening_balance)?;

    println!(
        "✅ Created account '{}' (id {}) in '{}' with opening balance {} {}",
        name, id, ws.name, opening_balance, ws.settings.currency
    );
    Ok(())
}

pub fn cmd_account_list(db: &Database, workspace: &str) -> Result<()> {
    let ws = db.find_workspace(workspace)?;
    let accounts = db.list_accounts(ws.id)?;

    if accounts.is_empty() {
        println!("No accounts in '{}'.", ws.name);
        return Ok(());
    }

    println!();
    println!("   {:>4} │ {:25} │ {:>12} │ {:6}", "ID", "Name", "Opening", "Active");
    println!("   ─────┼───────────────────────────┼──────────────┼───────");
    for account in &accounts {
        println!(
            "   {:>4} │ {:25} │ {:>12} │ {:6}",
            account.id,
            truncate(&account.name, 25),
            account.opening_balance.round_dp(2),
            if account.active { "yes" } else { "no" }
        );
    }
    Ok(())
}

pub fn cmd_budget_add(
    db: &Database,
    workspace: &str,
    category: &str,
    amount: &str,
    period: &str,
) -> Result<()> {
    let ws = db.find_workspace(workspace)?;
    let amount = parse_amount(amount)?;
    let period: Granularity = period.parse()?;
    let id = db.create_budget(ws.id, category, amount, period)?;

    println!(
        "✅ Created {} budget for '{}' (id {}): {} {}",
        period, category, id, amount, ws.settings.currency
    );
    Ok(())
}

pub fn cmd_goal_add(
    db: &Database,
    workspace: &str,
    name: &str,
    target: &str,
    by: Option<&str>,
) -> Result<()> {
    let ws = db.find_workspace(workspace)?;
    let target = parse_amount(target)?;
    let target_date = by.map(|d| parse_date(d, "--by")).transpose()?;
    let id = db.create_goal(ws.id, name, target, target_date)?;

    match target_date {
        Some(date) => println!(
            "✅ Created goal '{}' (id {}): {} {} by {}",
            name, id, target, ws.settings.currency, date
        ),
        None => println!(
            "✅ Created goal '{}' (id {}): {} {}",
            name, id, target, ws.settings.currency
        ),
    }
    Ok(())
}
