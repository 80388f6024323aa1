//! Analytics command implementations

use anyhow::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use tally_core::analytics::resolve_period;
use tally_core::db::Database;
use tally_core::{
    AnalyticsConfig, AnalyticsService, CashFlowProfile, CategoryBreakdownEntry, DateRange,
    Granularity, PeriodBucket, TrendPoint,
};

use super::{parse_as_of, truncate};
use crate::cli::{RangeArgs, TrendArgs};

/// Which side of the ledger a breakdown covers
#[derive(Debug, Clone, Copy)]
pub enum FlowKind {
    Spending,
    Income,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_change(change: Option<Decimal>) -> String {
    match change {
        Some(c) if c.is_sign_negative() => format!("{}%", c),
        Some(c) => format!("+{}%", c),
        None => "n/a".to_string(),
    }
}

fn print_bucket(label: &str, bucket: &PeriodBucket) {
    println!(
        "   {:10} {:8} │ {:>12} │ {:>12} │ {:>12} │ {:>5}",
        label,
        bucket.period_key,
        bucket.income.round_dp(2),
        bucket.expenses.round_dp(2),
        bucket.net.round_dp(2),
        bucket.transaction_count
    );
}

fn print_breakdown(entries: &[CategoryBreakdownEntry]) {
    println!(
        "   {:25} │ {:>12} │ {:>7} │ {:>5} │ {:>10}",
        "Category", "Amount", "%", "Count", "Change"
    );
    println!("   ──────────────────────────┼──────────────┼─────────┼───────┼───────────");
    for entry in entries {
        let change = entry
            .change_from_previous
            .map(|c| c.round_dp(2).to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "   {:25} │ {:>12} │ {:>6}% │ {:>5} │ {:>10}",
            truncate(&entry.category, 25),
            entry.amount.round_dp(2),
            entry.percentage,
            entry.transaction_count,
            change
        );
    }
}

fn print_cash_flow(profile: &CashFlowProfile) {
    println!("   Monthly average: {}", profile.monthly_average.round_dp(2));
    print!("   Trend:           {}", profile.trend_direction);
    if profile.low_confidence {
        print!(" (low confidence, short history)");
    }
    println!();
    println!("   Volatility:      {}", profile.volatility_score);

    if profile.predictions.is_empty() {
        println!("   Not enough history to forecast.");
        return;
    }

    println!();
    println!(
        "   {:10} │ {:>12} │ {:>12} │ {:>12} │ {:>10}",
        "Month", "Income", "Expenses", "Net", "Confidence"
    );
    println!("   ───────────┼──────────────┼──────────────┼──────────────┼───────────");
    for p in &profile.predictions {
        println!(
            "   {:10} │ {:>12} │ {:>12} │ {:>12} │ {:>9}%",
            p.period, p.predicted_income, p.predicted_expenses, p.predicted_net, p.confidence
        );
    }
}

pub async fn cmd_overview(
    db: &Database,
    config: &AnalyticsConfig,
    workspace: &str,
    as_of: Option<&str>,
    json: bool,
) -> Result<()> {
    let ws = db.find_workspace(workspace)?;
    let as_of = parse_as_of(as_of)?;
    let service = AnalyticsService::new(db, config);

    let overview = service.overview(ws.id, as_of).await?;
    if json {
        return print_json(&overview);
    }

    println!();
    println!("📊 {} as of {}", ws.name, overview.as_of);
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   Net worth:     {} {}",
        overview.net_worth.round_dp(2),
        overview.currency
    );
    println!("   Savings rate:  {}%", overview.savings_rate);
    println!(
        "   Income:        {} vs. last month",
        format_change(overview.income_change)
    );
    println!(
        "   Expenses:      {} vs. last month",
        format_change(overview.expense_change)
    );
    println!(
        "   Accounts: {}  Budgets: {}  Goals: {}  Transactions: {}",
        overview.active_accounts,
        overview.active_budgets,
        overview.active_goals,
        overview.transaction_count
    );

    println!();
    println!(
        "   {:10} {:8} │ {:>12} │ {:>12} │ {:>12} │ {:>5}",
        "", "Period", "Income", "Expenses", "Net", "Count"
    );
    print_bucket("Previous", &overview.previous_period);
    print_bucket("Current", &overview.current_period);

    if !overview.top_spending.is_empty() {
        println!();
        println!("   Top spending this month");
        print_breakdown(&overview.top_spending);
    }

    if let Some(cash_flow) = &overview.cash_flow {
        println!();
        print_cash_flow(cash_flow);
    }

    Ok(())
}

pub async fn cmd_breakdown(
    db: &Database,
    config: &AnalyticsConfig,
    args: &RangeArgs,
    kind: FlowKind,
    json: bool,
) -> Result<()> {
    let ws = db.find_workspace(&args.workspace)?;
    let today = parse_as_of(args.as_of.as_deref())?;
    let range: DateRange = resolve_period(
        &args.period,
        args.from.as_deref(),
        args.to.as_deref(),
        today,
    )?;
    let service = AnalyticsService::new(db, config);

    let entries = match kind {
        FlowKind::Spending => service.spending_analysis(ws.id, range, args.compare).await?,
        FlowKind::Income => service.income_analysis(ws.id, range, args.compare).await?,
    };
    if json {
        return print_json(&entries);
    }

    let title = match kind {
        FlowKind::Spending => "Spending",
        FlowKind::Income => "Income",
    };
    println!();
    println!("📊 {} by category", title);
    println!("   Period: {} to {}", range.start, range.end);
    println!("   ─────────────────────────────────────────────────────────────");

    if entries.is_empty() {
        println!("   Nothing recorded in this period.");
        return Ok(());
    }

    let total: Decimal = entries.iter().map(|e| e.amount).sum();
    println!("   Total: {} {}", total.round_dp(2), ws.settings.currency);
    println!();
    print_breakdown(&entries);

    Ok(())
}

pub async fn cmd_trends(
    db: &Database,
    config: &AnalyticsConfig,
    args: &TrendArgs,
    json: bool,
) -> Result<()> {
    let ws = db.find_workspace(&args.workspace)?;
    let granularity: Granularity = args.granularity.parse()?;
    let as_of = parse_as_of(args.as_of.as_deref())?;
    let service = AnalyticsService::new(db, config);

    let points = service
        .trends(ws.id, granularity, args.count, args.detailed, as_of)
        .await?;
    if json {
        return print_json(&points);
    }

    println!();
    println!("📈 {} trends ({} periods)", granularity, points.len());
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:8} │ {:>12} │ {:>12} │ {:>12} │ {:>12} │ {:>8}",
        "Period", "Income", "Expenses", "Net", "Balance", "Growth"
    );
    println!("   ─────────┼──────────────┼──────────────┼──────────────┼──────────────┼─────────");
    for point in &points {
        print_trend_point(point);
        if let Some(breakdown) = &point.category_breakdown {
            for entry in breakdown {
                println!(
                    "     └ {:20} {:>12} ({}%)",
                    truncate(&entry.category, 20),
                    entry.amount.round_dp(2),
                    entry.percentage
                );
            }
        }
    }

    Ok(())
}

fn print_trend_point(point: &TrendPoint) {
    let growth = point
        .growth_rate
        .map(|g| format!("{}%", (g * Decimal::ONE_HUNDRED).round_dp(1)))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "   {:8} │ {:>12} │ {:>12} │ {:>12} │ {:>12} │ {:>8}",
        point.period,
        point.income.round_dp(2),
        point.expenses.round_dp(2),
        point.net.round_dp(2),
        point.balance.round_dp(2),
        growth
    );
}

pub async fn cmd_cash_flow(
    db: &Database,
    config: &AnalyticsConfig,
    workspace: &str,
    horizon: Option<u32>,
    as_of: Option<&str>,
    json: bool,
) -> Result<()> {
    let ws = db.find_workspace(workspace)?;
    let as_of = parse_as_of(as_of)?;
    let horizon = horizon.unwrap_or(config.default_horizon_months);
    let service = AnalyticsService::new(db, config);

    let profile = service.cash_flow(ws.id, horizon, as_of).await?;
    if json {
        return print_json(&profile);
    }

    println!();
    println!("💸 Cash flow for {} as of {}", ws.name, as_of);
    println!("   ─────────────────────────────────────────────────────────────");
    print_cash_flow(&profile);

    Ok(())
}
