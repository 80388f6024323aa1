//! Tally CLI - Financial analytics for personal ledgers
//!
//! Usage:
//!   tally init                                  Initialize database
//!   tally workspace add household               Create a workspace
//!   tally import -w household -a 1 -f jan.csv   Import a CSV ledger
//!   tally overview -w household                 Workspace summary
//!   tally serve --port 3000                     Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Workspace { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(WorkspaceAction::List) => commands::cmd_workspace_list(&db),
                Some(WorkspaceAction::Add {
                    name,
                    currency,
                    timezone,
                }) => commands::cmd_workspace_add(&db, &name, &currency, &timezone),
            }
        }
        Commands::Account { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                AccountAction::Add {
                    workspace,
                    name,
                    opening_balance,
                } => commands::cmd_account_add(&db, &workspace, &name, &opening_balance),
                AccountAction::List { workspace } => commands::cmd_account_list(&db, &workspace),
            }
        }
        Commands::Budget { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                BudgetAction::Add {
                    workspace,
                    category,
                    amount,
                    period,
                } => commands::cmd_budget_add(&db, &workspace, &category, &amount, &period),
            }
        }
        Commands::Goal { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                GoalAction::Add {
                    workspace,
                    name,
                    target,
                    by,
                } => commands::cmd_goal_add(&db, &workspace, &name, &target, by.as_deref()),
            }
        }
        Commands::Import {
            workspace,
            account,
            file,
        } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_import(&db, &workspace, &account, &file).map(|_| ())
        }
        Commands::Overview {
            workspace,
            as_of,
            json,
        } => {
            let db = commands::open_db(&cli.db)?;
            let config = commands::load_config(config)?;
            commands::cmd_overview(&db, &config, &workspace, as_of.as_deref(), json).await
        }
        Commands::Spending { range, json } => {
            let db = commands::open_db(&cli.db)?;
            let config = commands::load_config(config)?;
            commands::cmd_breakdown(&db, &config, &range, commands::FlowKind::Spending, json).await
        }
        Commands::Income { range, json } => {
            let db = commands::open_db(&cli.db)?;
            let config = commands::load_config(config)?;
            commands::cmd_breakdown(&db, &config, &range, commands::FlowKind::Income, json).await
        }
        Commands::Trends { series, json } => {
            let db = commands::open_db(&cli.db)?;
            let config = commands::load_config(config)?;
            commands::cmd_trends(&db, &config, &series, json).await
        }
        Commands::CashFlow {
            workspace,
            horizon,
            as_of,
            json,
        } => {
            let db = commands::open_db(&cli.db)?;
            let config = commands::load_config(config)?;
            commands::cmd_cash_flow(&db, &config, &workspace, horizon, as_of.as_deref(), json)
                .await
        }
        Commands::Serve {
            port,
            host,
            allowed_origins,
        } => {
            let config = commands::load_config(config)?;
            commands::cmd_serve(&cli.db, &host, port, config, allowed_origins).await
        }
    }
}
