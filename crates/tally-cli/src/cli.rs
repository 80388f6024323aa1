//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Tally - Financial analytics over your own ledger
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Self-hosted financial analytics engine", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, env = "TALLY_DB", default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Analytics config file (TOML)
    ///
    /// Falls back to the per-user override, then to built-in defaults.
    #[arg(long, env = "TALLY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Manage workspaces
    Workspace {
        #[command(subcommand)]
        action: Option<WorkspaceAction>,
    },

    /// Manage accounts
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },

    /// Manage budgets
    Budget {
        #[command(subcommand)]
        action: BudgetAction,
    },

    /// Manage savings goals
    Goal {
        #[command(subcommand)]
        action: GoalAction,
    },

    /// Import a CSV ledger into an account
    ///
    /// Columns: date,amount[,direction][,category][,description]
    Import {
        /// Workspace id or name
        #[arg(short, long)]
        workspace: String,

        /// Account id or name
        #[arg(short, long)]
        account: String,

        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show the workspace overview
    Overview {
        /// Workspace id or name
        #[arg(short, long)]
        workspace: String,

        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        as_of: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Spending breakdown by category
    Spending {
        #[command(flatten)]
        range: RangeArgs,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Income breakdown by category
    Income {
        #[command(flatten)]
        range: RangeArgs,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Income, expenses and balance over time
    Trends {
        #[command(flatten)]
        series: TrendArgs,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Cash-flow profile and forecast
    CashFlow {
        /// Workspace id or name
        #[arg(short, long)]
        workspace: String,

        /// Months to forecast (defaults to the configured horizon)
        #[arg(long)]
        horizon: Option<u32>,

        /// Reference date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        as_of: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Allowed CORS origins (comma-separated)
        #[arg(long, env = "TALLY_ALLOWED_ORIGINS", value_delimiter = ',')]
        allowed_origins: Vec<String>,
    },
}

/// Workspace and date range shared by the breakdown commands
#[derive(Args)]
pub struct RangeArgs {
    /// Workspace id or name
    #[arg(short, long)]
    pub workspace: String,

    /// Period: this-month, last-month, this-quarter, this-year, last-year,
    /// last-30-days, last-90-days, last-12-months
    #[arg(short, long, default_value = "this-month")]
    pub period: String,

    /// Custom start date (YYYY-MM-DD)
    #[arg(long, requires = "to")]
    pub from: Option<String>,

    /// Custom end date (YYYY-MM-DD)
    #[arg(long, requires = "from")]
    pub to: Option<String>,

    /// Compare against the preceding period of equal length
    #[arg(long)]
    pub compare: bool,

    /// Reference date for presets (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub as_of: Option<String>,
}

/// Shape of a trend series
#[derive(Args)]
pub struct TrendArgs {
    /// Workspace id or name
    #[arg(short, long)]
    pub workspace: String,

    /// Period size: month, quarter, year
    #[arg(short, long, default_value = "month")]
    pub granularity: String,

    /// Number of periods
    #[arg(short, long, default_value = "12")]
    pub count: u32,

    /// Include a spending breakdown per period
    #[arg(long)]
    pub detailed: bool,

    /// Reference date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub as_of: Option<String>,
}

#[derive(Subcommand)]
pub enum WorkspaceAction {
    /// List workspaces
    List,

    /// Create a workspace
    Add {
        /// Workspace name
        name: String,

        /// ISO currency code
        #[arg(long, default_value = "USD")]
        currency: String,

        /// UTC offset (UTC, +HH:MM, -HH:MM)
        #[arg(long, default_value = "UTC", allow_hyphen_values = true)]
        timezone: String,
    },
}

#[derive(Subcommand)]
pub enum AccountAction {
    /// Create an account
    Add {
        /// Workspace id or name
        #[arg(short, long)]
        workspace: String,

        /// Account name
        name: String,

        /// Balance before the first imported transaction
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        opening_balance: String,
    },

    /// List accounts
    List {
        /// Workspace id or name
        #[arg(short, long)]
        workspace: String,
    },
}

#[derive(Subcommand)]
pub enum BudgetAction {
    /// Create a category budget
    Add {
        /// Workspace id or name
        #[arg(short, long)]
        workspace: String,

        /// Category the budget applies to
        #[arg(short, long)]
        category: String,

        /// Budgeted amount per period
        #[arg(short, long)]
        amount: String,

        /// Budget period: month, quarter, year
        #[arg(long, default_value = "month")]
        period: String,
    },
}

#[derive(Subcommand)]
pub enum GoalAction {
    /// Create a savings goal
    Add {
        /// Workspace id or name
        #[arg(short, long)]
        workspace: String,

        /// Goal name
        name: String,

        /// Target amount
        #[arg(short, long)]
        target: String,

        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        by: Option<String>,
    },
}
