//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Database initialization and shared utilities (open_db, load_config)
//! - `workspaces` - Workspace, account, budget and goal management
//! - `import` - CSV ledger import
//! - `analytics` - Overview, breakdowns, trends and cash flow
//! - `serve` - Web server command

pub mod analytics;
pub mod core;
pub mod import;
pub mod serve;
pub mod workspaces;

// Re-export command functions for main.rs
pub use analytics::*;
pub use core::*;
pub use import::*;
pub use serve::*;
pub use workspaces::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
