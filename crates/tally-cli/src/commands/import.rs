//! CSV import command

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use tally_core::db::Database;
use tally_core::{import_csv, ImportSummary};

pub fn cmd_import(
    db: &Database,
    workspace: &str,
    account: &str,
    file: &Path,
) -> Result<ImportSummary> {
    let ws = db.find_workspace(workspace)?;
    let account = db.find_account(ws.id, account)?;

    println!("📥 Importing {} into {}/{}...", file.display(), ws.name, account.name);

    let reader =
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let summary = import_csv(db, &ws, account.id, reader)?;

    println!("   Imported:   {}", summary.imported);
    println!("   Duplicates: {}", summary.duplicates);
    if !summary.skipped.is_empty() {
        println!("   Skipped:    {}", summary.skipped.len());
        for row in &summary.skipped {
            println!("     line {}: {}", row.line, row.reason);
        }
    }
    println!("✅ Import complete");

    Ok(summary)
}
