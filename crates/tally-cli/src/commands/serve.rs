//! Server command implementation

use std::path::Path;

use anyhow::Result;
use tally_core::AnalyticsConfig;
use tally_server::ServerConfig;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    analytics: AnalyticsConfig,
    allowed_origins: Vec<String>,
) -> Result<()> {
    println!("🚀 Starting Tally web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);

    let allowed_origins: Vec<String> = allowed_origins
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if allowed_origins.is_empty() {
        println!("   CORS: same-origin only");
    } else {
        println!("   CORS: {}", allowed_origins.join(", "));
    }

    let db = open_db(db_path)?;
    let config = ServerConfig { allowed_origins };

    tally_server::serve(db, host, port, analytics, config).await
}
