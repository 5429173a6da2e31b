//! Offline duplicate cleanup.
//!
//! Runs the same purge as `DELETE /api/lists/remove-duplicates` directly
//! against the database and prints the report as JSON.

use clap::Parser;
use fairlist_api::telemetry::{init_tracing, LogFormat};
use fairlist_api::{ApiError, ApiResult, CleanupResponse, DbClient, DbConfig};
use fairlist_storage::cleanup_duplicates;

#[derive(Debug, Parser)]
#[command(name = "fairlist-cleanup", about = "Remove duplicate list entries, keeping the oldest")]
struct Args {
    /// PostgreSQL host
    #[arg(long, env = "FAIRLIST_DB_HOST")]
    host: Option<String>,

    /// PostgreSQL port
    #[arg(long, env = "FAIRLIST_DB_PORT")]
    port: Option<u16>,

    /// Database name
    #[arg(long, env = "FAIRLIST_DB_NAME")]
    dbname: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ApiResult<()> {
    let args = Args::parse();
    init_tracing(if args.json_logs {
        LogFormat::Json
    } else {
        LogFormat::from_env()
    })?;

    let mut config = DbConfig::from_env();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(dbname) = args.dbname {
        config.dbname = dbname;
    }

    let db = DbClient::from_config(&config)?;
    let report = cleanup_duplicates(&db).await?;

    let json = serde_json::to_string_pretty(&CleanupResponse::from(report))
        .map_err(|e| ApiError::internal_error(format!("Failed to render report: {}", e)))?;
    println!("{}", json);
    Ok(())
}
