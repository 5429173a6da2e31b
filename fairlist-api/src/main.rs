//! Fairlist API Server Entry Point
//!
//! Bootstraps configuration, opens the store and starts the Axum HTTP server.
//! Pass `--dev` (or set `FAIRLIST_DEV=1`) to run against an in-memory store.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use fairlist_api::telemetry::{init_tracing, LogFormat};
use fairlist_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, AuthConfig, DbClient, DbConfig,
    SharedStore,
};
use fairlist_storage::MemoryStore;

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(LogFormat::from_env())?;

    let api_config = ApiConfig::from_env();
    let auth_config = AuthConfig::from_env();

    let store: SharedStore = if dev_mode() {
        tracing::warn!("Running with the in-memory store; nothing will be persisted");
        Arc::new(MemoryStore::new())
    } else {
        let db_config = DbConfig::from_env();
        let db = DbClient::from_config(&db_config)?;
        db.migrate().await?;
        Arc::new(db)
    };

    let state = AppState::new(store, api_config);
    let app: Router = create_api_router(state, auth_config)?;

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "Starting Fairlist API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

fn dev_mode() -> bool {
    std::env::args().any(|arg| arg == "--dev")
        || std::env::var("FAIRLIST_DEV")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("FAIRLIST_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("FAIRLIST_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

    let addr = format!("{}:{}", host, port);
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::invalid_input(format!("Invalid bind address {}: {}", addr, e)))
}
