//! Fairlist API - REST Layer
//!
//! Axum service for uploading contact lists, distributing their records
//! across agents or sub-agents, and managing the people who receive them.
//! Storage is Postgres (deadpool-postgres) in production and the in-memory
//! store from fairlist-storage in dev mode and tests.

mod macros;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use auth::{
    authenticate, generate_jwt_token, validate_jwt_token, AuthConfig, AuthContext, Claims, Role,
};
pub use config::ApiConfig;
pub use db::{DbClient, DbConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{auth_middleware, extract_auth_context, AuthMiddlewareState};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use state::{AppState, SharedStore};
pub use types::*;
