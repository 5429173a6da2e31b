//! REST API Routes Module
//!
//! Route assembly for the Fairlist API:
//! - `/api/lists/*` uploads, list views and duplicate cleanup
//! - `/api/agents/*` agent management (admin)
//! - `/api/sub-agents/*` sub-agent management (agent)
//! - `/health/*` liveness and readiness (public)

pub mod agents;
pub mod health;
pub mod lists;
pub mod sub_agents;

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::AuthConfig;
use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::middleware::{auth_middleware, AuthMiddlewareState};
use crate::state::AppState;

#[cfg(feature = "openapi")]
use axum::{response::IntoResponse, routing::get, Json};
#[cfg(feature = "openapi")]
use utoipa::OpenApi;

/// Handler for /openapi.json endpoint.
#[cfg(feature = "openapi")]
async fn openapi_json() -> impl IntoResponse {
    Json(crate::openapi::ApiDoc::openapi())
}

/// Build the CORS layer from ApiConfig.
///
/// In development mode (empty origins), allows all origins.
/// In production mode, only allows configured origins.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: Development mode - allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS: Restricting origins");
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

/// Create the complete API router.
///
/// Every `/api/*` route sits behind `auth_middleware`; the role guards are
/// applied per route group. In production the auth configuration is
/// validated before anything is built.
pub fn create_api_router(state: AppState, auth_config: AuthConfig) -> ApiResult<Router> {
    if auth_config.is_production() {
        auth_config.validate_for_production()?;
    }

    let auth_state = AuthMiddlewareState::new(auth_config);
    let api = Router::new()
        .nest("/lists", lists::create_router(state.config.max_upload_bytes))
        .nest("/agents", agents::create_router())
        .nest("/sub-agents", sub_agents::create_router())
        .layer(from_fn_with_state(auth_state, auth_middleware));

    #[allow(unused_mut)]
    let mut router = Router::new()
        .nest("/api", api)
        .nest("/health", health::create_router());

    #[cfg(feature = "openapi")]
    {
        router = router.route("/openapi.json", get(openapi_json));
    }

    let cors = build_cors_layer(&state.config);
    Ok(router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{generate_jwt_token, Role};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use fairlist_core::new_entity_id;
    use fairlist_storage::MemoryStore;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_router() -> (Router, AuthConfig) {
        let state = AppState::new(Arc::new(MemoryStore::new()), ApiConfig::default());
        let auth = AuthConfig::default();
        let router = create_api_router(state, auth.clone()).unwrap();
        (router, auth)
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let (router, _) = test_router();
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_with_memory_store() {
        let (router, _) = test_router();
        let response = router
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_requires_token() {
        let (router, _) = test_router();
        let response = router
            .oneshot(Request::get("/api/agents").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_agent_cannot_manage_agents() {
        let (router, auth) = test_router();
        let token = generate_jwt_token(&auth, new_entity_id(), Role::Agent, None).unwrap();
        let response = router
            .oneshot(
                Request::get("/api/agents")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_production_rejects_default_secret() {
        let state = AppState::new(Arc::new(MemoryStore::new()), ApiConfig::default());
        let auth = AuthConfig {
            environment: "production".to_string(),
            ..AuthConfig::default()
        };
        assert!(create_api_router(state, auth).is_err());
    }
}
