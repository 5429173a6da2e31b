//! Axum Middleware for Authentication and Authorization
//!
//! `auth_middleware` verifies the `Authorization: Bearer` token and injects
//! an [`AuthContext`] into request extensions. Unauthenticated requests get
//! 401. The role guards run after it and return 403 for the wrong role.

use crate::auth::{authenticate, AuthConfig, AuthContext};
use crate::error::{ApiError, ApiResult};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

// ============================================================================
// MIDDLEWARE STATE
// ============================================================================

/// Shared state for authentication middleware.
#[derive(Debug, Clone)]
pub struct AuthMiddlewareState {
    pub auth_config: Arc<AuthConfig>,
}

impl AuthMiddlewareState {
    pub fn new(auth_config: AuthConfig) -> Self {
        Self {
            auth_config: Arc::new(auth_config),
        }
    }
}

// ============================================================================
// MIDDLEWARE FUNCTIONS
// ============================================================================

/// Verify the bearer token and inject the caller's [`AuthContext`].
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let auth_context = authenticate(&state.auth_config, auth_header)?;
    tracing::debug!(user_id = %auth_context.user_id, role = %auth_context.role, "Authenticated request");

    request.extensions_mut().insert(auth_context);
    Ok(next.run(request).await)
}

/// Allow only admins through.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    extract_auth_context(&request)?.require_admin()?;
    Ok(next.run(request).await)
}

/// Allow only agents through.
pub async fn require_agent(request: Request, next: Next) -> Result<Response, ApiError> {
    extract_auth_context(&request)?.require_agent()?;
    Ok(next.run(request).await)
}

// ============================================================================
// TYPED EXTRACTOR
// ============================================================================

/// Handler-side access to the authenticated caller.
///
/// `auth_middleware` must be applied to the route; without it extraction
/// fails with 500.
#[derive(Debug, Clone)]
pub struct AuthExtractor(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for AuthExtractor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthExtractor)
            .ok_or_else(|| {
                ApiError::internal_error(
                    "AuthContext not found in request extensions. \
                     Ensure auth_middleware is applied to this route.",
                )
            })
    }
}

impl std::ops::Deref for AuthExtractor {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Extract AuthContext from request extensions.
pub fn extract_auth_context(request: &Request) -> ApiResult<&AuthContext> {
    request
        .extensions()
        .get::<AuthContext>()
        .ok_or_else(|| ApiError::unauthorized("Auth context missing from request"))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{generate_jwt_token, JwtSecret, Role};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use fairlist_core::new_entity_id;
    use tower::ServiceExt;

    fn test_auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: JwtSecret::new("test_secret".to_string()).unwrap(),
            ..AuthConfig::default()
        }
    }

    fn token(role: Role) -> String {
        generate_jwt_token(&test_auth_config(), new_entity_id(), role, None).unwrap()
    }

    fn test_app() -> Router {
        let auth_state = AuthMiddlewareState::new(test_auth_config());

        let admin = Router::new()
            .route("/admin", get(|| async { "admin" }))
            .layer(middleware::from_fn(require_admin));
        let agent = Router::new()
            .route("/agent", get(|AuthExtractor(auth): AuthExtractor| async move {
                auth.user_id.to_string()
            }))
            .layer(middleware::from_fn(require_agent));

        admin
            .merge(agent)
            .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
    }

    async fn status(uri: &str, bearer: Option<String>) -> StatusCode {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        test_app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        assert_eq!(status("/admin", None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        assert_eq!(
            status("/admin", Some("not-a-jwt".into())).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_roles_reach_their_routes() {
        assert_eq!(status("/admin", Some(token(Role::Admin))).await, StatusCode::OK);
        assert_eq!(status("/agent", Some(token(Role::Agent))).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_wrong_role_is_forbidden() {
        assert_eq!(
            status("/admin", Some(token(Role::Agent))).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status("/agent", Some(token(Role::Admin))).await,
            StatusCode::FORBIDDEN
        );
    }
}
