//! Property-Based Tests for Authentication Enforcement
//!
//! Every `/api/*` route answers 401 unless the request carries a bearer
//! token signed with the configured secret, and 403 when the token's role
//! does not match the route group.

#[path = "support/app.rs"]
mod test_app_support;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use fairlist_api::auth::{generate_jwt_token, AuthConfig, JwtSecret, Role};
use fairlist_core::new_entity_id;
use fairlist_storage::MemoryStore;
use proptest::prelude::*;
use test_app_support::*;
use tower::ServiceExt;

const ADMIN_ROUTES: &[&str] = &["/api/lists", "/api/lists/batches", "/api/agents"];
const AGENT_ROUTES: &[&str] = &[
    "/api/lists/my-tasks",
    "/api/lists/my-uploads",
    "/api/lists/my-batches",
    "/api/sub-agents",
];

#[derive(Debug, Clone)]
enum AuthHeader {
    Valid(Role),
    /// Signed with a different secret
    ForeignSecret(Role),
    Garbage(String),
    NotBearer(String),
    None,
}

fn auth_header_strategy() -> impl Strategy<Value = AuthHeader> {
    let role = prop_oneof![Just(Role::Admin), Just(Role::Agent)];
    prop_oneof![
        role.clone().prop_map(AuthHeader::Valid),
        role.prop_map(AuthHeader::ForeignSecret),
        "[A-Za-z0-9._-]{0,40}".prop_map(AuthHeader::Garbage),
        "(Basic|Token) [A-Za-z0-9]{1,20}".prop_map(AuthHeader::NotBearer),
        Just(AuthHeader::None),
    ]
}

fn route_strategy() -> impl Strategy<Value = (&'static str, Role)> {
    prop_oneof![
        prop::sample::select(ADMIN_ROUTES).prop_map(|r| (r, Role::Admin)),
        prop::sample::select(AGENT_ROUTES).prop_map(|r| (r, Role::Agent)),
    ]
}

fn foreign_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: JwtSecret::new("some-other-secret-entirely-0123456789".to_string()).unwrap(),
        ..AuthConfig::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_authentication_enforcement(
        header in auth_header_strategy(),
        (route, required) in route_strategy(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let status = rt.block_on(async {
            let app = test_app(test_state(MemoryStore::new()));
            let mut builder = Request::get(route);
            match &header {
                AuthHeader::Valid(role) => {
                    builder = builder.header("authorization", bearer(new_entity_id(), *role));
                }
                AuthHeader::ForeignSecret(role) => {
                    let token =
                        generate_jwt_token(&foreign_config(), new_entity_id(), *role, None).unwrap();
                    builder = builder.header("authorization", format!("Bearer {}", token));
                }
                AuthHeader::Garbage(token) => {
                    builder = builder.header("authorization", format!("Bearer {}", token));
                }
                AuthHeader::NotBearer(value) => {
                    builder = builder.header("authorization", value.as_str());
                }
                AuthHeader::None => {}
            }
            app.oneshot(builder.body(Body::empty()).unwrap())
                .await
                .unwrap()
                .status()
        });

        match header {
            AuthHeader::Valid(role) if role == required => prop_assert_eq!(status, StatusCode::OK),
            AuthHeader::Valid(_) => prop_assert_eq!(status, StatusCode::FORBIDDEN),
            _ => prop_assert_eq!(status, StatusCode::UNAUTHORIZED),
        }
    }
}

#[cfg(test)]
mod edge_cases {
    use super::*;
    use fairlist_api::auth::FixedClock;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_expired_jwt_returns_401() {
        let issuer = AuthConfig {
            clock: Arc::new(FixedClock(1_000_000)),
            ..AuthConfig::default()
        };
        let token = generate_jwt_token(&issuer, new_entity_id(), Role::Admin, None).unwrap();

        let app = test_app(test_state(MemoryStore::new()));
        let response = app
            .oneshot(
                Request::get("/api/agents")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "TOKEN_EXPIRED");
    }

    #[tokio::test]
    async fn test_empty_bearer_token_returns_401() {
        let app = test_app(test_state(MemoryStore::new()));
        let response = app
            .oneshot(
                Request::get("/api/agents")
                    .header("authorization", "Bearer ")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
