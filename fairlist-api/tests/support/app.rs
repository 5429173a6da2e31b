//! Router and request helpers shared by the API integration tests.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use fairlist_api::{
    auth::{generate_jwt_token, AuthConfig, Role},
    create_api_router, ApiConfig, AppState,
};
use fairlist_core::EntityId;
use fairlist_storage::MemoryStore;
use serde_json::Value;

pub const BOUNDARY: &str = "fairlist-test-boundary";

pub fn test_auth_config() -> AuthConfig {
    AuthConfig::default()
}

/// App state over `store` with default limits.
pub fn test_state(store: MemoryStore) -> AppState {
    AppState::new(Arc::new(store), ApiConfig::default())
}

/// The full router, as served by the binary.
pub fn test_app(state: AppState) -> Router {
    create_api_router(state, test_auth_config()).unwrap()
}

pub fn bearer(user_id: EntityId, role: Role) -> String {
    let token = generate_jwt_token(&test_auth_config(), user_id, role, None).unwrap();
    format!("Bearer {}", token)
}

/// A multipart body carrying one `file` field.
pub fn multipart_body(file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(uri: &str, auth: &str, file_name: &str, content: &[u8]) -> Request<Body> {
    Request::post(uri)
        .header("authorization", auth)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(file_name, content)))
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, auth: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", auth);
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
