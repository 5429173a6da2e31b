//! Middleware modules for the Fairlist API
//!
//! - `auth`: bearer token verification and role guards
//!
//! # Middleware Order
//!
//! ```ignore
//! Router::new()
//!     .route("/api/lists/upload", post(handler))
//!     // Role guard reads the AuthContext, so it sits inside auth
//!     .layer(middleware::from_fn(require_admin))
//!     .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
//! ```

mod auth;

pub use auth::{
    auth_middleware, extract_auth_context, require_admin, require_agent, AuthExtractor,
    AuthMiddlewareState,
};
