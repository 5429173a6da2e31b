//! Service Layer
//!
//! Business logic the route handlers delegate to, kept free of HTTP
//! extraction so it can be driven directly from tests.

mod list_views;
mod recipient_service;
mod upload_service;

pub use list_views::*;
pub use recipient_service::*;
pub use upload_service::*;
