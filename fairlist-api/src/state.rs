//! Shared application state for Axum routers.

use std::sync::Arc;

use fairlist_storage::ListStore;
use tokio::sync::Mutex;

use crate::config::ApiConfig;

/// Store handle shared by every route.
pub type SharedStore = Arc<dyn ListStore>;

/// Serializes uploads from the persisted-store check through the insert.
pub type UploadGate = Arc<Mutex<()>>;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Postgres in production, `MemoryStore` in dev mode and tests.
    pub store: SharedStore,
    pub upload_gate: UploadGate,
    pub config: Arc<ApiConfig>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(store: SharedStore, config: ApiConfig) -> Self {
        Self {
            store,
            upload_gate: Arc::new(Mutex::new(())),
            config: Arc::new(config),
            start_time: std::time::Instant::now(),
        }
    }
}

crate::impl_from_ref!(SharedStore, store);
crate::impl_from_ref!(UploadGate, upload_gate);
crate::impl_from_ref!(Arc<ApiConfig>, config);
crate::impl_from_ref!(std::time::Instant, start_time);
