//! API Configuration Module
//!
//! CORS and upload settings. Configuration is loaded from environment
//! variables with defaults suitable for development.

use fairlist_core::{IngestLimits, DEFAULT_MAX_INPUT_BYTES};
use fairlist_storage::filter::DEFAULT_LOOKUP_CONCURRENCY;
use std::path::PathBuf;

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for CORS and the upload pipeline.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    /// Example: "https://fairlist.example,https://admin.fairlist.example"
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Upload Configuration
    // ========================================================================
    /// Largest accepted upload in bytes.
    pub max_upload_bytes: usize,

    /// Directory uploads are spooled to while being processed.
    pub upload_dir: PathBuf,

    /// In-flight store lookups during persisted deduplication.
    pub lookup_concurrency: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,

            max_upload_bytes: DEFAULT_MAX_INPUT_BYTES,
            upload_dir: std::env::temp_dir(),
            lookup_concurrency: DEFAULT_LOOKUP_CONCURRENCY,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `FAIRLIST_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `FAIRLIST_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `FAIRLIST_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `FAIRLIST_MAX_UPLOAD_BYTES`: Upload ceiling (default: 10 MiB)
    /// - `FAIRLIST_UPLOAD_DIR`: Spool directory (default: system temp dir)
    /// - `FAIRLIST_LOOKUP_CONCURRENCY`: Concurrent duplicate lookups (default: 8)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_origins = std::env::var("FAIRLIST_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("FAIRLIST_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let cors_max_age_secs = std::env::var("FAIRLIST_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        let max_upload_bytes = std::env::var("FAIRLIST_MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_upload_bytes);

        let upload_dir = std::env::var("FAIRLIST_UPLOAD_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.upload_dir);

        let lookup_concurrency = std::env::var("FAIRLIST_LOOKUP_CONCURRENCY")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.lookup_concurrency);

        Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
            max_upload_bytes,
            upload_dir,
            lookup_concurrency,
        }
    }

    /// Parser limits derived from the upload settings.
    pub fn ingest_limits(&self) -> IngestLimits {
        IngestLimits::with_max_input_bytes(self.max_upload_bytes)
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            // Dev mode: allow all
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Wildcard subdomains: *.fairlist.example
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain.ends_with(&format!(".{}", pattern))
                        || origin_domain == pattern;
                }
            }
            false
        })
    }
}
