//! Tracing Subscriber Initialization
//!
//! Logs go to stdout, human readable by default or as JSON lines with
//! `FAIRLIST_LOG_FORMAT=json`. Filtering follows `RUST_LOG`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

const DEFAULT_FILTER: &str = "fairlist_api=debug,fairlist_storage=debug,tower_http=debug,info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// Read `FAIRLIST_LOG_FORMAT`; anything but `json` means pretty.
    pub fn from_env() -> Self {
        match std::env::var("FAIRLIST_LOG_FORMAT") {
            Ok(value) => Self::parse(&value),
            Err(_) => Self::default(),
        }
    }

    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Install the global tracing subscriber. Call once at startup.
pub fn init_tracing(format: LogFormat) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).try_init(),
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_version = env!("CARGO_PKG_VERSION"),
        ?format,
        "Tracing initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("whatever"), LogFormat::Pretty);
    }
}
