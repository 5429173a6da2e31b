//! Ingestion limits

/// Default upload ceiling (10 MiB).
pub const DEFAULT_MAX_INPUT_BYTES: usize = 10 * 1024 * 1024;

/// Limits applied by the parser regardless of what the transport enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestLimits {
    /// Largest accepted input, in bytes.
    pub max_input_bytes: usize,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }
}

impl IngestLimits {
    pub fn with_max_input_bytes(max_input_bytes: usize) -> Self {
        Self { max_input_bytes }
    }
}
