//! Fairlist Core - Ingestion Pipeline
//!
//! Entity types plus the pure stages of the upload pipeline: parse,
//! validate, deduplicate within a batch, and distribute. Nothing in this
//! crate touches storage or the network; the store-backed stages live in
//! `fairlist-storage`.

// ============================================================================
// MODULES
// ============================================================================

mod config;
mod entities;
mod error;
mod identity;

pub mod dedup;
pub mod distribute;
pub mod parser;
pub mod validate;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use config::*;
pub use entities::*;
pub use error::*;
pub use identity::*;

pub use dedup::{dedup_batch, normalize, DedupOutcome, DistributionIdentity, IdentityTracker};
pub use distribute::{distribute, split_counts};
pub use parser::{parse_records, UploadFormat, NAME_ALIASES, NOTE_ALIASES, PHONE_ALIASES};
pub use validate::validate_records;
