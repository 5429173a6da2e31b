//! Error types for Fairlist operations

use crate::RecipientPool;
use thiserror::Error;
use uuid::Uuid;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("{entity} not found with id {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{entity} already exists: {reason}")]
    AlreadyExists { entity: &'static str, reason: String },

    #[error("Query failed during {operation}: {reason}")]
    QueryFailed { operation: &'static str, reason: String },

    #[error("Storage call {operation} timed out")]
    Timeout { operation: &'static str },

    #[error("Storage unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Required field of a candidate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredField {
    Name,
    Phone,
}

impl RequiredField {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequiredField::Name => "name",
            RequiredField::Phone => "phone",
        }
    }

    /// Column label shown to the person fixing the file.
    pub fn column_label(&self) -> &'static str {
        match self {
            RequiredField::Name => "FirstName",
            RequiredField::Phone => "Phone",
        }
    }
}

impl std::fmt::Display for RequiredField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the upload pipeline. All of them end the current upload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("Invalid file format '{extension}'. Only CSV, XLSX, and XLS files are allowed")]
    UnsupportedFormat { extension: String },

    #[error("File is {size} bytes, larger than the {limit} byte limit")]
    InputTooLarge { size: usize, limit: usize },

    #[error("Could not parse file: {reason}")]
    Parse { reason: String },

    #[error("File is empty or contains no valid records")]
    EmptyInput,

    /// `row_index` is 1-based over data rows.
    #[error("Row {row_index}: {} is required", .field.column_label())]
    Validation { row_index: usize, field: RequiredField },

    #[error("No active {pool} found. Please create {pool} first.")]
    NoActiveRecipients { pool: RecipientPool },

    #[error("All records in the file already exist. No new records to add.")]
    AllDuplicates { duplicates_removed: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias for pipeline operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
