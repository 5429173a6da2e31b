//! List view and upload result types

use fairlist_core::{
    BatchId, CleanupReport, EntityId, ListEntry, Recipient, Timestamp, UploadReport,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message returned with a successful upload.
pub const UPLOAD_SUCCESS_MESSAGE: &str = "File uploaded and distributed successfully";

/// Message returned with a cleanup report.
pub const CLEANUP_SUCCESS_MESSAGE: &str = "Database cleanup completed successfully";

/// Label for batches uploaded by an admin.
pub const ADMIN_UPLOADER_LABEL: &str = "Admin";

/// Label for an uploader that can no longer be resolved.
pub const UNKNOWN_UPLOADER_LABEL: &str = "Unknown";

/// Upload result as returned by both upload routes.
pub type UploadResponse = UploadReport;

/// Query parameters for `GET /api/lists`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct AdminListsQuery {
    /// Only entries from this batch
    pub batch_id: Option<Uuid>,
    /// Only entries assigned to this agent
    pub agent_id: Option<Uuid>,
}

/// Query parameters for `GET /api/lists/my-uploads`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct MyUploadsQuery {
    /// Only entries from this batch
    pub batch_id: Option<Uuid>,
}

/// One distributed entry as shown in list views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub id: EntityId,
    pub name: String,
    pub phone: String,
    pub note: String,
    pub batch_id: BatchId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

impl From<&ListEntry> for EntryView {
    fn from(entry: &ListEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name.clone(),
            phone: entry.phone.clone(),
            note: entry.note.clone(),
            batch_id: entry.batch_id,
            created_at: entry.created_at,
        }
    }
}

/// Entries grouped under the agent or sub-agent that received them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RecipientLists {
    pub recipient: Recipient,
    pub lists: Vec<EntryView>,
}

/// An agent's tasks from one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct BatchTasks {
    pub batch_id: BatchId,
    pub uploaded_by: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub uploaded_at: Timestamp,
    pub tasks: Vec<EntryView>,
}

/// One upload batch with its size and origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct BatchDetails {
    pub batch_id: BatchId,
    pub record_count: u64,
    pub uploaded_by: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub uploaded_at: Timestamp,
}

/// Cleanup report in its wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CleanupResponse {
    pub total_records: u64,
    pub duplicates_removed: u64,
    pub remaining_records: u64,
}

impl From<CleanupReport> for CleanupResponse {
    fn from(report: CleanupReport) -> Self {
        Self {
            total_records: report.total_scanned,
            duplicates_removed: report.duplicates_removed,
            remaining_records: report.remaining,
        }
    }
}
