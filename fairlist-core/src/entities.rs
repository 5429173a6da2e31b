//! Core entity structures

use crate::{BatchId, EntityId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A parsed, not-yet-persisted row pending validation and deduplication.
///
/// Fields are raw cell values: untrimmed and possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CandidateRecord {
    pub name: String,
    pub phone: String,
    pub note: String,
}

impl CandidateRecord {
    pub fn new(name: impl Into<String>, phone: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            note: note.into(),
        }
    }
}

/// Discriminator for the two recipient tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub enum RecipientKind {
    Agent,
    SubAgent,
}

impl RecipientKind {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            RecipientKind::Agent => "agent",
            RecipientKind::SubAgent => "sub_agent",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "agent" => Some(RecipientKind::Agent),
            "sub_agent" => Some(RecipientKind::SubAgent),
            _ => None,
        }
    }
}

/// The recipient an entry was assigned to. Exactly one variant is ever set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum RecipientRef {
    // Spelled as `Uuid` so the schema derive resolves it as a uuid string.
    Agent(Uuid),
    SubAgent(Uuid),
}

impl RecipientRef {
    pub fn new(kind: RecipientKind, id: EntityId) -> Self {
        match kind {
            RecipientKind::Agent => RecipientRef::Agent(id),
            RecipientKind::SubAgent => RecipientRef::SubAgent(id),
        }
    }

    pub fn id(&self) -> EntityId {
        match self {
            RecipientRef::Agent(id) | RecipientRef::SubAgent(id) => *id,
        }
    }

    pub fn kind(&self) -> RecipientKind {
        match self {
            RecipientRef::Agent(_) => RecipientKind::Agent,
            RecipientRef::SubAgent(_) => RecipientKind::SubAgent,
        }
    }
}

/// Account type of whoever uploaded a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub enum UploaderKind {
    Admin,
    Agent,
}

impl UploaderKind {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            UploaderKind::Admin => "admin",
            UploaderKind::Agent => "agent",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(UploaderKind::Admin),
            "agent" => Some(UploaderKind::Agent),
            _ => None,
        }
    }
}

/// Identity of the uploader, stored verbatim on every entry of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum UploaderRef {
    Admin(Uuid),
    Agent(Uuid),
}

impl UploaderRef {
    pub fn new(kind: UploaderKind, id: EntityId) -> Self {
        match kind {
            UploaderKind::Admin => UploaderRef::Admin(id),
            UploaderKind::Agent => UploaderRef::Agent(id),
        }
    }

    pub fn id(&self) -> EntityId {
        match self {
            UploaderRef::Admin(id) | UploaderRef::Agent(id) => *id,
        }
    }

    pub fn kind(&self) -> UploaderKind {
        match self {
            UploaderRef::Admin(_) => UploaderKind::Admin,
            UploaderRef::Agent(_) => UploaderKind::Agent,
        }
    }
}

/// An agent or sub-agent that can receive distributed records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub id: EntityId,
    pub kind: RecipientKind,
    pub name: String,
    pub email: String,
    pub mobile_number: String,
    /// Owning agent; set for sub-agents only.
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub parent_agent_id: Option<EntityId>,
    pub is_active: bool,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

impl Recipient {
    pub fn reference(&self) -> RecipientRef {
        RecipientRef::new(self.kind, self.id)
    }
}

/// Which recipients take part in a distribution round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipientPool {
    /// Every active agent (admin uploads).
    Agents,
    /// Active sub-agents owned by one agent (agent uploads).
    SubAgentsOf(EntityId),
}

impl RecipientPool {
    pub fn kind(&self) -> RecipientKind {
        match self {
            RecipientPool::Agents => RecipientKind::Agent,
            RecipientPool::SubAgentsOf(_) => RecipientKind::SubAgent,
        }
    }

    /// Whether `recipient` belongs to this pool, ignoring its active flag.
    pub fn contains(&self, recipient: &Recipient) -> bool {
        match self {
            RecipientPool::Agents => recipient.kind == RecipientKind::Agent,
            RecipientPool::SubAgentsOf(parent) => {
                recipient.kind == RecipientKind::SubAgent
                    && recipient.parent_agent_id == Some(*parent)
            }
        }
    }
}

impl fmt::Display for RecipientPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipientPool::Agents => write!(f, "agents"),
            RecipientPool::SubAgentsOf(_) => write!(f, "sub-agents"),
        }
    }
}

/// A persisted, distributed contact record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ListEntry {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub id: EntityId,
    pub name: String,
    pub phone: String,
    pub note: String,
    pub recipient: RecipientRef,
    pub uploader: UploaderRef,
    pub batch_id: BatchId,
    /// Index of this entry within its batch, in distribution order.
    pub position: i32,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

/// Count of entries one recipient received in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RecipientCount {
    pub recipient_name: String,
    pub recipient_email: String,
    pub record_count: u64,
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    pub batch_id: BatchId,
    pub total_records: usize,
    pub recipients_count: usize,
    pub duplicates_removed: usize,
    pub distribution_summary: Vec<RecipientCount>,
}

/// Outcome of a store-wide duplicate purge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub total_scanned: u64,
    pub duplicates_removed: u64,
    pub remaining: u64,
}
