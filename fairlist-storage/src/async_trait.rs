//! Async storage trait for the list store.
//!
//! Every pipeline stage that needs persisted state goes through
//! [`ListStore`], so the same code runs against Postgres in production and
//! against [`crate::MemoryStore`] in tests.

use ::async_trait::async_trait;
use fairlist_core::{
    BatchId, DistributionIdentity, EntityId, ListEntry, Recipient, RecipientPool, RecipientRef,
    StorageResult, Timestamp, UploaderKind, UploaderRef,
};

/// Partial update for a recipient. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile_number: Option<String>,
    pub is_active: Option<bool>,
}

impl RecipientUpdate {
    /// Soft delete.
    pub fn deactivate() -> Self {
        Self {
            is_active: Some(false),
            ..Self::default()
        }
    }

    pub fn apply(&self, recipient: &mut Recipient) {
        if let Some(name) = &self.name {
            recipient.name = name.clone();
        }
        if let Some(email) = &self.email {
            recipient.email = email.clone();
        }
        if let Some(mobile_number) = &self.mobile_number {
            recipient.mobile_number = mobile_number.clone();
        }
        if let Some(is_active) = self.is_active {
            recipient.is_active = is_active;
        }
    }
}

/// Conjunctive filter over persisted entries. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub batch_id: Option<BatchId>,
    pub recipient: Option<RecipientRef>,
    pub uploader_kind: Option<UploaderKind>,
    pub uploader_id: Option<EntityId>,
}

impl EntryFilter {
    /// Entries uploaded by any admin.
    pub fn admin_uploads() -> Self {
        Self {
            uploader_kind: Some(UploaderKind::Admin),
            ..Self::default()
        }
    }

    /// Entries uploaded by one specific uploader.
    pub fn uploaded_by(uploader: UploaderRef) -> Self {
        Self {
            uploader_kind: Some(uploader.kind()),
            uploader_id: Some(uploader.id()),
            ..Self::default()
        }
    }

    /// Entries assigned to one recipient.
    pub fn assigned_to(recipient: RecipientRef) -> Self {
        Self {
            recipient: Some(recipient),
            ..Self::default()
        }
    }

    pub fn with_batch(mut self, batch_id: Option<BatchId>) -> Self {
        self.batch_id = batch_id;
        self
    }

    pub fn with_recipient(mut self, recipient: Option<RecipientRef>) -> Self {
        if recipient.is_some() {
            self.recipient = recipient;
        }
        self
    }

    pub fn matches(&self, entry: &ListEntry) -> bool {
        self.batch_id.map_or(true, |b| entry.batch_id == b)
            && self.recipient.map_or(true, |r| entry.recipient == r)
            && self.uploader_kind.map_or(true, |k| entry.uploader.kind() == k)
            && self.uploader_id.map_or(true, |id| entry.uploader.id() == id)
    }
}

/// How many entries one recipient received in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipientBatchCount {
    pub recipient: RecipientRef,
    pub record_count: u64,
    /// Smallest `position` the recipient holds in the batch.
    pub first_position: i32,
}

/// One upload, as seen from the entries it produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub batch_id: BatchId,
    pub uploader: UploaderRef,
    pub record_count: u64,
    pub uploaded_at: Timestamp,
}

/// Async storage trait for recipients and distributed entries.
#[async_trait]
pub trait ListStore: Send + Sync {
    // ========================================================================
    // RECIPIENT OPERATIONS
    // ========================================================================

    /// Insert a new agent or sub-agent.
    async fn recipient_insert(&self, recipient: &Recipient) -> StorageResult<()>;

    /// Get a recipient by ID regardless of its active flag.
    async fn recipient_get(&self, id: EntityId) -> StorageResult<Option<Recipient>>;

    /// Apply `update` and return the updated recipient.
    async fn recipient_update(
        &self,
        id: EntityId,
        update: &RecipientUpdate,
    ) -> StorageResult<Recipient>;

    /// Active members of `pool`, ordered by `created_at` then id.
    async fn recipient_list_active(&self, pool: RecipientPool) -> StorageResult<Vec<Recipient>>;

    /// Find a member of `pool` by exact email.
    async fn recipient_find_by_email(
        &self,
        pool: RecipientPool,
        email: &str,
        active_only: bool,
    ) -> StorageResult<Option<Recipient>>;

    // ========================================================================
    // ENTRY OPERATIONS
    // ========================================================================

    /// Persist a distributed batch. All entries are written or none are.
    async fn entries_insert(&self, entries: &[ListEntry]) -> StorageResult<()>;

    /// Whether any stored entry matches `identity` on name, phone, or a
    /// non-empty note (already normalized).
    async fn entry_find_collision(&self, identity: &DistributionIdentity) -> StorageResult<bool>;

    /// Per-recipient counts for one batch, ordered by first position.
    async fn batch_counts(&self, batch_id: BatchId) -> StorageResult<Vec<RecipientBatchCount>>;

    /// Entries matching `filter`, newest first (position order within a batch).
    async fn entries_query(&self, filter: &EntryFilter) -> StorageResult<Vec<ListEntry>>;

    /// Batches whose entries match `filter`, newest first.
    async fn batches_list(&self, filter: &EntryFilter) -> StorageResult<Vec<BatchSummary>>;

    /// Every entry ordered by `created_at`, then `position`, then id.
    async fn entries_oldest_first(&self) -> StorageResult<Vec<ListEntry>>;

    /// Delete entries by ID, returning how many were removed.
    async fn entries_delete(&self, ids: &[EntityId]) -> StorageResult<u64>;

    /// Total number of stored entries.
    async fn entries_count(&self) -> StorageResult<u64>;

    // ========================================================================
    // HEALTH & DIAGNOSTICS
    // ========================================================================

    /// Check if the storage backend is healthy.
    async fn health_check(&self) -> StorageResult<bool>;
}
