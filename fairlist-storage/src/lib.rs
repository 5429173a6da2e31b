//! Fairlist Storage - Store Trait and In-Memory Implementation
//!
//! Defines the storage abstraction for recipients and distributed entries,
//! plus the pipeline stages that need it: persisted-store deduplication,
//! the distribution summary and the retroactive cleanup. The Postgres
//! implementation lives in fairlist-api.

pub mod async_trait;
pub mod cleanup;
pub mod filter;
pub mod summary;

pub use async_trait::{BatchSummary, EntryFilter, ListStore, RecipientBatchCount, RecipientUpdate};
pub use cleanup::cleanup_duplicates;
pub use filter::filter_persisted;
pub use summary::build_summary;

use ::async_trait::async_trait;
use fairlist_core::{
    BatchId, DistributionIdentity, EntityId, ListEntry, Recipient, RecipientPool, StorageError,
    StorageResult,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

// ============================================================================
// MEMORY STORE
// ============================================================================

/// In-memory store for tests and `--dev` runs.
///
/// Clones share the same underlying maps.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    recipients: Arc<RwLock<HashMap<EntityId, Recipient>>>,
    entries: Arc<RwLock<Vec<ListEntry>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored data.
    pub fn clear(&self) -> StorageResult<()> {
        write(&self.recipients)?.clear();
        write(&self.entries)?.clear();
        Ok(())
    }

    /// Get count of stored recipients (active or not).
    pub fn recipient_count(&self) -> StorageResult<usize> {
        Ok(read(&self.recipients)?.len())
    }

    /// Snapshot of every stored entry in insertion order.
    pub fn all_entries(&self) -> StorageResult<Vec<ListEntry>> {
        Ok(read(&self.entries)?.clone())
    }
}

fn read<T>(lock: &RwLock<T>) -> StorageResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| StorageError::LockPoisoned)
}

fn write<T>(lock: &RwLock<T>) -> StorageResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| StorageError::LockPoisoned)
}

fn entry_matches_identity(entry: &ListEntry, identity: &DistributionIdentity) -> bool {
    let stored = DistributionIdentity::new(&entry.name, &entry.phone, &entry.note);
    stored.name == identity.name
        || stored.phone == identity.phone
        || (identity.has_note() && stored.note == identity.note)
}

#[async_trait]
impl ListStore for MemoryStore {
    async fn recipient_insert(&self, recipient: &Recipient) -> StorageResult<()> {
        let mut recipients = write(&self.recipients)?;
        if recipients.contains_key(&recipient.id) {
            return Err(StorageError::AlreadyExists {
                entity: "recipient",
                reason: format!("id {} already stored", recipient.id),
            });
        }
        recipients.insert(recipient.id, recipient.clone());
        Ok(())
    }

    async fn recipient_get(&self, id: EntityId) -> StorageResult<Option<Recipient>> {
        Ok(read(&self.recipients)?.get(&id).cloned())
    }

    async fn recipient_update(
        &self,
        id: EntityId,
        update: &RecipientUpdate,
    ) -> StorageResult<Recipient> {
        let mut recipients = write(&self.recipients)?;
        let recipient = recipients.get_mut(&id).ok_or(StorageError::NotFound {
            entity: "recipient",
            id,
        })?;
        update.apply(recipient);
        Ok(recipient.clone())
    }

    async fn recipient_list_active(&self, pool: RecipientPool) -> StorageResult<Vec<Recipient>> {
        let recipients = read(&self.recipients)?;
        let mut active: Vec<Recipient> = recipients
            .values()
            .filter(|r| r.is_active && pool.contains(r))
            .cloned()
            .collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(active)
    }

    async fn recipient_find_by_email(
        &self,
        pool: RecipientPool,
        email: &str,
        active_only: bool,
    ) -> StorageResult<Option<Recipient>> {
        let recipients = read(&self.recipients)?;
        Ok(recipients
            .values()
            .find(|r| pool.contains(r) && r.email == email && (r.is_active || !active_only))
            .cloned())
    }

    async fn entries_insert(&self, new_entries: &[ListEntry]) -> StorageResult<()> {
        let mut entries = write(&self.entries)?;
        let existing: HashSet<EntityId> = entries.iter().map(|e| e.id).collect();
        if let Some(clash) = new_entries.iter().find(|e| existing.contains(&e.id)) {
            return Err(StorageError::AlreadyExists {
                entity: "list entry",
                reason: format!("id {} already stored", clash.id),
            });
        }
        entries.extend_from_slice(new_entries);
        Ok(())
    }

    async fn entry_find_collision(&self, identity: &DistributionIdentity) -> StorageResult<bool> {
        let entries = read(&self.entries)?;
        Ok(entries.iter().any(|e| entry_matches_identity(e, identity)))
    }

    async fn batch_counts(&self, batch_id: BatchId) -> StorageResult<Vec<RecipientBatchCount>> {
        let entries = read(&self.entries)?;
        let mut counts: Vec<RecipientBatchCount> = Vec::new();
        for entry in entries.iter().filter(|e| e.batch_id == batch_id) {
            match counts.iter_mut().find(|c| c.recipient == entry.recipient) {
                Some(count) => {
                    count.record_count += 1;
                    count.first_position = count.first_position.min(entry.position);
                }
                None => counts.push(RecipientBatchCount {
                    recipient: entry.recipient,
                    record_count: 1,
                    first_position: entry.position,
                }),
            }
        }
        counts.sort_by_key(|c| c.first_position);
        Ok(counts)
    }

    async fn entries_query(&self, filter: &EntryFilter) -> StorageResult<Vec<ListEntry>> {
        let entries = read(&self.entries)?;
        let mut matched: Vec<ListEntry> = entries.iter().filter(|e| filter.matches(e)).cloned().collect();
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.batch_id.cmp(&a.batch_id))
                .then(a.position.cmp(&b.position))
        });
        Ok(matched)
    }

    async fn batches_list(&self, filter: &EntryFilter) -> StorageResult<Vec<BatchSummary>> {
        let entries = read(&self.entries)?;
        let mut batches: HashMap<BatchId, BatchSummary> = HashMap::new();
        for entry in entries.iter().filter(|e| filter.matches(e)) {
            batches
                .entry(entry.batch_id)
                .and_modify(|b| {
                    b.record_count += 1;
                    if entry.created_at < b.uploaded_at {
                        b.uploaded_at = entry.created_at;
                    }
                })
                .or_insert(BatchSummary {
                    batch_id: entry.batch_id,
                    uploader: entry.uploader,
                    record_count: 1,
                    uploaded_at: entry.created_at,
                });
        }
        let mut batches: Vec<BatchSummary> = batches.into_values().collect();
        batches.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then(b.batch_id.cmp(&a.batch_id))
        });
        Ok(batches)
    }

    async fn entries_oldest_first(&self) -> StorageResult<Vec<ListEntry>> {
        let mut entries = read(&self.entries)?.clone();
        entries.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.position.cmp(&b.position))
                .then(a.id.cmp(&b.id))
        });
        Ok(entries)
    }

    async fn entries_delete(&self, ids: &[EntityId]) -> StorageResult<u64> {
        let ids: HashSet<&EntityId> = ids.iter().collect();
        let mut entries = write(&self.entries)?;
        let before = entries.len();
        entries.retain(|e| !ids.contains(&e.id));
        Ok((before - entries.len()) as u64)
    }

    async fn entries_count(&self) -> StorageResult<u64> {
        Ok(read(&self.entries)?.len() as u64)
    }

    async fn health_check(&self) -> StorageResult<bool> {
        Ok(true)
    }
}

// ============================================================================
// TESTS
// ============================================================================
