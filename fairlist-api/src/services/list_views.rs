//! List View Service
//!
//! Shapes stored entries into the grouped views the dashboards show.
//! Groups keep the order in which their first entry appears, so a
//! newest-first input yields newest-first groups.

use std::collections::HashMap;

use fairlist_core::{BatchId, EntityId, ListEntry, Recipient, StorageResult, UploaderRef};
use fairlist_storage::{BatchSummary, ListStore};

use crate::types::{
    BatchDetails, BatchTasks, EntryView, RecipientLists, ADMIN_UPLOADER_LABEL,
    UNKNOWN_UPLOADER_LABEL,
};

/// Memoized recipient lookups for one request.
pub struct RecipientCache<'a> {
    store: &'a dyn ListStore,
    resolved: HashMap<EntityId, Option<Recipient>>,
}

impl<'a> RecipientCache<'a> {
    pub fn new(store: &'a dyn ListStore) -> Self {
        Self {
            store,
            resolved: HashMap::new(),
        }
    }

    pub async fn get(&mut self, id: EntityId) -> StorageResult<Option<Recipient>> {
        if let Some(hit) = self.resolved.get(&id) {
            return Ok(hit.clone());
        }
        let recipient = self.store.recipient_get(id).await?;
        self.resolved.insert(id, recipient.clone());
        Ok(recipient)
    }

    /// Display label for whoever uploaded a batch.
    pub async fn uploader_label(&mut self, uploader: UploaderRef) -> StorageResult<String> {
        match uploader {
            UploaderRef::Admin(_) => Ok(ADMIN_UPLOADER_LABEL.to_string()),
            UploaderRef::Agent(id) => Ok(self
                .get(id)
                .await?
                .map(|agent| {
                    if agent.name.trim().is_empty() {
                        agent.email
                    } else {
                        agent.name
                    }
                })
                .unwrap_or_else(|| UNKNOWN_UPLOADER_LABEL.to_string())),
        }
    }
}

/// Group entries under their recipient. Entries whose recipient no longer
/// exists are left out.
pub async fn group_by_recipient(
    store: &dyn ListStore,
    entries: &[ListEntry],
) -> StorageResult<Vec<RecipientLists>> {
    let mut cache = RecipientCache::new(store);
    let mut groups: Vec<RecipientLists> = Vec::new();
    let mut index: HashMap<EntityId, usize> = HashMap::new();

    for entry in entries {
        let recipient_id = entry.recipient.id();
        let slot = match index.get(&recipient_id) {
            Some(&slot) => slot,
            None => {
                let Some(recipient) = cache.get(recipient_id).await? else {
                    tracing::debug!(entry_id = %entry.id, %recipient_id, "Entry recipient missing");
                    continue;
                };
                groups.push(RecipientLists {
                    recipient,
                    lists: Vec::new(),
                });
                index.insert(recipient_id, groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[slot].lists.push(EntryView::from(entry));
    }

    Ok(groups)
}

/// Group entries by batch, labelling each with its uploader.
pub async fn group_by_batch(
    store: &dyn ListStore,
    entries: &[ListEntry],
) -> StorageResult<Vec<BatchTasks>> {
    let mut cache = RecipientCache::new(store);
    let mut groups: Vec<BatchTasks> = Vec::new();
    let mut index: HashMap<BatchId, usize> = HashMap::new();

    for entry in entries {
        let slot = match index.get(&entry.batch_id) {
            Some(&slot) => slot,
            None => {
                groups.push(BatchTasks {
                    batch_id: entry.batch_id,
                    uploaded_by: cache.uploader_label(entry.uploader).await?,
                    uploaded_at: entry.created_at,
                    tasks: Vec::new(),
                });
                index.insert(entry.batch_id, groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[slot].tasks.push(EntryView::from(entry));
    }

    Ok(groups)
}

/// Attach uploader labels to batch summaries.
pub async fn batch_details(
    store: &dyn ListStore,
    summaries: Vec<BatchSummary>,
) -> StorageResult<Vec<BatchDetails>> {
    let mut cache = RecipientCache::new(store);
    let mut details = Vec::with_capacity(summaries.len());
    for summary in summaries {
        details.push(BatchDetails {
            batch_id: summary.batch_id,
            record_count: summary.record_count,
            uploaded_by: cache.uploader_label(summary.uploader).await?,
            uploaded_at: summary.uploaded_at,
        });
    }
    Ok(details)
}
