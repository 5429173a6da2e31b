//! Retroactive duplicate cleanup
//!
//! Walks every stored entry oldest first and applies the same field-wise
//! OR-match as the upload path. The oldest member of each duplicate group
//! survives; everything after it is deleted.

use fairlist_core::{CleanupReport, DistributionIdentity, IdentityTracker, StorageResult};

use crate::ListStore;

/// Purge duplicates across the whole store.
///
/// Running it twice in a row removes nothing the second time. Finding
/// duplicates is a normal outcome, not an error.
pub async fn cleanup_duplicates<S>(store: &S) -> StorageResult<CleanupReport>
where
    S: ListStore + ?Sized,
{
    let entries = store.entries_oldest_first().await?;
    let total_scanned = entries.len() as u64;

    let mut tracker = IdentityTracker::new();
    let duplicates: Vec<_> = entries
        .iter()
        .filter(|entry| {
            let identity = DistributionIdentity::new(&entry.name, &entry.phone, &entry.note);
            !tracker.check_and_insert(identity)
        })
        .map(|entry| entry.id)
        .collect();

    tracing::info!(total_scanned, duplicates = duplicates.len(), "Duplicate scan complete");

    let duplicates_removed = if duplicates.is_empty() {
        0
    } else {
        store.entries_delete(&duplicates).await?
    };
    let remaining = store.entries_count().await?;

    tracing::info!(duplicates_removed, remaining, "Duplicate cleanup finished");

    Ok(CleanupReport {
        total_scanned,
        duplicates_removed,
        remaining,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::entry;
    use crate::MemoryStore;
    use chrono::{Duration, Utc};
    use fairlist_core::{new_entity_id, BatchId, RecipientRef};

    #[tokio::test]
    async fn test_oldest_entry_survives() {
        let store = MemoryStore::new();
        let to = RecipientRef::Agent(new_entity_id());
        let old = Utc::now() - Duration::days(2);
        let mid = Utc::now() - Duration::days(1);
        let new = Utc::now();

        // Inserted newest first so insertion order can't be what decides.
        let newest = entry("alice", "3", "", to, BatchId::generate(), 0, new);
        let middle = entry("Bob", "1", "", to, BatchId::generate(), 0, mid);
        let oldest = entry("Alice", "1", "", to, BatchId::generate(), 0, old);
        store
            .entries_insert(&[newest, middle, oldest.clone()])
            .await
            .unwrap();

        let report = cleanup_duplicates(&store).await.unwrap();
        assert_eq!(
            report,
            CleanupReport {
                total_scanned: 3,
                duplicates_removed: 2,
                remaining: 1,
            }
        );
        assert_eq!(store.all_entries().unwrap(), vec![oldest]);
    }

    #[tokio::test]
    async fn test_position_breaks_created_at_ties() {
        let store = MemoryStore::new();
        let to = RecipientRef::Agent(new_entity_id());
        let batch = BatchId::generate();
        let now = Utc::now();
        let second = entry("Dup", "2", "", to, batch, 1, now);
        let first = entry("dup", "1", "", to, batch, 0, now);
        store.entries_insert(&[second, first.clone()]).await.unwrap();

        cleanup_duplicates(&store).await.unwrap();
        assert_eq!(store.all_entries().unwrap(), vec![first]);
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let store = MemoryStore::new();
        let to = RecipientRef::Agent(new_entity_id());
        let batch = BatchId::generate();
        let now = Utc::now();
        store
            .entries_insert(&[
                entry("A", "1", "n", to, batch, 0, now),
                entry("B", "2", "N ", to, batch, 1, now),
                entry("C", "3", "", to, batch, 2, now),
                entry("D", "4", "", to, batch, 3, now),
            ])
            .await
            .unwrap();

        let first = cleanup_duplicates(&store).await.unwrap();
        assert_eq!(first.duplicates_removed, 1);
        assert_eq!(first.remaining, 3);

        let second = cleanup_duplicates(&store).await.unwrap();
        assert_eq!(
            second,
            CleanupReport {
                total_scanned: 3,
                duplicates_removed: 0,
                remaining: 3,
            }
        );
    }

    #[tokio::test]
    async fn test_empty_store() {
        let report = cleanup_duplicates(&MemoryStore::new()).await.unwrap();
        assert_eq!(report, CleanupReport::default());
    }

    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        fn rows() -> impl Strategy<Value = Vec<(String, String, String)>> {
            prop::collection::vec(("[ab]{1,2}", "[12]{1,2}", "[xy]{0,1}"), 0..30)
        }

        proptest! {
            #[test]
            fn prop_cleanup_is_idempotent(rows in rows()) {
                let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
                runtime.block_on(async {
                    let store = MemoryStore::new();
                    let to = RecipientRef::Agent(new_entity_id());
                    let batch = BatchId::generate();
                    let now = Utc::now();
                    let entries: Vec<_> = rows
                        .iter()
                        .enumerate()
                        .map(|(i, (n, p, note))| entry(n, p, note, to, batch, i as i32, now))
                        .collect();
                    store.entries_insert(&entries).await.unwrap();

                    let first = cleanup_duplicates(&store).await.unwrap();
                    assert_eq!(first.total_scanned, rows.len() as u64);
                    assert_eq!(first.duplicates_removed + first.remaining, first.total_scanned);

                    let second = cleanup_duplicates(&store).await.unwrap();
                    assert_eq!(second.duplicates_removed, 0);
                    assert_eq!(second.remaining, first.remaining);
                });
            }
        }
    }
}
