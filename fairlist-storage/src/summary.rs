//! Distribution summary for one batch

use fairlist_core::{BatchId, RecipientCount, StorageResult};

use crate::ListStore;

/// Count entries per recipient in `batch_id`, joined with recipient profiles.
///
/// Ordered by the first position each recipient holds in the batch, which is
/// pool order for a freshly distributed batch. Recipients whose profile no
/// longer resolves are left out.
pub async fn build_summary<S>(store: &S, batch_id: BatchId) -> StorageResult<Vec<RecipientCount>>
where
    S: ListStore + ?Sized,
{
    let counts = store.batch_counts(batch_id).await?;
    let mut summary = Vec::with_capacity(counts.len());

    for count in counts {
        match store.recipient_get(count.recipient.id()).await? {
            Some(recipient) if recipient.kind == count.recipient.kind() => {
                summary.push(RecipientCount {
                    recipient_name: recipient.name,
                    recipient_email: recipient.email,
                    record_count: count.record_count,
                });
            }
            _ => {
                tracing::warn!(%batch_id, recipient = %count.recipient.id(), "Recipient missing from summary");
            }
        }
    }

    Ok(summary)
}
