//! Fair distribution
//!
//! With M records and N recipients every recipient gets `M / N` records and
//! the first `M % N` recipients (in pool order) get one more. Recipients are
//! filled sequentially, so recipient 0 takes a contiguous prefix of the batch.

use crate::{
    new_entity_id, BatchId, CandidateRecord, IngestError, IngestResult, ListEntry, Recipient,
    RecipientPool, Timestamp, UploaderRef,
};

/// Number of records each of `recipients` receives out of `total`.
pub fn split_counts(total: usize, recipients: usize) -> Vec<usize> {
    if recipients == 0 {
        return Vec::new();
    }
    let base = total / recipients;
    let remainder = total % recipients;
    (0..recipients)
        .map(|idx| base + usize::from(idx < remainder))
        .collect()
}

/// Assign `records` to `recipients` and build the entries to persist.
///
/// `recipients` must already be the active members of `pool`, in pool order.
/// Stored fields are trimmed. Every entry carries `batch_id`, `uploader` and
/// its 0-based `position` in the batch.
pub fn distribute(
    records: Vec<CandidateRecord>,
    recipients: &[Recipient],
    pool: RecipientPool,
    uploader: UploaderRef,
    batch_id: BatchId,
    created_at: Timestamp,
) -> IngestResult<Vec<ListEntry>> {
    if recipients.is_empty() {
        return Err(IngestError::NoActiveRecipients { pool });
    }

    let counts = split_counts(records.len(), recipients.len());
    let mut records = records.into_iter();
    let mut entries = Vec::with_capacity(records.len());

    for (recipient, count) in recipients.iter().zip(counts) {
        let reference = recipient.reference();
        for record in records.by_ref().take(count) {
            let position = entries.len() as i32;
            entries.push(ListEntry {
                id: new_entity_id(),
                name: record.name.trim().to_string(),
                phone: record.phone.trim().to_string(),
                note: record.note.trim().to_string(),
                recipient: reference,
                uploader,
                batch_id,
                position,
                created_at,
            });
        }
    }

    tracing::debug!(
        %batch_id,
        entries = entries.len(),
        recipients = recipients.len(),
        "Distributed batch"
    );
    Ok(entries)
}
