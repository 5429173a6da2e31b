//! Persisted-store deduplication

use futures_util::{stream, StreamExt, TryStreamExt};

use fairlist_core::{CandidateRecord, DedupOutcome, DistributionIdentity, StorageResult};

use crate::ListStore;

/// Default number of in-flight collision lookups.
pub const DEFAULT_LOOKUP_CONCURRENCY: usize = 8;

/// Drop every record that collides with an already stored entry.
///
/// Each record is checked against the store independently; lookups run
/// concurrently (at most `concurrency` at a time) and the results are
/// recombined in input order. Records are not compared with each other here,
/// so run [`fairlist_core::dedup_batch`] first.
pub async fn filter_persisted<S>(
    store: &S,
    records: Vec<CandidateRecord>,
    concurrency: usize,
) -> StorageResult<DedupOutcome>
where
    S: ListStore + ?Sized,
{
    let identities: Vec<DistributionIdentity> =
        records.iter().map(DistributionIdentity::of).collect();

    let lookups: Vec<_> = identities
        .iter()
        .map(|identity| store.entry_find_collision(identity))
        .collect();
    let collisions: Vec<bool> = stream::iter(lookups)
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let mut outcome = DedupOutcome::default();
    for (record, collides) in records.into_iter().zip(collisions) {
        if collides {
            tracing::debug!(name = %record.name, phone = %record.phone, "Skipping record already in store");
            outcome.dropped += 1;
        } else {
            outcome.kept.push(record);
        }
    }
    Ok(outcome)
}
