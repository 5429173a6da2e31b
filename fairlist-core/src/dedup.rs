//! Intra-batch deduplication
//!
//! Two records are the same contact when ANY of their normalized fields
//! matches: name, phone, or a non-empty note. The first occurrence wins and
//! later collisions are dropped. The same [`IdentityTracker`] drives the
//! store-wide cleanup, so both passes agree on what a duplicate is.

use std::collections::HashSet;

use crate::CandidateRecord;

/// Trim then lowercase (Unicode-aware).
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Normalized `(name, phone, note)` triple of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DistributionIdentity {
    pub name: String,
    pub phone: String,
    /// Empty when the record has no note.
    pub note: String,
}

impl DistributionIdentity {
    pub fn new(name: &str, phone: &str, note: &str) -> Self {
        Self {
            name: normalize(name),
            phone: normalize(phone),
            note: normalize(note),
        }
    }

    pub fn of(record: &CandidateRecord) -> Self {
        Self::new(&record.name, &record.phone, &record.note)
    }

    pub fn has_note(&self) -> bool {
        !self.note.is_empty()
    }
}

/// Seen-sets for one deduplication pass.
///
/// Only accepted identities are observed; a dropped record never widens the
/// sets, and empty notes are never tracked.
#[derive(Debug, Default)]
pub struct IdentityTracker {
    names: HashSet<String>,
    phones: HashSet<String>,
    notes: HashSet<String>,
}

impl IdentityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_duplicate(&self, identity: &DistributionIdentity) -> bool {
        self.names.contains(&identity.name)
            || self.phones.contains(&identity.phone)
            || (identity.has_note() && self.notes.contains(&identity.note))
    }

    pub fn observe(&mut self, identity: DistributionIdentity) {
        if identity.has_note() {
            self.notes.insert(identity.note);
        }
        self.names.insert(identity.name);
        self.phones.insert(identity.phone);
    }

    /// Returns `true` and records the identity if it is new, `false` if it
    /// collides with something already accepted.
    pub fn check_and_insert(&mut self, identity: DistributionIdentity) -> bool {
        if self.is_duplicate(&identity) {
            return false;
        }
        self.observe(identity);
        true
    }
}

/// Result of a deduplication pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupOutcome {
    /// Surviving records, in their original relative order.
    pub kept: Vec<CandidateRecord>,
    /// Number of records removed.
    pub dropped: usize,
}

/// Keep the first occurrence of every contact within `records`.
pub fn dedup_batch(records: Vec<CandidateRecord>) -> DedupOutcome {
    let mut tracker = IdentityTracker::new();
    let mut outcome = DedupOutcome::default();

    for record in records {
        if tracker.check_and_insert(DistributionIdentity::of(&record)) {
            outcome.kept.push(record);
        } else {
            tracing::debug!(name = %record.name, phone = %record.phone, "Skipping duplicate in file");
            outcome.dropped += 1;
        }
    }

    outcome
}
