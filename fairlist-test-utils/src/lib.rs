//! Fairlist Test Utilities
//!
//! Shared test infrastructure for the Fairlist workspace:
//! - Proptest generators for candidate records
//! - Fixtures for recipients, stored entries and seeded stores
//! - Assertions for distribution results

pub use fairlist_core::{
    BatchId, CandidateRecord, EntityId, IngestError, ListEntry, Recipient, RecipientKind,
    RecipientPool, RecipientRef, UploaderRef,
};
pub use fairlist_storage::{ListStore, MemoryStore};

use chrono::Utc;
use fairlist_core::new_entity_id;

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating upload input.

    use super::*;
    use proptest::prelude::*;

    /// A short field value, sometimes padded or upper-cased so normalization
    /// has something to do.
    pub fn arb_field() -> impl Strategy<Value = String> {
        ("[a-e]{1,3}", any::<bool>(), any::<bool>()).prop_map(|(core, pad, upper)| {
            let value = if upper { core.to_uppercase() } else { core };
            if pad {
                format!("  {} ", value)
            } else {
                value
            }
        })
    }

    /// A note that is empty about half the time.
    pub fn arb_note() -> impl Strategy<Value = String> {
        prop_oneof![Just(String::new()), arb_field()]
    }

    /// A record drawn from a small alphabet, so collisions are common.
    pub fn arb_candidate_record() -> impl Strategy<Value = CandidateRecord> {
        (arb_field(), arb_field(), arb_note())
            .prop_map(|(name, phone, note)| CandidateRecord::new(name, phone, note))
    }

    /// Up to `max_len` colliding-prone records.
    pub fn arb_records(max_len: usize) -> impl Strategy<Value = Vec<CandidateRecord>> {
        prop::collection::vec(arb_candidate_record(), 0..=max_len)
    }

    /// `len` records that share no field with one another.
    pub fn arb_distinct_records(max_len: usize) -> impl Strategy<Value = Vec<CandidateRecord>> {
        (0..=max_len).prop_map(|len| {
            (0..len)
                .map(|i| CandidateRecord::new(format!("contact-{}", i), format!("+1555{:04}", i), ""))
                .collect()
        })
    }

    /// Number of recipients in a distribution round.
    pub fn arb_recipient_count() -> impl Strategy<Value = usize> {
        1usize..=12
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built test fixtures for common testing scenarios.

    use super::*;

    fn recipient(kind: RecipientKind, name: &str, parent_agent_id: Option<EntityId>) -> Recipient {
        Recipient {
            id: new_entity_id(),
            kind,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            mobile_number: "+1 555 0100".to_string(),
            parent_agent_id,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// An active agent with an email derived from `name`.
    pub fn agent(name: &str) -> Recipient {
        recipient(RecipientKind::Agent, name, None)
    }

    /// An active sub-agent owned by `parent`.
    pub fn sub_agent(parent: EntityId, name: &str) -> Recipient {
        recipient(RecipientKind::SubAgent, name, Some(parent))
    }

    pub fn candidate(name: &str, phone: &str, note: &str) -> CandidateRecord {
        CandidateRecord::new(name, phone, note)
    }

    /// An already-distributed entry, as if uploaded earlier by an admin.
    pub fn stored_entry(record: &CandidateRecord, to: &Recipient) -> ListEntry {
        ListEntry {
            id: new_entity_id(),
            name: record.name.trim().to_string(),
            phone: record.phone.trim().to_string(),
            note: record.note.trim().to_string(),
            recipient: to.reference(),
            uploader: UploaderRef::Admin(new_entity_id()),
            batch_id: BatchId::generate(),
            position: 0,
            created_at: Utc::now(),
        }
    }

    /// A memory store holding one active agent per name, in the given order.
    pub async fn seeded_store(agent_names: &[&str]) -> (MemoryStore, Vec<Recipient>) {
        let store = MemoryStore::new();
        let mut agents = Vec::with_capacity(agent_names.len());
        for name in agent_names {
            let agent = agent(name);
            if let Err(e) = store.recipient_insert(&agent).await {
                panic!("seeding {} failed: {}", name, e);
            }
            agents.push(agent);
        }
        (store, agents)
    }

    /// A CSV file with a `Name,Phone,Notes` header row.
    pub fn csv_bytes(rows: &[(&str, &str, &str)]) -> Vec<u8> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let rows = std::iter::once(("Name", "Phone", "Notes")).chain(rows.iter().copied());
        for (name, phone, note) in rows {
            if let Err(e) = writer.write_record([name, phone, note]) {
                panic!("writing csv fixture failed: {}", e);
            }
        }
        match writer.into_inner() {
            Ok(bytes) => bytes,
            Err(e) => panic!("flushing csv fixture failed: {}", e),
        }
    }

    /// Seven contacts: two repeat earlier rows and one repeats [`stored_contact`].
    pub fn seven_record_upload() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("Alice", "1001", "first call"),
            ("Bob", "1002", ""),
            ("alice", "2001", ""),
            ("Carol", "1003", "warm lead"),
            ("Dan", "1004", ""),
            ("Eve", "1002", ""),
            ("Zed", "9999", ""),
        ]
    }

    /// The stored contact that collides with the last row of [`seven_record_upload`].
    pub fn stored_contact() -> CandidateRecord {
        CandidateRecord::new("Someone Else", "9999", "")
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for distribution results.

    use super::*;
    use std::collections::HashMap;

    /// Assert that no two recipients' counts differ by more than one and that
    /// larger shares come first.
    #[track_caller]
    pub fn assert_fair_split(counts: &[usize]) {
        for pair in counts.windows(2) {
            assert!(pair[0] >= pair[1], "counts not front-loaded: {:?}", counts);
        }
        if let (Some(max), Some(min)) = (counts.iter().max(), counts.iter().min()) {
            assert!(max - min <= 1, "unfair split: {:?}", counts);
        }
    }

    /// Entry count per recipient, in order of first appearance.
    pub fn counts_by_recipient(entries: &[ListEntry]) -> Vec<(RecipientRef, usize)> {
        let mut order = Vec::new();
        let mut counts: HashMap<RecipientRef, usize> = HashMap::new();
        for entry in entries {
            let count = counts.entry(entry.recipient).or_insert_with(|| {
                order.push(entry.recipient);
                0
            });
            *count += 1;
        }
        order
            .into_iter()
            .map(|r| (r, counts.get(&r).copied().unwrap_or_default()))
            .collect()
    }

    /// Assert that an ingest result failed with the given variant.
    #[track_caller]
    pub fn assert_ingest_err<T: std::fmt::Debug>(
        result: &Result<T, IngestError>,
        matches: fn(&IngestError) -> bool,
    ) {
        match result {
            Err(e) if matches(e) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairlist_core::dedup_batch;
    use proptest::prelude::*;

    #[test]
    fn test_csv_fixture_has_header() {
        let bytes = fixtures::csv_bytes(&[("Ann", "1", "")]);
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "Name,Phone,Notes\nAnn,1,\n");
    }

    #[test]
    fn test_seven_record_upload_shape() {
        let rows = fixtures::seven_record_upload();
        let records: Vec<_> = rows
            .iter()
            .map(|(n, p, note)| fixtures::candidate(n, p, note))
            .collect();
        let outcome = dedup_batch(records);
        assert_eq!(outcome.kept.len(), 5);
        assert_eq!(outcome.dropped, 2);
    }

    #[test]
    fn test_sub_agent_fixture_has_parent() {
        let parent = fixtures::agent("Ann");
        let sub = fixtures::sub_agent(parent.id, "Sam");
        assert_eq!(sub.parent_agent_id, Some(parent.id));
        assert_eq!(sub.kind, RecipientKind::SubAgent);
        assert_eq!(parent.email, "ann@example.com");
    }

    #[tokio::test]
    async fn test_seeded_store_order() {
        let (store, agents) = fixtures::seeded_store(&["A", "B"]).await;
        let active = store.recipient_list_active(RecipientPool::Agents).await.unwrap();
        assert_eq!(active, agents);
    }

    #[test]
    fn test_counts_by_recipient() {
        let a = fixtures::agent("a");
        let b = fixtures::agent("b");
        let rec = fixtures::candidate("x", "1", "");
        let entries = vec![
            fixtures::stored_entry(&rec, &a),
            fixtures::stored_entry(&rec, &b),
            fixtures::stored_entry(&rec, &a),
        ];
        assert_eq!(
            assertions::counts_by_recipient(&entries),
            vec![(a.reference(), 2), (b.reference(), 1)]
        );
    }

    proptest! {
        #[test]
        fn test_distinct_records_never_collide(records in generators::arb_distinct_records(40)) {
            let len = records.len();
            let outcome = dedup_batch(records);
            prop_assert_eq!(outcome.kept.len(), len);
        }
    }
}
