//! Upload Service
//!
//! Orchestrates one upload: parse, validate, dedup within the file, dedup
//! against the store, distribute, persist, summarize. Everything from the
//! store check through the insert runs under the upload gate so two
//! concurrent uploads in one process cannot both slip the same record past
//! the persisted check.

use std::fmt;
use std::io::Write;
use std::pin::pin;
use std::sync::Arc;

use axum::body::Bytes;
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use tempfile::NamedTempFile;

use fairlist_core::{
    dedup_batch, distribute, parse_records, validate_records, BatchId, IngestError,
    IngestResult, RecipientPool, UploadFormat, UploadReport, UploaderRef,
};
use fairlist_storage::{build_summary, filter_persisted};

use crate::auth::{AuthContext, Role};
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// SPOOLING
// ============================================================================

/// An upload written to a temporary file in the configured upload directory.
///
/// The file is removed when this value is dropped.
#[derive(Debug)]
pub struct SpooledUpload {
    file: NamedTempFile,
    pub file_name: String,
    pub format: UploadFormat,
    pub size: usize,
}

impl SpooledUpload {
    /// Read the spooled bytes back.
    pub async fn read(&self) -> ApiResult<Vec<u8>> {
        tokio::fs::read(self.file.path())
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to read upload: {}", e)))
    }

    pub fn path(&self) -> &std::path::Path {
        self.file.path()
    }
}

/// Stream an upload into a temp file, enforcing the size ceiling as chunks
/// arrive. The extension is checked before any bytes are written.
///
/// Arguments are owned so the returned future stays `Send` when awaited from
/// a handler that is itself generic over the multipart field lifetime.
pub async fn spool_upload<S, E>(
    file_name: String,
    chunks: S,
    config: Arc<ApiConfig>,
) -> ApiResult<SpooledUpload>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: fmt::Display,
{
    let format = UploadFormat::from_file_name(&file_name)?;

    let mut file = NamedTempFile::new_in(&config.upload_dir).map_err(|e| {
        ApiError::internal_error(format!(
            "Failed to create spool file in {}: {}",
            config.upload_dir.display(),
            e
        ))
    })?;

    let mut chunks = pin!(chunks);
    let mut size = 0usize;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk
            .map_err(|e| ApiError::invalid_input(format!("Failed to read upload: {}", e)))?;
        size += chunk.len();
        if size > config.max_upload_bytes {
            return Err(IngestError::InputTooLarge {
                size,
                limit: config.max_upload_bytes,
            }
            .into());
        }
        file.as_file_mut()
            .write_all(&chunk)
            .map_err(|e| ApiError::internal_error(format!("Failed to spool upload: {}", e)))?;
    }
    file.as_file_mut()
        .flush()
        .map_err(|e| ApiError::internal_error(format!("Failed to spool upload: {}", e)))?;

    tracing::debug!(%file_name, size, path = %file.path().display(), "Upload spooled");

    Ok(SpooledUpload {
        file,
        file_name,
        format,
        size,
    })
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Who uploads and which pool the records go to, by caller role.
pub fn upload_target(auth: &AuthContext) -> (UploaderRef, RecipientPool) {
    match auth.role {
        Role::Admin => (auth.uploader(), RecipientPool::Agents),
        Role::Agent => (auth.uploader(), RecipientPool::SubAgentsOf(auth.user_id)),
    }
}

/// Run the full ingest pipeline over an uploaded file's bytes.
pub async fn process_upload(
    state: &AppState,
    bytes: &[u8],
    format: UploadFormat,
    uploader: UploaderRef,
    pool: RecipientPool,
) -> IngestResult<UploadReport> {
    let records = parse_records(bytes, format, &state.config.ingest_limits())?;
    if records.is_empty() {
        return Err(IngestError::EmptyInput);
    }
    validate_records(&records)?;

    let parsed = records.len();
    let intra = dedup_batch(records);
    tracing::info!(
        parsed,
        kept = intra.kept.len(),
        removed = intra.dropped,
        "Removed duplicates within upload"
    );

    let gate = state.upload_gate.lock().await;

    let persisted = filter_persisted(
        state.store.as_ref(),
        intra.kept,
        state.config.lookup_concurrency,
    )
    .await?;
    let duplicates_removed = intra.dropped + persisted.dropped;
    tracing::info!(
        db_duplicates = persisted.dropped,
        duplicates_removed,
        remaining = persisted.kept.len(),
        "Removed duplicates already in store"
    );

    if persisted.kept.is_empty() {
        return Err(IngestError::AllDuplicates { duplicates_removed });
    }

    let recipients = state.store.recipient_list_active(pool).await?;
    if recipients.is_empty() {
        return Err(IngestError::NoActiveRecipients { pool });
    }

    let batch_id = BatchId::generate();
    let entries = distribute(
        persisted.kept,
        &recipients,
        pool,
        uploader,
        batch_id,
        Utc::now(),
    )?;
    state.store.entries_insert(&entries).await?;
    drop(gate);

    let distribution_summary = build_summary(state.store.as_ref(), batch_id).await?;
    tracing::info!(
        %batch_id,
        %pool,
        total_records = entries.len(),
        recipients = recipients.len(),
        "Upload distributed"
    );

    Ok(UploadReport {
        batch_id,
        total_records: entries.len(),
        recipients_count: recipients.len(),
        duplicates_removed,
        distribution_summary,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fairlist_core::{new_entity_id, Recipient, RecipientKind};
    use fairlist_storage::{ListStore, MemoryStore};
    use std::convert::Infallible;

    fn agent(name: &str) -> Recipient {
        Recipient {
            id: new_entity_id(),
            kind: RecipientKind::Agent,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            mobile_number: "555".to_string(),
            parent_agent_id: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn state_with(store: MemoryStore, config: ApiConfig) -> AppState {
        AppState::new(Arc::new(store), config)
    }

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<Bytes, Infallible>> {
        futures_util::stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_spool_roundtrip_and_cleanup() {
        let config = Arc::new(ApiConfig::default());
        let spooled = spool_upload("list.CSV".into(), chunks(&["Name,Phone\n", "A,1\n"]), config)
            .await
            .unwrap();
        assert_eq!(spooled.format, UploadFormat::Csv);
        assert_eq!(spooled.size, 15);
        assert_eq!(spooled.read().await.unwrap(), b"Name,Phone\nA,1\n");

        let path = spooled.path().to_path_buf();
        drop(spooled);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_spool_rejects_oversized_upload() {
        let config = Arc::new(ApiConfig {
            max_upload_bytes: 8,
            ..ApiConfig::default()
        });
        let err = spool_upload("a.csv".into(), chunks(&["12345", "67890"]), config)
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::PayloadTooLarge);
    }

    #[tokio::test]
    async fn test_spool_rejects_unknown_extension() {
        let err = spool_upload("a.pdf".into(), chunks(&["x"]), Arc::new(ApiConfig::default()))
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::UnsupportedFormat);
    }

    #[tokio::test]
    async fn test_upload_distributes_and_reports() {
        let store = MemoryStore::new();
        let a = agent("Ann");
        let b = agent("Ben");
        store.recipient_insert(&a).await.unwrap();
        store.recipient_insert(&b).await.unwrap();
        let state = state_with(store.clone(), ApiConfig::default());

        let csv = "Name,Phone\nA,1\nB,2\nC,3\n";
        let report = process_upload(
            &state,
            csv.as_bytes(),
            UploadFormat::Csv,
            UploaderRef::Admin(new_entity_id()),
            RecipientPool::Agents,
        )
        .await
        .unwrap();

        assert_eq!(report.total_records, 3);
        assert_eq!(report.recipients_count, 2);
        assert_eq!(report.duplicates_removed, 0);
        let counts: Vec<u64> = report
            .distribution_summary
            .iter()
            .map(|c| c.record_count)
            .collect();
        assert_eq!(counts.iter().sum::<u64>(), 3);
        assert_eq!(counts.len(), 2);
        assert_eq!(store.all_entries().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_second_identical_upload_is_all_duplicates() {
        let store = MemoryStore::new();
        store.recipient_insert(&agent("Ann")).await.unwrap();
        let state = state_with(store.clone(), ApiConfig::default());
        let csv = "Name,Phone\nA,1\nB,2\n";
        let admin = UploaderRef::Admin(new_entity_id());

        process_upload(&state, csv.as_bytes(), UploadFormat::Csv, admin, RecipientPool::Agents)
            .await
            .unwrap();
        let err = process_upload(&state, csv.as_bytes(), UploadFormat::Csv, admin, RecipientPool::Agents)
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::AllDuplicates { duplicates_removed: 2 }));
        assert_eq!(store.all_entries().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_no_active_recipients() {
        let store = MemoryStore::new();
        let mut inactive = agent("Old");
        inactive.is_active = false;
        store.recipient_insert(&inactive).await.unwrap();
        let state = state_with(store, ApiConfig::default());

        let err = process_upload(
            &state,
            b"Name,Phone\nA,1\n",
            UploadFormat::Csv,
            UploaderRef::Admin(new_entity_id()),
            RecipientPool::Agents,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, IngestError::NoActiveRecipients { .. }));
    }

    #[tokio::test]
    async fn test_all_duplicates_reported_before_empty_pool() {
        let store = MemoryStore::new();
        store.recipient_insert(&agent("Ann")).await.unwrap();
        let state = state_with(store.clone(), ApiConfig::default());
        process_upload(
            &state,
            b"Name,Phone\nA,1\n",
            UploadFormat::Csv,
            UploaderRef::Admin(new_entity_id()),
            RecipientPool::Agents,
        )
        .await
        .unwrap();

        // The uploading agent has no sub-agents at all.
        let agent_id = new_entity_id();
        let err = process_upload(
            &state,
            b"Name,Phone\nA,1\n",
            UploadFormat::Csv,
            UploaderRef::Agent(agent_id),
            RecipientPool::SubAgentsOf(agent_id),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, IngestError::AllDuplicates { duplicates_removed: 1 }));
        assert_eq!(store.all_entries().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_and_invalid_files_write_nothing() {
        let store = MemoryStore::new();
        store.recipient_insert(&agent("Ann")).await.unwrap();
        let state = state_with(store.clone(), ApiConfig::default());
        let admin = UploaderRef::Admin(new_entity_id());

        let err = process_upload(&state, b"Name,Phone\n", UploadFormat::Csv, admin, RecipientPool::Agents)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::EmptyInput));

        let err = process_upload(
            &state,
            b"Name,Phone\nA,1\n,2\n",
            UploadFormat::Csv,
            admin,
            RecipientPool::Agents,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, IngestError::Validation { row_index: 2, .. }));
        assert!(store.all_entries().unwrap().is_empty());
    }

    #[test]
    fn test_upload_target_by_role() {
        let id = new_entity_id();
        assert_eq!(
            upload_target(&AuthContext::new(id, Role::Admin)),
            (UploaderRef::Admin(id), RecipientPool::Agents)
        );
        assert_eq!(
            upload_target(&AuthContext::new(id, Role::Agent)),
            (UploaderRef::Agent(id), RecipientPool::SubAgentsOf(id))
        );
    }
}
