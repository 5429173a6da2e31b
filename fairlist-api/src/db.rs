//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling using deadpool-postgres, and the
//! [`ListStore`] implementation backed by it. Every statement runs under the
//! configured `statement_timeout`; a cancelled statement surfaces as
//! [`StorageError::Timeout`].

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolError, RecyclingMethod, Runtime};
use fairlist_core::{
    BatchId, DistributionIdentity, EntityId, ListEntry, Recipient, RecipientKind, RecipientPool,
    RecipientRef, StorageError, StorageResult, UploaderKind, UploaderRef,
};
use fairlist_storage::{BatchSummary, EntryFilter, ListStore, RecipientBatchCount, RecipientUpdate};
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};

/// Bundled schema, applied by [`DbClient::migrate`].
const SCHEMA_SQL: &str = include_str!("../migrations/0001_init.sql");

const RECIPIENT_COLUMNS: &str =
    "id, kind, name, email, mobile_number, parent_agent_id, is_active, created_at";

const ENTRY_COLUMNS: &str = "id, name, phone, note, recipient_kind, recipient_id, \
     uploader_kind, uploader_id, batch_id, position, created_at";

/// Shared `WHERE` clause for [`EntryFilter`]; parameters `$1..$5`.
const ENTRY_FILTER_SQL: &str = "($1::uuid IS NULL OR batch_id = $1) \
     AND ($2::text IS NULL OR recipient_kind = $2) \
     AND ($3::uuid IS NULL OR recipient_id = $3) \
     AND ($4::text IS NULL OR uploader_kind = $4) \
     AND ($5::uuid IS NULL OR uploader_id = $5)";

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// How long to wait for a pooled connection
    pub timeout: Duration,
    /// Upper bound for a single store call
    pub query_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "fairlist".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
            query_timeout: Duration::from_secs(10),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("FAIRLIST_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("FAIRLIST_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("FAIRLIST_DB_NAME").unwrap_or_else(|_| "fairlist".to_string()),
            user: std::env::var("FAIRLIST_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("FAIRLIST_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("FAIRLIST_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("FAIRLIST_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            query_timeout: Duration::from_secs(
                std::env::var("FAIRLIST_DB_QUERY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.options = Some(format!(
            "-c statement_timeout={}",
            self.query_timeout.as_millis()
        ));

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = deadpool_postgres::PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

/// Database client that wraps a connection pool and implements [`ListStore`]
/// with plain SQL.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Apply the bundled schema.
    pub async fn migrate(&self) -> ApiResult<()> {
        let conn = self.pool.get().await?;
        conn.batch_execute(SCHEMA_SQL).await?;
        tracing::info!("Database schema is up to date");
        Ok(())
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> StorageResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(pool_error)
    }
}

// ============================================================================
// ERROR AND ROW MAPPING
// ============================================================================

fn pool_error(err: PoolError) -> StorageError {
    tracing::error!("Connection pool error: {:?}", err);
    match err {
        PoolError::Timeout(_) => StorageError::Unavailable {
            reason: "connection pool exhausted".to_string(),
        },
        PoolError::Closed => StorageError::Unavailable {
            reason: "connection pool is closed".to_string(),
        },
        other => StorageError::QueryFailed {
            operation: "acquire_connection",
            reason: other.to_string(),
        },
    }
}

fn query_failed(operation: &'static str) -> impl Fn(tokio_postgres::Error) -> StorageError {
    move |err| {
        if err.code() == Some(&SqlState::QUERY_CANCELED) {
            tracing::warn!(operation, "Statement timed out");
            return StorageError::Timeout { operation };
        }
        if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
            return StorageError::AlreadyExists {
                entity: "row",
                reason: err.to_string(),
            };
        }
        tracing::error!(operation, "Database error: {:?}", err);
        StorageError::QueryFailed {
            operation,
            reason: err.to_string(),
        }
    }
}

fn corrupt(operation: &'static str, what: &str, value: &str) -> StorageError {
    StorageError::QueryFailed {
        operation,
        reason: format!("unexpected {} '{}'", what, value),
    }
}

fn recipient_from_row(row: &Row) -> StorageResult<Recipient> {
    let kind: String = row.get("kind");
    Ok(Recipient {
        id: row.get("id"),
        kind: RecipientKind::from_db_str(&kind)
            .ok_or_else(|| corrupt("recipient_from_row", "recipient kind", &kind))?,
        name: row.get("name"),
        email: row.get("email"),
        mobile_number: row.get("mobile_number"),
        parent_agent_id: row.get("parent_agent_id"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
    })
}

fn recipient_ref_from_row(row: &Row) -> StorageResult<RecipientRef> {
    let kind: String = row.get("recipient_kind");
    let kind = RecipientKind::from_db_str(&kind)
        .ok_or_else(|| corrupt("entry_from_row", "recipient kind", &kind))?;
    Ok(RecipientRef::new(kind, row.get("recipient_id")))
}

fn uploader_ref_from_row(row: &Row) -> StorageResult<UploaderRef> {
    let kind: String = row.get("uploader_kind");
    let kind = UploaderKind::from_db_str(&kind)
        .ok_or_else(|| corrupt("entry_from_row", "uploader kind", &kind))?;
    Ok(UploaderRef::new(kind, row.get("uploader_id")))
}

fn entry_from_row(row: &Row) -> StorageResult<ListEntry> {
    Ok(ListEntry {
        id: row.get("id"),
        name: row.get("name"),
        phone: row.get("phone"),
        note: row.get("note"),
        recipient: recipient_ref_from_row(row)?,
        uploader: uploader_ref_from_row(row)?,
        batch_id: BatchId::from_uuid(row.get("batch_id")),
        position: row.get("position"),
        created_at: row.get("created_at"),
    })
}

/// Parameters `$1..$5` for [`ENTRY_FILTER_SQL`].
struct FilterParams {
    batch_id: Option<uuid::Uuid>,
    recipient_kind: Option<&'static str>,
    recipient_id: Option<uuid::Uuid>,
    uploader_kind: Option<&'static str>,
    uploader_id: Option<uuid::Uuid>,
}

impl From<&EntryFilter> for FilterParams {
    fn from(filter: &EntryFilter) -> Self {
        Self {
            batch_id: filter.batch_id.map(|b| b.as_uuid()),
            recipient_kind: filter.recipient.map(|r| r.kind().as_db_str()),
            recipient_id: filter.recipient.map(|r| r.id()),
            uploader_kind: filter.uploader_kind.map(|k| k.as_db_str()),
            uploader_id: filter.uploader_id,
        }
    }
}

fn pool_params(pool: RecipientPool) -> (&'static str, Option<EntityId>) {
    match pool {
        RecipientPool::Agents => (RecipientKind::Agent.as_db_str(), None),
        RecipientPool::SubAgentsOf(parent) => (RecipientKind::SubAgent.as_db_str(), Some(parent)),
    }
}

// ============================================================================
// LIST STORE IMPLEMENTATION
// ============================================================================

#[async_trait]
impl ListStore for DbClient {
    async fn recipient_insert(&self, recipient: &Recipient) -> StorageResult<()> {
        const OP: &str = "recipient_insert";
        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO recipients \
             (id, kind, name, email, mobile_number, parent_agent_id, is_active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            &[
                &recipient.id,
                &recipient.kind.as_db_str(),
                &recipient.name,
                &recipient.email,
                &recipient.mobile_number,
                &recipient.parent_agent_id,
                &recipient.is_active,
                &recipient.created_at,
            ],
        )
        .await
        .map_err(query_failed(OP))?;
        Ok(())
    }

    async fn recipient_get(&self, id: EntityId) -> StorageResult<Option<Recipient>> {
        const OP: &str = "recipient_get";
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM recipients WHERE id = $1", RECIPIENT_COLUMNS);
        let row = conn.query_opt(&sql, &[&id]).await.map_err(query_failed(OP))?;
        row.as_ref().map(recipient_from_row).transpose()
    }

    async fn recipient_update(
        &self,
        id: EntityId,
        update: &RecipientUpdate,
    ) -> StorageResult<Recipient> {
        const OP: &str = "recipient_update";
        let conn = self.get_conn().await?;
        let sql = format!(
            "UPDATE recipients SET \
             name = COALESCE($2, name), \
             email = COALESCE($3, email), \
             mobile_number = COALESCE($4, mobile_number), \
             is_active = COALESCE($5, is_active) \
             WHERE id = $1 RETURNING {}",
            RECIPIENT_COLUMNS
        );
        let row = conn
            .query_opt(
                &sql,
                &[
                    &id,
                    &update.name,
                    &update.email,
                    &update.mobile_number,
                    &update.is_active,
                ],
            )
            .await
            .map_err(query_failed(OP))?;
        match row {
            Some(row) => recipient_from_row(&row),
            None => Err(StorageError::NotFound {
                entity: "recipient",
                id,
            }),
        }
    }

    async fn recipient_list_active(&self, pool: RecipientPool) -> StorageResult<Vec<Recipient>> {
        const OP: &str = "recipient_list_active";
        let (kind, parent) = pool_params(pool);
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM recipients \
             WHERE kind = $1 AND ($2::uuid IS NULL OR parent_agent_id = $2) AND is_active \
             ORDER BY created_at ASC, id ASC",
            RECIPIENT_COLUMNS
        );
        let rows = conn.query(&sql, &[&kind, &parent]).await.map_err(query_failed(OP))?;
        rows.iter().map(recipient_from_row).collect()
    }

    async fn recipient_find_by_email(
        &self,
        pool: RecipientPool,
        email: &str,
        active_only: bool,
    ) -> StorageResult<Option<Recipient>> {
        const OP: &str = "recipient_find_by_email";
        let (kind, parent) = pool_params(pool);
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM recipients \
             WHERE kind = $1 AND ($2::uuid IS NULL OR parent_agent_id = $2) \
             AND email = $3 AND (is_active OR NOT $4) LIMIT 1",
            RECIPIENT_COLUMNS
        );
        let row = conn
            .query_opt(&sql, &[&kind, &parent, &email, &active_only])
            .await
            .map_err(query_failed(OP))?;
        row.as_ref().map(recipient_from_row).transpose()
    }

    async fn entries_insert(&self, entries: &[ListEntry]) -> StorageResult<()> {
        const OP: &str = "entries_insert";
        let mut conn = self.get_conn().await?;
        let tx = conn.transaction().await.map_err(query_failed(OP))?;
        let stmt = tx
            .prepare_cached(
                "INSERT INTO list_entries \
                 (id, name, phone, note, recipient_kind, recipient_id, \
                  uploader_kind, uploader_id, batch_id, position, created_at, \
                  name_norm, phone_norm, note_norm) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
            )
            .await
            .map_err(query_failed(OP))?;

        for entry in entries {
            let identity = DistributionIdentity::new(&entry.name, &entry.phone, &entry.note);
            tx.execute(
                &stmt,
                &[
                    &entry.id,
                    &entry.name,
                    &entry.phone,
                    &entry.note,
                    &entry.recipient.kind().as_db_str(),
                    &entry.recipient.id(),
                    &entry.uploader.kind().as_db_str(),
                    &entry.uploader.id(),
                    &entry.batch_id.as_uuid(),
                    &entry.position,
                    &entry.created_at,
                    &identity.name,
                    &identity.phone,
                    &identity.note,
                ],
            )
            .await
            .map_err(query_failed(OP))?;
        }

        tx.commit().await.map_err(query_failed(OP))?;
        tracing::debug!(count = entries.len(), "Inserted list entries");
        Ok(())
    }

    async fn entry_find_collision(&self, identity: &DistributionIdentity) -> StorageResult<bool> {
        const OP: &str = "entry_find_collision";
        let conn = self.get_conn().await?;
        // The *_norm columns hold `normalize` output computed on insert, so
        // this is plain equality with no collation-dependent folding.
        let row = conn
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM list_entries \
                 WHERE name_norm = $1 \
                    OR phone_norm = $2 \
                    OR ($3 <> '' AND note_norm = $3))",
                &[&identity.name, &identity.phone, &identity.note],
            )
            .await
            .map_err(query_failed(OP))?;
        Ok(row.get(0))
    }

    async fn batch_counts(&self, batch_id: BatchId) -> StorageResult<Vec<RecipientBatchCount>> {
        const OP: &str = "batch_counts";
        let conn = self.get_conn().await?;
        let rows = conn
            .query(
                "SELECT recipient_kind, recipient_id, COUNT(*) AS record_count, \
                 MIN(position) AS first_position \
                 FROM list_entries WHERE batch_id = $1 \
                 GROUP BY recipient_kind, recipient_id \
                 ORDER BY first_position ASC",
                &[&batch_id.as_uuid()],
            )
            .await
            .map_err(query_failed(OP))?;
        rows.iter()
            .map(|row| {
                let record_count: i64 = row.get("record_count");
                Ok(RecipientBatchCount {
                    recipient: recipient_ref_from_row(row)?,
                    record_count: record_count as u64,
                    first_position: row.get("first_position"),
                })
            })
            .collect()
    }

    async fn entries_query(&self, filter: &EntryFilter) -> StorageResult<Vec<ListEntry>> {
        const OP: &str = "entries_query";
        let p = FilterParams::from(filter);
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM list_entries WHERE {} \
             ORDER BY created_at DESC, batch_id DESC, position ASC",
            ENTRY_COLUMNS, ENTRY_FILTER_SQL
        );
        let rows = conn
            .query(
                &sql,
                &[
                    &p.batch_id,
                    &p.recipient_kind,
                    &p.recipient_id,
                    &p.uploader_kind,
                    &p.uploader_id,
                ],
            )
            .await
            .map_err(query_failed(OP))?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn batches_list(&self, filter: &EntryFilter) -> StorageResult<Vec<BatchSummary>> {
        const OP: &str = "batches_list";
        let p = FilterParams::from(filter);
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT batch_id, uploader_kind, uploader_id, \
             COUNT(*) AS record_count, MIN(created_at) AS uploaded_at \
             FROM list_entries WHERE {} \
             GROUP BY batch_id, uploader_kind, uploader_id \
             ORDER BY uploaded_at DESC, batch_id DESC",
            ENTRY_FILTER_SQL
        );
        let rows = conn
            .query(
                &sql,
                &[
                    &p.batch_id,
                    &p.recipient_kind,
                    &p.recipient_id,
                    &p.uploader_kind,
                    &p.uploader_id,
                ],
            )
            .await
            .map_err(query_failed(OP))?;
        rows.iter()
            .map(|row| {
                let record_count: i64 = row.get("record_count");
                Ok(BatchSummary {
                    batch_id: BatchId::from_uuid(row.get("batch_id")),
                    uploader: uploader_ref_from_row(row)?,
                    record_count: record_count as u64,
                    uploaded_at: row.get("uploaded_at"),
                })
            })
            .collect()
    }

    async fn entries_oldest_first(&self) -> StorageResult<Vec<ListEntry>> {
        const OP: &str = "entries_oldest_first";
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM list_entries ORDER BY created_at ASC, position ASC, id ASC",
            ENTRY_COLUMNS
        );
        let rows = conn.query(&sql, &[]).await.map_err(query_failed(OP))?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn entries_delete(&self, ids: &[EntityId]) -> StorageResult<u64> {
        const OP: &str = "entries_delete";
        let conn = self.get_conn().await?;
        conn.execute("DELETE FROM list_entries WHERE id = ANY($1)", &[&ids])
            .await
            .map_err(query_failed(OP))
    }

    async fn entries_count(&self) -> StorageResult<u64> {
        const OP: &str = "entries_count";
        let conn = self.get_conn().await?;
        let row = conn
            .query_one("SELECT COUNT(*) FROM list_entries", &[])
            .await
            .map_err(query_failed(OP))?;
        let count: i64 = row.get(0);
        Ok(count as u64)
    }

    async fn health_check(&self) -> StorageResult<bool> {
        const OP: &str = "health_check";
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[]).await.map_err(query_failed(OP))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairlist_core::new_entity_id;

    #[test]
    fn test_default_config() {
        let config = DbConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.dbname, "fairlist");
        assert_eq!(config.query_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_filter_params_from_entry_filter() {
        let agent = new_entity_id();
        let filter = EntryFilter::uploaded_by(UploaderRef::Agent(agent))
            .with_recipient(Some(RecipientRef::SubAgent(agent)));
        let params = FilterParams::from(&filter);
        assert_eq!(params.uploader_kind, Some("agent"));
        assert_eq!(params.uploader_id, Some(agent));
        assert_eq!(params.recipient_kind, Some("sub_agent"));
        assert!(params.batch_id.is_none());
    }

    #[test]
    fn test_pool_params() {
        let parent = new_entity_id();
        assert_eq!(pool_params(RecipientPool::Agents), ("agent", None));
        assert_eq!(
            pool_params(RecipientPool::SubAgentsOf(parent)),
            ("sub_agent", Some(parent))
        );
    }

    #[test]
    fn test_schema_is_idempotent_sql() {
        assert!(SCHEMA_SQL.contains("CREATE TABLE IF NOT EXISTS list_entries"));
        assert!(!SCHEMA_SQL.contains("CREATE TABLE list_entries"));
    }
}
