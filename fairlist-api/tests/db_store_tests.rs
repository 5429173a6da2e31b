//! Postgres store tests. Need a reachable database configured through the
//! `FAIRLIST_DB_*` variables; run with `--features db-tests`.

#![cfg(feature = "db-tests")]

use fairlist_api::{ApiResult, DbClient, DbConfig};
use fairlist_core::{BatchId, DistributionIdentity, RecipientPool, RecipientRef};
use fairlist_storage::{build_summary, cleanup_duplicates, EntryFilter, ListStore, RecipientUpdate};
use fairlist_test_utils::fixtures;

async fn test_db() -> ApiResult<DbClient> {
    let db = DbClient::from_config(&DbConfig::from_env())?;
    db.migrate().await?;
    Ok(db)
}

#[tokio::test]
async fn test_recipient_roundtrip_and_soft_delete() -> ApiResult<()> {
    let db = test_db().await?;
    let mut agent = fixtures::agent("Db Agent");
    agent.email = format!("{}@db.test", agent.id);
    db.recipient_insert(&agent).await?;

    let found = db
        .recipient_find_by_email(RecipientPool::Agents, &agent.email.to_uppercase(), false)
        .await?;
    assert_eq!(found.map(|r| r.id), Some(agent.id));

    db.recipient_update(agent.id, &RecipientUpdate::deactivate()).await?;
    let active = db.recipient_list_active(RecipientPool::Agents).await?;
    assert!(active.iter().all(|r| r.id != agent.id));
    Ok(())
}

#[tokio::test]
async fn test_collision_lookup_is_normalized() -> ApiResult<()> {
    let db = test_db().await?;
    let mut agent = fixtures::agent("Collision Agent");
    agent.email = format!("{}@db.test", agent.id);
    db.recipient_insert(&agent).await?;

    let unique = agent.id.to_string();
    let stored = fixtures::candidate(&format!("Name {}", unique), &unique, "");
    db.entries_insert(&[fixtures::stored_entry(&stored, &agent)]).await?;

    let lookup = DistributionIdentity::new("someone", &format!("  {}  ", unique.to_uppercase()), "");
    assert!(db.entry_find_collision(&lookup).await?);
    Ok(())
}

#[tokio::test]
async fn test_collision_lookup_folds_non_ascii_case() -> ApiResult<()> {
    let db = test_db().await?;
    let mut agent = fixtures::agent("Unicode Agent");
    agent.email = format!("{}@db.test", agent.id);
    db.recipient_insert(&agent).await?;

    let unique = agent.id.to_string();
    let stored = fixtures::candidate(&format!("ÉMILE {}", unique), &format!("ph-{}", unique), "");
    db.entries_insert(&[fixtures::stored_entry(&stored, &agent)]).await?;

    // Ideographic space is whitespace to `str::trim` but not to SQL btrim.
    let lookup = DistributionIdentity::new(&format!("\u{3000}émile {}", unique), "no-such-phone", "");
    assert!(db.entry_find_collision(&lookup).await?);
    Ok(())
}

#[tokio::test]
async fn test_batch_summary_and_cleanup() -> ApiResult<()> {
    let db = test_db().await?;
    let mut agent = fixtures::agent("Summary Agent");
    agent.email = format!("{}@db.test", agent.id);
    db.recipient_insert(&agent).await?;

    let tag = agent.id.to_string();
    let batch = BatchId::generate();
    let mut first = fixtures::stored_entry(&fixtures::candidate(&tag, &format!("{}-a", tag), ""), &agent);
    let mut second = fixtures::stored_entry(&fixtures::candidate(&tag, &format!("{}-b", tag), ""), &agent);
    first.batch_id = batch;
    second.batch_id = batch;
    second.position = 1;
    db.entries_insert(&[first.clone(), second]).await?;

    let summary = build_summary(&db, batch).await?;
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].record_count, 2);

    let report = cleanup_duplicates(&db).await?;
    assert!(report.duplicates_removed >= 1);
    let left = db
        .entries_query(&EntryFilter::assigned_to(RecipientRef::Agent(agent.id)))
        .await?;
    assert_eq!(left.iter().map(|e| e.id).collect::<Vec<_>>(), vec![first.id]);
    Ok(())
}
