//! Recipient Service
//!
//! Agent management for admins and sub-agent management for agents.
//! Deletes are soft: the recipient is deactivated and drops out of future
//! distributions while its past entries keep pointing at it.

use chrono::Utc;
use fairlist_core::{new_entity_id, EntityId, Recipient, RecipientKind, RecipientPool};
use fairlist_storage::{ListStore, RecipientUpdate};

use crate::error::{ApiError, ApiResult};
use crate::types::{CreateRecipientRequest, UpdateRecipientRequest};

fn new_recipient(
    kind: RecipientKind,
    req: CreateRecipientRequest,
    parent_agent_id: Option<EntityId>,
) -> Recipient {
    Recipient {
        id: new_entity_id(),
        kind,
        name: req.name,
        email: req.email,
        mobile_number: req.mobile_number,
        parent_agent_id,
        is_active: true,
        created_at: Utc::now(),
    }
}

// ============================================================================
// AGENTS
// ============================================================================

/// Fetch an agent regardless of its active flag.
pub async fn get_agent(store: &dyn ListStore, id: EntityId) -> ApiResult<Recipient> {
    store
        .recipient_get(id)
        .await?
        .filter(|r| r.kind == RecipientKind::Agent)
        .ok_or_else(ApiError::agent_not_found)
}

/// Create an agent. Emails are unique across all agents, active or not.
pub async fn create_agent(
    store: &dyn ListStore,
    req: &CreateRecipientRequest,
) -> ApiResult<Recipient> {
    let req = req.normalized()?;
    if store
        .recipient_find_by_email(RecipientPool::Agents, &req.email, false)
        .await?
        .is_some()
    {
        return Err(ApiError::already_exists("Agent with this email already exists"));
    }

    let agent = new_recipient(RecipientKind::Agent, req, None);
    store.recipient_insert(&agent).await?;
    tracing::info!(agent_id = %agent.id, "Agent created");
    Ok(agent)
}

pub async fn update_agent(
    store: &dyn ListStore,
    id: EntityId,
    req: UpdateRecipientRequest,
) -> ApiResult<Recipient> {
    let current = get_agent(store, id).await?;
    let update = req.into_update();

    if let Some(email) = update.email.as_deref().filter(|e| *e != current.email) {
        if store
            .recipient_find_by_email(RecipientPool::Agents, email, false)
            .await?
            .is_some()
        {
            return Err(ApiError::already_exists("Email already in use"));
        }
    }

    Ok(store.recipient_update(id, &update).await?)
}

pub async fn deactivate_agent(store: &dyn ListStore, id: EntityId) -> ApiResult<()> {
    get_agent(store, id).await?;
    store.recipient_update(id, &RecipientUpdate::deactivate()).await?;
    tracing::info!(agent_id = %id, "Agent deactivated");
    Ok(())
}

// ============================================================================
// SUB-AGENTS
// ============================================================================

/// Fetch a sub-agent and check it belongs to `agent_id`.
pub async fn get_owned_sub_agent(
    store: &dyn ListStore,
    agent_id: EntityId,
    id: EntityId,
) -> ApiResult<Recipient> {
    let sub_agent = store
        .recipient_get(id)
        .await?
        .filter(|r| r.kind == RecipientKind::SubAgent)
        .ok_or_else(ApiError::sub_agent_not_found)?;

    if sub_agent.parent_agent_id != Some(agent_id) {
        return Err(ApiError::forbidden(
            "Access denied. This sub-agent does not belong to you.",
        ));
    }
    Ok(sub_agent)
}

/// Create a sub-agent owned by `agent_id`. Emails are unique among the
/// agent's active sub-agents.
pub async fn create_sub_agent(
    store: &dyn ListStore,
    agent_id: EntityId,
    req: &CreateRecipientRequest,
) -> ApiResult<Recipient> {
    let req = req.normalized()?;
    if store
        .recipient_find_by_email(RecipientPool::SubAgentsOf(agent_id), &req.email, true)
        .await?
        .is_some()
    {
        return Err(ApiError::already_exists(
            "Sub-agent with this email already exists",
        ));
    }

    let sub_agent = new_recipient(RecipientKind::SubAgent, req, Some(agent_id));
    store.recipient_insert(&sub_agent).await?;
    tracing::info!(%agent_id, sub_agent_id = %sub_agent.id, "Sub-agent created");
    Ok(sub_agent)
}

pub async fn update_sub_agent(
    store: &dyn ListStore,
    agent_id: EntityId,
    id: EntityId,
    req: UpdateRecipientRequest,
) -> ApiResult<Recipient> {
    let current = get_owned_sub_agent(store, agent_id, id).await?;
    let update = req.into_update();

    if let Some(email) = update.email.as_deref().filter(|e| *e != current.email) {
        if store
            .recipient_find_by_email(RecipientPool::SubAgentsOf(agent_id), email, true)
            .await?
            .is_some()
        {
            return Err(ApiError::already_exists("Email already in use"));
        }
    }

    Ok(store.recipient_update(id, &update).await?)
}

pub async fn deactivate_sub_agent(
    store: &dyn ListStore,
    agent_id: EntityId,
    id: EntityId,
) -> ApiResult<()> {
    get_owned_sub_agent(store, agent_id, id).await?;
    store.recipient_update(id, &RecipientUpdate::deactivate()).await?;
    tracing::info!(%agent_id, sub_agent_id = %id, "Sub-agent deactivated");
    Ok(())
}
