//! Sub-Agent REST API Routes (agents only)
//!
//! Every operation is scoped to the calling agent's own sub-agents.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware::from_fn,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use fairlist_core::{EntityId, RecipientPool};

use crate::error::{ApiError, ApiResult};
use crate::middleware::{require_agent, AuthExtractor};
use crate::services::{
    create_sub_agent, deactivate_sub_agent, get_owned_sub_agent, update_sub_agent,
};
use crate::state::AppState;
use crate::types::{CreateRecipientRequest, Envelope, UpdateRecipientRequest};

/// GET /api/sub-agents - The caller's active sub-agents
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/sub-agents",
    tag = "Sub-Agents",
    responses(
        (status = 200, description = "Active sub-agents", body = Vec<fairlist_core::Recipient>),
        (status = 403, description = "Agents only", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn list_sub_agents(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    let sub_agents = state
        .store
        .recipient_list_active(RecipientPool::SubAgentsOf(auth.user_id))
        .await?;
    let count = sub_agents.len();
    Ok(Json(Envelope::data(sub_agents).with_count(count)))
}

/// GET /api/sub-agents/:id
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/sub-agents/{id}",
    tag = "Sub-Agents",
    params(("id" = String, Path, description = "Sub-agent ID")),
    responses(
        (status = 200, description = "Sub-agent details", body = fairlist_core::Recipient),
        (status = 403, description = "Not the caller's sub-agent", body = ApiError),
        (status = 404, description = "Sub-agent not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn get_sub_agent(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<EntityId>,
) -> ApiResult<impl IntoResponse> {
    let sub_agent = get_owned_sub_agent(state.store.as_ref(), auth.user_id, id).await?;
    Ok(Json(Envelope::data(sub_agent)))
}

/// POST /api/sub-agents
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/sub-agents",
    tag = "Sub-Agents",
    request_body = CreateRecipientRequest,
    responses(
        (status = 201, description = "Sub-agent created", body = fairlist_core::Recipient),
        (status = 400, description = "Missing fields", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn create_sub_agent_handler(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    Json(req): Json<CreateRecipientRequest>,
) -> ApiResult<impl IntoResponse> {
    let sub_agent = create_sub_agent(state.store.as_ref(), auth.user_id, &req).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::data(sub_agent).with_message("Sub-agent created successfully")),
    ))
}

/// PUT /api/sub-agents/:id
#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/api/sub-agents/{id}",
    tag = "Sub-Agents",
    params(("id" = String, Path, description = "Sub-agent ID")),
    request_body = UpdateRecipientRequest,
    responses(
        (status = 200, description = "Sub-agent updated", body = fairlist_core::Recipient),
        (status = 403, description = "Not the caller's sub-agent", body = ApiError),
        (status = 404, description = "Sub-agent not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn update_sub_agent_handler(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<EntityId>,
    Json(req): Json<UpdateRecipientRequest>,
) -> ApiResult<impl IntoResponse> {
    let sub_agent = update_sub_agent(state.store.as_ref(), auth.user_id, id, req).await?;
    Ok(Json(
        Envelope::data(sub_agent).with_message("Sub-agent updated successfully"),
    ))
}

/// DELETE /api/sub-agents/:id - Soft delete
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/api/sub-agents/{id}",
    tag = "Sub-Agents",
    params(("id" = String, Path, description = "Sub-agent ID")),
    responses(
        (status = 200, description = "Sub-agent deactivated"),
        (status = 403, description = "Not the caller's sub-agent", body = ApiError),
        (status = 404, description = "Sub-agent not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn delete_sub_agent_handler(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    Path(id): Path<EntityId>,
) -> ApiResult<impl IntoResponse> {
    deactivate_sub_agent(state.store.as_ref(), auth.user_id, id).await?;
    Ok(Json(Envelope::data(()).with_message("Sub-agent deleted successfully")))
}

/// Create the sub-agent routes. Requires `auth_middleware` further out.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sub_agents).post(create_sub_agent_handler))
        .route(
            "/:id",
            get(get_sub_agent)
                .put(update_sub_agent_handler)
                .delete(delete_sub_agent_handler),
        )
        .route_layer(from_fn(require_agent))
}
