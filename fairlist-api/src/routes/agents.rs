//! Agent REST API Routes (admin only)

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
use crate::middleware::require_admin;
use crate::services::{create_agent, deactivate_agent, get_agent, update_agent};
use crate::state::AppState;
use crate::types::{CreateRecipientRequest, Envelope, UpdateRecipientRequest};

/// GET /api/agents - Active agents in distribution order
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/agents",
    tag = "Agents",
    responses(
        (status = 200, description = "Active agents", body = Vec<fairlist_core::Recipient>),
        (status = 403, description = "Admin only", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn list_agents(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let agents = state.store.recipient_list_active(RecipientPool::Agents).await?;
    let count = agents.len();
    Ok(Json(Envelope::data(agents).with_count(count)))
}

/// GET /api/agents/:id
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/agents/{id}",
    tag = "Agents",
    params(("id" = String, Path, description = "Agent ID")),
    responses(
        (status = 200, description = "Agent details", body = fairlist_core::Recipient),
        (status = 404, description = "Agent not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn get_agent_by_id(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<impl IntoResponse> {
    let agent = get_agent(state.store.as_ref(), id).await?;
    Ok(Json(Envelope::data(agent)))
}

/// POST /api/agents
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/agents",
    tag = "Agents",
    request_body = CreateRecipientRequest,
    responses(
        (status = 201, description = "Agent created", body = fairlist_core::Recipient),
        (status = 400, description = "Missing fields", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn create_agent_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateRecipientRequest>,
) -> ApiResult<impl IntoResponse> {
    let agent = create_agent(state.store.as_ref(), &req).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::data(agent).with_message("Agent created successfully")),
    ))
}

/// PUT /api/agents/:id
#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/api/agents/{id}",
    tag = "Agents",
    params(("id" = String, Path, description = "Agent ID")),
    request_body = UpdateRecipientRequest,
    responses(
        (status = 200, description = "Agent updated", body = fairlist_core::Recipient),
        (status = 404, description = "Agent not found", body = ApiError),
        (status = 409, description = "Email already in use", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn update_agent_handler(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(req): Json<UpdateRecipientRequest>,
) -> ApiResult<impl IntoResponse> {
    let agent = update_agent(state.store.as_ref(), id, req).await?;
    Ok(Json(Envelope::data(agent).with_message("Agent updated successfully")))
}

/// DELETE /api/agents/:id - Soft delete
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/api/agents/{id}",
    tag = "Agents",
    params(("id" = String, Path, description = "Agent ID")),
    responses(
        (status = 200, description = "Agent deactivated"),
        (status = 404, description = "Agent not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn delete_agent_handler(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<impl IntoResponse> {
    deactivate_agent(state.store.as_ref(), id).await?;
    Ok(Json(Envelope::data(()).with_message("Agent deleted successfully")))
}

/// Create the agent routes. Requires `auth_middleware` further out.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_agents).post(create_agent_handler))
        .route(
            "/:id",
            get(get_agent_by_id)
                .put(update_agent_handler)
                .delete(delete_agent_handler),
        )
        .route_layer(from_fn(require_admin))
}
