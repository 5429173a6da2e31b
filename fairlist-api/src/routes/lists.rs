//! Contact List REST API Routes
//!
//! Upload, read views and duplicate cleanup. Admin and agent routes share
//! handlers where the caller's role already decides the behavior.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    middleware::from_fn,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use fairlist_core::{BatchId, RecipientRef};
use fairlist_storage::{cleanup_duplicates, EntryFilter};

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::middleware::{require_admin, require_agent, AuthExtractor};
use crate::services::{
    batch_details, group_by_batch, group_by_recipient, process_upload, spool_upload,
    upload_target,
};
use crate::state::AppState;
use crate::types::{
    AdminListsQuery, CleanupResponse, Envelope, MyUploadsQuery, CLEANUP_SUCCESS_MESSAGE,
    UPLOAD_SUCCESS_MESSAGE,
};

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

// ============================================================================
// UPLOAD
// ============================================================================

/// Upload a CSV/XLSX/XLS file and distribute its records.
///
/// Admins distribute across active agents; agents across their own active
/// sub-agents. The file is sent as the `file` field of a multipart body.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/lists/upload",
    tag = "Lists",
    responses(
        (status = 201, description = "File uploaded and distributed", body = crate::types::UploadResponse),
        (status = 400, description = "Unsupported, unreadable, empty or invalid file", body = ApiError),
        (status = 409, description = "Every record was a duplicate", body = ApiError),
        (status = 413, description = "File too large", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn upload_list(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let spooled = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::invalid_input(format!("Malformed multipart body: {}", e)))?
            .ok_or_else(|| ApiError::new(ErrorCode::MissingField, "Please upload a file"))?;
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        break spool_upload(file_name, field, state.config.clone()).await?;
    };

    tracing::info!(
        user_id = %auth.user_id,
        role = %auth.role,
        file_name = %spooled.file_name,
        size = spooled.size,
        "Processing upload"
    );

    let bytes = spooled.read().await?;
    let (uploader, pool) = upload_target(&auth);
    let report = process_upload(&state, &bytes, spooled.format, uploader, pool).await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::data(report).with_message(UPLOAD_SUCCESS_MESSAGE)),
    ))
}

// ============================================================================
// ADMIN VIEWS
// ============================================================================

/// Admin uploads, newest first, grouped by agent.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/lists",
    tag = "Lists",
    params(AdminListsQuery),
    responses(
        (status = 200, description = "Entries grouped by agent", body = Vec<crate::types::RecipientLists>),
        (status = 403, description = "Admin only", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn list_admin_uploads(
    State(state): State<AppState>,
    Query(query): Query<AdminListsQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = EntryFilter::admin_uploads()
        .with_batch(query.batch_id.map(BatchId::from_uuid))
        .with_recipient(query.agent_id.map(RecipientRef::Agent));

    let entries = state.store.entries_query(&filter).await?;
    let groups = group_by_recipient(state.store.as_ref(), &entries).await?;
    Ok(Json(Envelope::data(groups).with_count(entries.len())))
}

/// Admin batches, newest first.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/lists/batches",
    tag = "Lists",
    responses(
        (status = 200, description = "Upload batches", body = Vec<crate::types::BatchDetails>),
        (status = 403, description = "Admin only", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn list_admin_batches(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let summaries = state.store.batches_list(&EntryFilter::admin_uploads()).await?;
    let details = batch_details(state.store.as_ref(), summaries).await?;
    Ok(Json(Envelope::data(details)))
}

/// Purge duplicates across every stored entry; the oldest copy survives.
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/api/lists/remove-duplicates",
    tag = "Lists",
    responses(
        (status = 200, description = "Cleanup report", body = CleanupResponse),
        (status = 403, description = "Admin only", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn remove_duplicates(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    tracing::info!(user_id = %auth.user_id, "Starting duplicate cleanup");
    let report = cleanup_duplicates(state.store.as_ref()).await?;
    Ok(Json(
        Envelope::data(CleanupResponse::from(report)).with_message(CLEANUP_SUCCESS_MESSAGE),
    ))
}

// ============================================================================
// AGENT VIEWS
// ============================================================================

/// Entries assigned to the calling agent, grouped by batch.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/lists/my-tasks",
    tag = "Lists",
    responses(
        (status = 200, description = "Tasks grouped by batch", body = Vec<crate::types::BatchTasks>),
        (status = 403, description = "Agents only", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn my_tasks(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    let filter = EntryFilter::assigned_to(RecipientRef::Agent(auth.user_id));
    let entries = state.store.entries_query(&filter).await?;
    let groups = group_by_batch(state.store.as_ref(), &entries).await?;
    Ok(Json(Envelope::data(groups).with_count(entries.len())))
}

/// The calling agent's uploads, grouped by sub-agent.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/lists/my-uploads",
    tag = "Lists",
    params(MyUploadsQuery),
    responses(
        (status = 200, description = "Entries grouped by sub-agent", body = Vec<crate::types::RecipientLists>),
        (status = 403, description = "Agents only", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn my_uploads(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
    Query(query): Query<MyUploadsQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter =
        EntryFilter::uploaded_by(auth.uploader()).with_batch(query.batch_id.map(BatchId::from_uuid));
    let entries = state.store.entries_query(&filter).await?;
    let groups = group_by_recipient(state.store.as_ref(), &entries).await?;
    Ok(Json(Envelope::data(groups).with_count(entries.len())))
}

/// The calling agent's batches, newest first.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/lists/my-batches",
    tag = "Lists",
    responses(
        (status = 200, description = "Upload batches", body = Vec<crate::types::BatchDetails>),
        (status = 403, description = "Agents only", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn my_batches(
    State(state): State<AppState>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    let summaries = state
        .store
        .batches_list(&EntryFilter::uploaded_by(auth.uploader()))
        .await?;
    let details = batch_details(state.store.as_ref(), summaries).await?;
    Ok(Json(Envelope::data(details)))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the list routes. Requires `auth_middleware` further out.
pub fn create_router(max_upload_bytes: usize) -> Router<AppState> {
    let body_limit = DefaultBodyLimit::max(max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES));

    let admin = Router::new()
        .route("/", get(list_admin_uploads))
        .route("/upload", post(upload_list))
        .route("/batches", get(list_admin_batches))
        .route("/remove-duplicates", delete(remove_duplicates))
        .route_layer(from_fn(require_admin));

    let agent = Router::new()
        .route("/agent-upload", post(upload_list))
        .route("/my-tasks", get(my_tasks))
        .route("/my-uploads", get(my_uploads))
        .route("/my-batches", get(my_batches))
        .route_layer(from_fn(require_agent));

    admin.merge(agent).layer(body_limit)
}
