//! OpenAPI Document for the Fairlist API
//!
//! Generated with utoipa from the route annotations and schema derives.
//! Served at `/openapi.json`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ApiError, ErrorCode};
use crate::routes::health::{ComponentHealth, HealthDetails, HealthResponse, HealthStatus};
use crate::routes::{agents, health, lists, sub_agents};
use crate::types::{
    BatchDetails, BatchTasks, CleanupResponse, CreateRecipientRequest, EntryView, RecipientLists,
    UpdateRecipientRequest,
};

use fairlist_core::{
    BatchId, CleanupReport, ListEntry, Recipient, RecipientCount, RecipientKind, RecipientRef,
    UploadReport, UploaderKind, UploaderRef,
};

/// OpenAPI document for the Fairlist API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fairlist API",
        version = "0.1.0",
        description = "Contact list ingest, deduplication and fair distribution across agents",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Lists", description = "Uploads, distributed list views and duplicate cleanup"),
        (name = "Agents", description = "Agent management (admin)"),
        (name = "Sub-Agents", description = "Sub-agent management (agent)"),
        (name = "Health", description = "Liveness and readiness")
    ),
    paths(
        lists::upload_list,
        lists::list_admin_uploads,
        lists::list_admin_batches,
        lists::remove_duplicates,
        lists::my_tasks,
        lists::my_uploads,
        lists::my_batches,
        agents::list_agents,
        agents::get_agent_by_id,
        agents::create_agent_handler,
        agents::update_agent_handler,
        agents::delete_agent_handler,
        sub_agents::list_sub_agents,
        sub_agents::get_sub_agent,
        sub_agents::create_sub_agent_handler,
        sub_agents::update_sub_agent_handler,
        sub_agents::delete_sub_agent_handler,
        health::liveness,
        health::readiness,
    ),
    components(schemas(
        ApiError,
        ErrorCode,
        BatchId,
        Recipient,
        RecipientKind,
        RecipientRef,
        UploaderKind,
        UploaderRef,
        ListEntry,
        RecipientCount,
        UploadReport,
        CleanupReport,
        EntryView,
        RecipientLists,
        BatchTasks,
        BatchDetails,
        CleanupResponse,
        CreateRecipientRequest,
        UpdateRecipientRequest,
        HealthResponse,
        HealthStatus,
        HealthDetails,
        ComponentHealth,
    )),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the JWT bearer scheme referenced by `security(("bearer_auth" = []))`.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token"))
                        .build(),
                ),
            );
        }
    }
}

impl ApiDoc {
    /// Render the document as pretty JSON.
    pub fn to_json() -> Result<String, serde_json::Error> {
        Self::openapi().to_pretty_json()
    }
}
