/// Workflow management REST API endpoints
///
/// Thin HTTP surface over the workflow store. Every request goes through the
/// store's lifecycle pipelines; handlers only translate outcomes to HTTP.

use crate::{
    lifecycle::CleanupReport,
    workflow::{
        store::{LifecycleError, WorkflowStore},
        types::{Workflow, WorkflowPatch},
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    /// Workflow store running the lifecycle pipelines
    pub store: Arc<WorkflowStore>,
}

/// Response for workflow creation/update operations
#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    pub id: String,
    pub message: String,
}

/// Request body for workflow creation
#[derive(Debug, Deserialize)]
pub struct CreateWorkflowRequest {
    pub workflow: Workflow,
}

/// Request body for workflow update
#[derive(Debug, Deserialize)]
pub struct UpdateWorkflowRequest {
    pub workflow: WorkflowPatch,
}

type ApiError = (StatusCode, Json<Value>);

/// Create workflow management routes
pub fn create_workflow_routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflows", get(list_workflows).post(create_workflow))
        .route(
            "/api/workflows/{id}",
            get(get_workflow).put(update_workflow).delete(delete_workflow),
        )
}

fn lifecycle_error(error: LifecycleError) -> ApiError {
    let (status, id) = match &error {
        LifecycleError::Validation(_) => (StatusCode::BAD_REQUEST, None),
        LifecycleError::NotFound(id) => (StatusCode::NOT_FOUND, Some(id.clone())),
        LifecycleError::Decryption { id, .. } => (StatusCode::UNPROCESSABLE_ENTITY, Some(id.clone())),
        LifecycleError::Persistence { id, .. } => {
            tracing::error!("Failed to persist workflow {}: {}", id, error);
            (StatusCode::INTERNAL_SERVER_ERROR, Some(id.clone()))
        }
    };

    (status, Json(json!({ "error": error.to_string(), "id": id })))
}

/// Create a new workflow
///
/// POST /api/workflows
/// Body: { "workflow": { "name": "...", "drawflow": "...", ... } }
async fn create_workflow(
    State(state): State<AppState>,
    Json(payload): Json<CreateWorkflowRequest>,
) -> Result<(StatusCode, Json<WorkflowResponse>), ApiError> {
    let workflow = state
        .store
        .insert(payload.workflow)
        .await
        .map_err(lifecycle_error)?;

    Ok((
        StatusCode::CREATED,
        Json(WorkflowResponse {
            id: workflow.id.clone(),
            message: format!("Workflow '{}' created successfully", workflow.name),
        }),
    ))
}

/// List all workflows
///
/// GET /api/workflows
async fn list_workflows(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "workflows": state.store.list() }))
}

/// Get a specific workflow by ID
///
/// GET /api/workflows/{id}
async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Workflow>, StatusCode> {
    state.store.get(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// Update an existing workflow
///
/// PUT /api/workflows/{id}
/// Body: { "workflow": { "name": "...", "table": [...], ... } }
async fn update_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateWorkflowRequest>,
) -> Result<Json<WorkflowResponse>, ApiError> {
    let workflow = state
        .store
        .update(&id, payload.workflow)
        .await
        .map_err(lifecycle_error)?;

    Ok(Json(WorkflowResponse {
        id: workflow.id.clone(),
        message: format!("Workflow '{}' updated successfully", workflow.name),
    }))
}

/// Delete a workflow
///
/// DELETE /api/workflows/{id}
/// Returns the cleanup report; cleanup failures never turn into an error status.
async fn delete_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CleanupReport>, StatusCode> {
    state.store.delete(&id).await.map(Json).ok_or(StatusCode::NOT_FOUND)
}
