/// HTTP API Layer
///
/// REST endpoints over the workflow store:
/// - Workflow create / read / update / delete
/// - Delete responses carry the cascading cleanup report

// Workflow management endpoints (POST/GET/PUT/DELETE)
pub mod workflows;

// Re-export router builder
pub use workflows::{create_workflow_routes, AppState};
