/// Workflow Management Layer
///
/// This module handles workflow definitions, normalization and persistence:
/// - Type definitions (Workflow, TableColumn, WorkflowSettings, WorkflowTrigger)
/// - Column schema normalization
/// - SQLite persistence with sqlx
/// - The lock-free entity store running the create/update/delete pipelines

// Core workflow type definitions
pub mod types;

// Legacy column migration and column id assignment
pub mod columns;

// SQLite persistence layer for workflow collections
pub mod storage;

// Entity store using ArcSwap for lock-free reads
pub mod store;

// Re-export commonly used types
pub use store::{LifecycleError, WorkflowStore};
pub use types::{TableColumn, Workflow, WorkflowPatch, WorkflowSettings, WorkflowTrigger};
