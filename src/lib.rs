/// Flowkeep: workflow entity lifecycle manager
///
/// Normalizes and decrypts workflows on creation, keeps every mutation durable,
/// and tears down triggers, remote copies and cached state on deletion.

// Core configuration and setup
pub mod config;

// Workflow management layer - definitions, normalization, storage and the entity store
pub mod workflow;

// Protected workflow content - passphrase resolution, key derivation, decryption
pub mod crypto;

// Collaborator seams and their production implementations
pub mod collaborators;

// Delete-time cascading cleanup
pub mod lifecycle;

// Time-based trigger scheduling
pub mod triggers;

// HTTP API layer - REST endpoints for workflow management
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use lifecycle::{CleanupOrchestrator, CleanupReport, CleanupStep, StepOutcome};
pub use server::start_server;
pub use workflow::{LifecycleError, Workflow, WorkflowStore};
