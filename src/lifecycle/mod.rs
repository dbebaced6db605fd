/// Workflow lifecycle side effects
///
/// Holds the delete-time cascading cleanup. The create-time pipeline lives in
/// the store itself (`workflow::store`) since it has to run before commit.

pub mod cleanup;

pub use cleanup::{CleanupOrchestrator, CleanupReport, CleanupStep, StepOutcome};
