/// Collaborator seams
///
/// Everything the lifecycle manager talks to outside its own memory goes
/// through one of these traits: durable storage, the trigger subsystem, the
/// remote backend, the hosted-workflow registry, the local key/value cache and
/// the process-wide secret. Production implementations live in the submodules;
/// tests swap in the recording fakes.

pub mod cache;
pub mod hosted;
pub mod remote;
pub mod secret;

#[cfg(test)]
pub mod fakes;

use async_trait::async_trait;
use serde_json::Value;

use crate::workflow::types::Workflow;

pub use cache::SqliteCache;
pub use hosted::HostedWorkflows;
pub use remote::HttpBackend;
pub use secret::StaticSecret;

/// Failure reported by a collaborator
#[derive(thiserror::Error, Debug)]
pub enum CollaboratorError {
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote responded {status}: {reason}")]
    RemoteStatus { status: u16, reason: String },
    #[error("scheduler error: {0}")]
    Scheduler(String),
    #[error("{0}")]
    Unavailable(String),
}

/// Durable storage for whole entity collections
#[async_trait]
pub trait DurableStorage: Send + Sync {
    /// Replace the stored contents of `collection` with `records`. Idempotent.
    async fn save(&self, collection: &str, records: &[Workflow]) -> Result<(), CollaboratorError>;

    async fn load(&self, collection: &str) -> Result<Vec<Workflow>, CollaboratorError>;
}

/// Trigger subsystem
#[async_trait]
pub trait TriggerManager: Send + Sync {
    /// Register (or re-register) the triggers a workflow describes
    async fn install(&self, workflow: &Workflow) -> Result<(), CollaboratorError>;

    /// Drop every trigger registered for a workflow id
    async fn uninstall(&self, workflow_id: &str) -> Result<(), CollaboratorError>;
}

/// Remote backup/hosting backend
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Delete the remote copy of a workflow. Non-success responses are errors.
    async fn delete_workflow(&self, workflow_id: &str) -> Result<(), CollaboratorError>;
}

/// Registry of workflows hosted remotely, independent of backups
#[async_trait]
pub trait HostedRegistry: Send + Sync {
    async fn is_hosted(&self, workflow_id: &str) -> bool;
}

/// Local key/value cache
#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, CollaboratorError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), CollaboratorError>;

    async fn remove(&self, key: &str) -> Result<(), CollaboratorError>;
}

/// Source of the implicit passphrase for protected workflows without `pass`
pub trait SecretSource: Send + Sync {
    fn implicit_passphrase(&self) -> Result<String, CollaboratorError>;
}
