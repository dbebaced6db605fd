/// Workflow entity store
///
/// Owns the canonical in-memory collection of workflows and runs every
/// mutation through an explicit pipeline:
///
/// - insert: normalize columns -> resolve protection -> commit -> install
///   triggers -> flush
/// - update: apply patch -> normalize columns -> commit -> reinstall triggers
///   -> flush
/// - delete: remove -> flush -> cascading cleanup
///
/// The collection lives behind an `ArcSwap`, so readers never block and every
/// commit is an atomic pointer swap.

use crate::{
    collaborators::{CollaboratorError, DurableStorage, SecretSource, TriggerManager},
    crypto::{resolve_protection, CodecError},
    lifecycle::cleanup::{CleanupOrchestrator, CleanupReport, CleanupStep},
    workflow::{
        columns::normalize_columns,
        types::{new_workflow_id, Workflow, WorkflowPatch},
    },
};
use arc_swap::ArcSwap;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

/// Name of the collection flushed to durable storage
pub const WORKFLOWS_COLLECTION: &str = "workflows";

#[derive(thiserror::Error, Debug)]
pub enum LifecycleError {
    #[error("invalid workflow: {0}")]
    Validation(String),
    #[error("workflow not found: {0}")]
    NotFound(String),
    /// Protected content could not be opened; nothing was committed
    #[error("cannot decrypt workflow {id}: {source}")]
    Decryption {
        id: String,
        #[source]
        source: CodecError,
    },
    /// The change is committed in memory but the flush failed
    #[error("workflow {id} committed but not persisted: {source}")]
    Persistence {
        id: String,
        #[source]
        source: CollaboratorError,
    },
}

/// In-memory entity store with durable write-behind
pub struct WorkflowStore {
    /// Key: workflow_id, Value: committed workflow
    workflows: ArcSwap<HashMap<String, Workflow>>,
    storage: Arc<dyn DurableStorage>,
    secrets: Arc<dyn SecretSource>,
    triggers: Arc<dyn TriggerManager>,
    cleanup: CleanupOrchestrator,
    /// Flushes are serialized so an older snapshot never lands after a newer one
    flush_lock: Mutex<()>,
}

impl WorkflowStore {
    pub fn new(
        storage: Arc<dyn DurableStorage>,
        secrets: Arc<dyn SecretSource>,
        triggers: Arc<dyn TriggerManager>,
        cleanup: CleanupOrchestrator,
    ) -> Self {
        Self {
            workflows: ArcSwap::new(Arc::new(HashMap::new())),
            storage,
            secrets,
            triggers,
            cleanup,
            flush_lock: Mutex::new(()),
        }
    }

    /// Populate the store from durable storage
    ///
    /// Records are committed as stored; they went through the create pipeline
    /// before they were first persisted.
    pub async fn init_from_storage(&self) -> Result<usize, CollaboratorError> {
        let stored = self.storage.load(WORKFLOWS_COLLECTION).await?;
        let loaded: HashMap<String, Workflow> = stored
            .into_iter()
            .map(|workflow| (workflow.id.clone(), workflow))
            .collect();
        let count = loaded.len();

        self.workflows.store(Arc::new(loaded));

        tracing::info!("Initialized workflow store with {} workflows", count);
        Ok(count)
    }

    /// Install triggers for every stored workflow (startup only)
    pub async fn install_all_triggers(&self) {
        for workflow in self.list() {
            if let Err(e) = self.triggers.install(&workflow).await {
                tracing::warn!("⚠️ Failed to install triggers for workflow {}: {}", workflow.id, e);
            }
        }
    }

    pub fn get(&self, workflow_id: &str) -> Option<Workflow> {
        self.workflows.load().get(workflow_id).cloned()
    }

    pub fn list(&self) -> Vec<Workflow> {
        let mut workflows: Vec<Workflow> = self.workflows.load().values().cloned().collect();
        workflows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        workflows
    }

    pub fn len(&self) -> usize {
        self.workflows.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.load().is_empty()
    }

    /// Create a workflow from a (possibly partial) payload
    ///
    /// Fails without committing anything on validation or decryption errors.
    /// A flush failure is reported as [`LifecycleError::Persistence`] while the
    /// in-memory commit stands.
    pub async fn insert(&self, payload: Workflow) -> Result<Workflow, LifecycleError> {
        let mut candidate = payload;
        if candidate.id.trim().is_empty() {
            candidate.id = new_workflow_id();
        }
        if self.workflows.load().contains_key(&candidate.id) {
            return Err(LifecycleError::Validation(format!(
                "workflow {} already exists",
                candidate.id
            )));
        }

        let normalized = normalize_columns(candidate);
        let id = normalized.id.clone();
        let workflow = resolve_protection(normalized, self.secrets.as_ref())
            .map_err(|source| LifecycleError::Decryption { id: id.clone(), source })?;

        self.commit(workflow.clone());
        tracing::info!("🔥 Created workflow: {} ({})", workflow.id, workflow.name);

        if let Err(e) = self.triggers.install(&workflow).await {
            tracing::warn!("⚠️ Failed to install triggers for workflow {}: {}", workflow.id, e);
        }

        self.sync()
            .await
            .map_err(|source| LifecycleError::Persistence { id, source })?;

        Ok(workflow)
    }

    /// Apply a patch to an existing workflow
    pub async fn update(&self, workflow_id: &str, patch: WorkflowPatch) -> Result<Workflow, LifecycleError> {
        let mut workflow = self
            .get(workflow_id)
            .ok_or_else(|| LifecycleError::NotFound(workflow_id.to_string()))?;
        workflow.apply(patch);
        let workflow = normalize_columns(workflow);

        self.commit(workflow.clone());
        tracing::info!("🔥 Updated workflow: {} ({})", workflow.id, workflow.name);

        if let Err(e) = self.triggers.install(&workflow).await {
            tracing::warn!("⚠️ Failed to reinstall triggers for workflow {}: {}", workflow.id, e);
        }

        self.sync().await.map_err(|source| LifecycleError::Persistence {
            id: workflow_id.to_string(),
            source,
        })?;

        Ok(workflow)
    }

    /// Delete a workflow and run the cascading cleanup
    ///
    /// Returns `None` if no such workflow exists. Otherwise the delete has
    /// happened, whatever the report says about individual cleanup steps.
    pub async fn delete(&self, workflow_id: &str) -> Option<CleanupReport> {
        let removed = self.remove(workflow_id)?;
        tracing::info!("🗑️ Deleted workflow: {} ({})", removed.id, removed.name);

        let mut report = CleanupReport::new(workflow_id);
        report.record(CleanupStep::Persist, self.sync().await.into());
        self.cleanup.run_into(workflow_id, &mut report).await;

        Some(report)
    }

    /// Flush the whole collection to durable storage
    pub async fn sync(&self) -> Result<(), CollaboratorError> {
        let _guard = self.flush_lock.lock().await;
        let snapshot: Vec<Workflow> = self.workflows.load().values().cloned().collect();
        self.storage.save(WORKFLOWS_COLLECTION, &snapshot).await
    }

    fn commit(&self, workflow: Workflow) {
        self.workflows.rcu(|current| {
            let mut next = (**current).clone();
            next.insert(workflow.id.clone(), workflow.clone());
            next
        });
    }

    fn remove(&self, workflow_id: &str) -> Option<Workflow> {
        let mut removed = None;
        self.workflows.rcu(|current| {
            let mut next = (**current).clone();
            removed = next.remove(workflow_id);
            next
        });
        removed
    }
}
