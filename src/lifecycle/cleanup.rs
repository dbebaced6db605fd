/// Cascading cleanup after a workflow is deleted
///
/// Once the record is gone from the store there is nothing to roll back, so
/// every step here is best-effort: each one runs regardless of how the others
/// went, its outcome is recorded in a [`CleanupReport`], and failures are
/// logged once at `warn`. Nothing is ever returned as an error.

use crate::collaborators::{
    cache::{execution_state_key, BACKUP_IDS_KEY, CLEAR_CACHE_KEY},
    CollaboratorError, HostedRegistry, LocalCache, RemoteBackend, TriggerManager,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::{fmt, sync::Arc};
use tokio::sync::Mutex;

/// Named cleanup steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupStep {
    /// Flush of the collection after the in-memory removal
    Persist,
    UninstallTriggers,
    /// Read of the backup-id list to decide whether a remote copy exists
    ResolveRemote,
    RemoteDelete,
    ForgetBackupId,
    MarkCacheStale,
    ClearExecutionState,
}

impl fmt::Display for CleanupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CleanupStep::Persist => "persist",
            CleanupStep::UninstallTriggers => "uninstall_triggers",
            CleanupStep::ResolveRemote => "resolve_remote",
            CleanupStep::RemoteDelete => "remote_delete",
            CleanupStep::ForgetBackupId => "forget_backup_id",
            CleanupStep::MarkCacheStale => "mark_cache_stale",
            CleanupStep::ClearExecutionState => "clear_execution_state",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StepOutcome {
    Done,
    /// Step did not apply to this workflow
    Skipped,
    Failed(String),
}

impl From<Result<(), CollaboratorError>> for StepOutcome {
    fn from(result: Result<(), CollaboratorError>) -> Self {
        match result {
            Ok(()) => StepOutcome::Done,
            Err(e) => StepOutcome::Failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub step: CleanupStep,
    pub outcome: StepOutcome,
}

/// Per-step outcome of one cascading cleanup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub workflow_id: String,
    pub steps: Vec<StepRecord>,
}

impl CleanupReport {
    pub fn new(workflow_id: &str) -> Self {
        Self {
            workflow_id: workflow_id.to_string(),
            steps: Vec::new(),
        }
    }

    /// Record a step outcome, logging it if it failed
    pub fn record(&mut self, step: CleanupStep, outcome: StepOutcome) {
        match &outcome {
            StepOutcome::Failed(reason) => {
                tracing::warn!(
                    workflow_id = %self.workflow_id,
                    step = %step,
                    error = %reason,
                    "Cleanup step failed"
                );
            }
            _ => tracing::debug!(workflow_id = %self.workflow_id, step = %step, ?outcome, "Cleanup step"),
        }
        self.steps.push(StepRecord { step, outcome });
    }

    pub fn outcome(&self, step: CleanupStep) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|record| record.step == step)
            .map(|record| &record.outcome)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps
            .iter()
            .filter(|record| matches!(record.outcome, StepOutcome::Failed(_)))
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Coordinates the teardown of triggers, remote copies and cached state
pub struct CleanupOrchestrator {
    triggers: Arc<dyn TriggerManager>,
    hosted: Arc<dyn HostedRegistry>,
    backend: Arc<dyn RemoteBackend>,
    cache: Arc<dyn LocalCache>,
    /// Serializes read-modify-write of the shared backup-id list
    backup_ids_lock: Mutex<()>,
}

impl CleanupOrchestrator {
    pub fn new(
        triggers: Arc<dyn TriggerManager>,
        hosted: Arc<dyn HostedRegistry>,
        backend: Arc<dyn RemoteBackend>,
        cache: Arc<dyn LocalCache>,
    ) -> Self {
        Self {
            triggers,
            hosted,
            backend,
            cache,
            backup_ids_lock: Mutex::new(()),
        }
    }

    /// Run every cleanup step for a deleted workflow
    pub async fn run(&self, workflow_id: &str) -> CleanupReport {
        let mut report = CleanupReport::new(workflow_id);
        self.run_into(workflow_id, &mut report).await;
        report
    }

    /// Same as [`run`](Self::run), appending to an existing report
    pub async fn run_into(&self, workflow_id: &str, report: &mut CleanupReport) {
        report.record(
            CleanupStep::UninstallTriggers,
            self.triggers.uninstall(workflow_id).await.into(),
        );

        let hosted = self.hosted.is_hosted(workflow_id).await;
        let is_backup = match self.read_backup_ids().await {
            Ok(ids) => {
                report.record(CleanupStep::ResolveRemote, StepOutcome::Done);
                ids.iter().any(|id| id == workflow_id)
            }
            Err(e) => {
                report.record(CleanupStep::ResolveRemote, StepOutcome::Failed(e.to_string()));
                false
            }
        };

        let remote = if hosted || is_backup {
            self.backend.delete_workflow(workflow_id).await.into()
        } else {
            StepOutcome::Skipped
        };
        report.record(CleanupStep::RemoteDelete, remote);

        let forget = if is_backup {
            self.forget_backup_id(workflow_id).await.into()
        } else {
            StepOutcome::Skipped
        };
        report.record(CleanupStep::ForgetBackupId, forget);

        report.record(
            CleanupStep::MarkCacheStale,
            self.cache.set(CLEAR_CACHE_KEY, json!(true)).await.into(),
        );

        report.record(
            CleanupStep::ClearExecutionState,
            self.cache.remove(&execution_state_key(workflow_id)).await.into(),
        );

        let failures = report.failures().count();
        if failures == 0 {
            tracing::info!("🧹 Cleaned up after deleted workflow: {}", workflow_id);
        } else {
            tracing::info!(
                "🧹 Cleaned up after deleted workflow: {} ({} step(s) failed)",
                workflow_id,
                failures
            );
        }
    }

    async fn read_backup_ids(&self) -> Result<Vec<String>, CollaboratorError> {
        let value = self.cache.get(BACKUP_IDS_KEY).await?;
        Ok(backup_ids_from(value))
    }

    /// Remove one id from the backup list under the list lock
    ///
    /// The list is re-read inside the lock, so a concurrent removal of another
    /// id is never overwritten with a stale copy.
    async fn forget_backup_id(&self, workflow_id: &str) -> Result<(), CollaboratorError> {
        let _guard = self.backup_ids_lock.lock().await;

        let mut ids = self.read_backup_ids().await?;
        let before = ids.len();
        ids.retain(|id| id != workflow_id);
        if ids.len() == before {
            return Ok(());
        }

        self.cache.set(BACKUP_IDS_KEY, json!(ids)).await
    }
}

fn backup_ids_from(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::fakes::{FakeBackend, FakeCache, FakeHosted, FakeTriggers};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    struct Harness {
        triggers: Arc<FakeTriggers>,
        hosted: Arc<FakeHosted>,
        backend: Arc<FakeBackend>,
        cache: Arc<FakeCache>,
        orchestrator: Arc<CleanupOrchestrator>,
    }

    fn harness(hosted: &[&str], backup_ids: &[&str]) -> Harness {
        let triggers = Arc::new(FakeTriggers::default());
        let hosted = Arc::new(FakeHosted::with(hosted));
        let backend = Arc::new(FakeBackend::default());
        let cache = Arc::new(FakeCache::with(BACKUP_IDS_KEY, json!(backup_ids)));
        let orchestrator = Arc::new(CleanupOrchestrator::new(
            triggers.clone(),
            hosted.clone(),
            backend.clone(),
            cache.clone(),
        ));
        Harness {
            triggers,
            hosted,
            backend,
            cache,
            orchestrator,
        }
    }

    #[tokio::test]
    async fn backup_id_is_removed_and_remote_copy_deleted() {
        let h = harness(&[], &["w1", "w2"]);
        h.cache.put(&execution_state_key("w1"), json!({ "running": true }));

        let report = h.orchestrator.run("w1").await;

        assert!(report.is_clean());
        assert_eq!(h.backend.deleted(), vec!["w1"]);
        assert_eq!(h.cache.entry(BACKUP_IDS_KEY), Some(json!(["w2"])));
        assert_eq!(h.cache.entry(CLEAR_CACHE_KEY), Some(json!(true)));
        assert_eq!(h.cache.entry(&execution_state_key("w1")), None);
        assert_eq!(*h.triggers.uninstalled.lock().unwrap(), vec!["w1"]);
        assert_eq!(report.outcome(CleanupStep::ForgetBackupId), Some(&StepOutcome::Done));
    }

    #[tokio::test]
    async fn hosted_workflow_is_deleted_remotely_without_touching_backups() {
        let h = harness(&["w9"], &["w1"]);

        let report = h.orchestrator.run("w9").await;

        assert!(report.is_clean());
        assert_eq!(h.backend.deleted(), vec!["w9"]);
        assert_eq!(h.cache.entry(BACKUP_IDS_KEY), Some(json!(["w1"])));
        assert_eq!(report.outcome(CleanupStep::ForgetBackupId), Some(&StepOutcome::Skipped));
        assert!(h.hosted.ids.lock().unwrap().contains("w9"));
    }

    #[tokio::test]
    async fn local_only_workflow_issues_no_remote_request() {
        let h = harness(&[], &["w1"]);
        h.cache.put(&execution_state_key("local"), json!({}));

        let report = h.orchestrator.run("local").await;

        assert!(report.is_clean());
        assert!(h.backend.deleted().is_empty());
        assert_eq!(report.outcome(CleanupStep::RemoteDelete), Some(&StepOutcome::Skipped));
        assert_eq!(h.cache.entry(&execution_state_key("local")), None);
    }

    #[tokio::test]
    async fn remote_failure_does_not_stop_later_steps() {
        let h = harness(&[], &["w1", "w2"]);
        h.backend.fail.store(true, Ordering::SeqCst);
        h.cache.put(&execution_state_key("w1"), json!({}));

        let report = h.orchestrator.run("w1").await;

        let failed: Vec<CleanupStep> = report.failures().map(|r| r.step).collect();
        assert_eq!(failed, vec![CleanupStep::RemoteDelete]);
        assert_eq!(h.cache.entry(BACKUP_IDS_KEY), Some(json!(["w2"])));
        assert_eq!(h.cache.entry(CLEAR_CACHE_KEY), Some(json!(true)));
        assert_eq!(h.cache.entry(&execution_state_key("w1")), None);
    }

    #[tokio::test]
    async fn every_failure_combination_is_contained_and_reported_once() {
        // bits: trigger uninstall, remote delete, cache get, cache set, cache remove
        for mask in 0u8..32 {
            let h = harness(&["w1"], &["w1", "w2"]);
            h.triggers.fail_uninstall.store(mask & 1 != 0, Ordering::SeqCst);
            h.backend.fail.store(mask & 2 != 0, Ordering::SeqCst);
            h.cache.fail_get.store(mask & 4 != 0, Ordering::SeqCst);
            h.cache.fail_set.store(mask & 8 != 0, Ordering::SeqCst);
            h.cache.fail_remove.store(mask & 16 != 0, Ordering::SeqCst);

            let report = h.orchestrator.run("w1").await;

            let mut expected = Vec::new();
            if mask & 1 != 0 {
                expected.push(CleanupStep::UninstallTriggers);
            }
            if mask & 4 != 0 {
                expected.push(CleanupStep::ResolveRemote);
            }
            if mask & 2 != 0 {
                expected.push(CleanupStep::RemoteDelete);
            }
            // forgetting the backup id needs both the read and the write
            if mask & 4 == 0 && mask & 8 != 0 {
                expected.push(CleanupStep::ForgetBackupId);
            }
            if mask & 8 != 0 {
                expected.push(CleanupStep::MarkCacheStale);
            }
            if mask & 16 != 0 {
                expected.push(CleanupStep::ClearExecutionState);
            }

            let failed: Vec<CleanupStep> = report.failures().map(|r| r.step).collect();
            assert_eq!(failed, expected, "failure mask {:05b}", mask);
            assert_eq!(report.steps.len(), 6, "every step recorded for mask {:05b}", mask);
            // hosted, so the remote delete is attempted even when the backup list is unreadable
            assert_eq!(h.backend.deleted(), vec!["w1"]);
        }
    }

    /// Counts WARN events emitted from this crate
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let metadata = event.metadata();
            if *metadata.level() == tracing::Level::WARN && metadata.target().starts_with("flowkeep") {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn each_failure_is_logged_once_at_warn() {
        for mask in 0u8..32 {
            let warnings = Arc::new(AtomicUsize::new(0));
            let _guard = tracing::subscriber::set_default(
                tracing_subscriber::registry().with(WarnCounter(warnings.clone())),
            );

            let h = harness(&["w1"], &["w1", "w2"]);
            h.triggers.fail_uninstall.store(mask & 1 != 0, Ordering::SeqCst);
            h.backend.fail.store(mask & 2 != 0, Ordering::SeqCst);
            h.cache.fail_get.store(mask & 4 != 0, Ordering::SeqCst);
            h.cache.fail_set.store(mask & 8 != 0, Ordering::SeqCst);
            h.cache.fail_remove.store(mask & 16 != 0, Ordering::SeqCst);

            let report = h.orchestrator.run("w1").await;

            assert_eq!(
                warnings.load(Ordering::SeqCst),
                report.failures().count(),
                "failure mask {:05b}",
                mask
            );
        }
    }

    #[tokio::test]
    async fn concurrent_backup_removals_do_not_resurrect_ids() {
        let h = harness(&[], &["w1", "w2", "w3", "w4"]);

        let a = {
            let orchestrator = h.orchestrator.clone();
            tokio::spawn(async move { orchestrator.run("w1").await })
        };
        let b = {
            let orchestrator = h.orchestrator.clone();
            tokio::spawn(async move { orchestrator.run("w3").await })
        };
        assert!(a.await.unwrap().is_clean());
        assert!(b.await.unwrap().is_clean());

        assert_eq!(h.cache.entry(BACKUP_IDS_KEY), Some(json!(["w2", "w4"])));
    }

    #[test]
    fn malformed_backup_list_reads_as_empty() {
        assert!(backup_ids_from(Some(json!("w1"))).is_empty());
        assert_eq!(backup_ids_from(Some(json!(["w1", 3]))), vec!["w1"]);
        assert!(backup_ids_from(None).is_empty());
    }

    #[test]
    fn report_serializes_with_step_names() {
        let mut report = CleanupReport::new("w1");
        report.record(CleanupStep::RemoteDelete, StepOutcome::Failed("boom".to_string()));
        report.record(CleanupStep::MarkCacheStale, StepOutcome::Done);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            json!({
                "workflow_id": "w1",
                "steps": [
                    { "step": "remote_delete", "outcome": { "status": "failed", "reason": "boom" } },
                    { "step": "mark_cache_stale", "outcome": { "status": "done" } }
                ]
            })
        );
    }
}
