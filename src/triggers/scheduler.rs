/// Background trigger scheduler service
///
/// Manages scheduled workflows using tokio-cron-scheduler. Every workflow has
/// at most one job; installing again replaces it (hot-reload), uninstalling
/// removes it from the scheduler. Fired triggers are announced on a channel
/// for whichever runtime executes workflows.

use crate::{
    collaborators::{CollaboratorError, TriggerManager},
    workflow::types::{TriggerSchedule, Workflow},
};
use anyhow::Result;
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::{mpsc, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

/// Announcement that a workflow's trigger fired
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerFired {
    pub workflow_id: String,
    pub fired_at: chrono::DateTime<chrono::Utc>,
}

/// Hot-reload trigger scheduler
pub struct CronTriggerService {
    scheduler: Arc<RwLock<JobScheduler>>,
    /// workflow_id -> scheduler job UUID, for proper removal
    job_uuid_map: Arc<RwLock<HashMap<String, Uuid>>>,
    fired_tx: Option<mpsc::UnboundedSender<TriggerFired>>,
}

impl CronTriggerService {
    /// Create new trigger scheduler service
    pub async fn new(fired_tx: Option<mpsc::UnboundedSender<TriggerFired>>) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler: Arc::new(RwLock::new(scheduler)),
            job_uuid_map: Arc::new(RwLock::new(HashMap::new())),
            fired_tx,
        })
    }

    /// Start running scheduled jobs
    pub async fn start(&self) -> Result<()> {
        tracing::info!("⏰ Starting trigger scheduler service");
        {
            let scheduler = self.scheduler.read().await;
            scheduler.start().await?;
        }
        tracing::info!("✅ Trigger scheduler started successfully");
        Ok(())
    }

    /// Stop the scheduler and forget every job
    pub async fn stop(&self) -> Result<()> {
        tracing::info!("⏹️ Stopping trigger scheduler service");
        self.job_uuid_map.write().await.clear();
        {
            let mut scheduler = self.scheduler.write().await;
            scheduler.shutdown().await?;
        }
        tracing::info!("✅ Trigger scheduler stopped");
        Ok(())
    }

    /// Number of workflows with a scheduled job
    pub async fn job_count(&self) -> usize {
        self.job_uuid_map.read().await.len()
    }

    pub async fn has_job(&self, workflow_id: &str) -> bool {
        self.job_uuid_map.read().await.contains_key(workflow_id)
    }

    fn build_job(&self, workflow_id: &str, schedule: &TriggerSchedule) -> Result<Job, CollaboratorError> {
        let workflow_id_owned = workflow_id.to_string();
        let fired_tx = self.fired_tx.clone();

        let run = move |_uuid: Uuid, _l: JobScheduler| {
            let workflow_id = workflow_id_owned.clone();
            let fired_tx = fired_tx.clone();

            Box::pin(async move {
                tracing::debug!("🔔 Trigger activated for workflow {}", workflow_id);
                if let Some(tx) = fired_tx {
                    let fired = TriggerFired {
                        workflow_id: workflow_id.clone(),
                        fired_at: chrono::Utc::now(),
                    };
                    if tx.send(fired).is_err() {
                        tracing::debug!("⏭️ No listener for fired trigger of workflow {}", workflow_id);
                    }
                }
            }) as std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>>
        };

        let job = match schedule {
            TriggerSchedule::EveryMinutes(minutes) => {
                let secs = minutes.checked_mul(60).ok_or_else(|| {
                    CollaboratorError::Scheduler(format!("interval of {} minutes is out of range", minutes))
                })?;
                Job::new_repeated_async(Duration::from_secs(secs), run)
            }
            TriggerSchedule::Cron(expression) => Job::new_async(expression.as_str(), run),
        };

        job.map_err(|e| CollaboratorError::Scheduler(e.to_string()))
    }
}

#[async_trait]
impl TriggerManager for CronTriggerService {
    /// Add or replace the job for a workflow
    ///
    /// Disabled workflows and workflows without a time-based trigger end up
    /// with no job at all.
    async fn install(&self, workflow: &Workflow) -> Result<(), CollaboratorError> {
        self.uninstall(&workflow.id).await?;

        if workflow.is_disabled {
            tracing::debug!("📋 Workflow {} is disabled, no trigger installed", workflow.id);
            return Ok(());
        }
        let Some(schedule) = workflow.trigger.as_ref().and_then(|t| t.schedule()) else {
            tracing::debug!("📋 No time-based trigger in workflow: {}", workflow.id);
            return Ok(());
        };

        let job = self.build_job(&workflow.id, &schedule)?;
        let job_uuid = {
            let scheduler = self.scheduler.write().await;
            scheduler
                .add(job)
                .await
                .map_err(|e| CollaboratorError::Scheduler(e.to_string()))?
        };

        self.job_uuid_map
            .write()
            .await
            .insert(workflow.id.clone(), job_uuid);

        tracing::info!("🔥 Installed trigger for workflow {}: {:?}", workflow.id, schedule);
        Ok(())
    }

    async fn uninstall(&self, workflow_id: &str) -> Result<(), CollaboratorError> {
        let Some(job_uuid) = self.job_uuid_map.read().await.get(workflow_id).copied() else {
            return Ok(());
        };

        {
            let scheduler = self.scheduler.read().await;
            scheduler
                .remove(&job_uuid)
                .await
                .map_err(|e| CollaboratorError::Scheduler(e.to_string()))?;
        }

        // Tracked until the scheduler has actually dropped it
        {
            let mut jobs = self.job_uuid_map.write().await;
            if jobs.get(workflow_id) == Some(&job_uuid) {
                jobs.remove(workflow_id);
            }
        }

        tracing::info!("🗑️ Removed trigger for workflow: {}", workflow_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::WorkflowTrigger;

    fn scheduled(id: &str, trigger: WorkflowTrigger) -> Workflow {
        let mut workflow = Workflow::new("scheduled");
        workflow.id = id.to_string();
        workflow.trigger = Some(trigger);
        workflow
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn install_replaces_and_uninstall_removes() {
        let service = CronTriggerService::new(None).await.unwrap();

        service.install(&scheduled("w1", WorkflowTrigger::interval(5))).await.unwrap();
        service.install(&scheduled("w1", WorkflowTrigger::cron("0 9 * * *"))).await.unwrap();
        assert_eq!(service.job_count().await, 1);

        service.uninstall("w1").await.unwrap();
        assert!(!service.has_job("w1").await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn uninstalling_unknown_workflow_is_fine() {
        let service = CronTriggerService::new(None).await.unwrap();
        service.uninstall("never-installed").await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn manual_and_disabled_workflows_get_no_job() {
        let service = CronTriggerService::new(None).await.unwrap();

        let manual = scheduled("manual", serde_json::from_value(serde_json::json!({ "type": "manual" })).unwrap());
        service.install(&manual).await.unwrap();

        let mut disabled = scheduled("disabled", WorkflowTrigger::interval(1));
        disabled.is_disabled = true;
        service.install(&disabled).await.unwrap();

        assert_eq!(service.job_count().await, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn disabling_removes_existing_job() {
        let service = CronTriggerService::new(None).await.unwrap();
        let mut workflow = scheduled("w1", WorkflowTrigger::interval(1));
        service.install(&workflow).await.unwrap();

        workflow.is_disabled = true;
        service.install(&workflow).await.unwrap();

        assert!(!service.has_job("w1").await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_cron_expression_is_a_scheduler_error() {
        let service = CronTriggerService::new(None).await.unwrap();
        let workflow = scheduled("bad", WorkflowTrigger::cron("61 * * * * *"));

        let err = service.install(&workflow).await.unwrap_err();

        assert!(matches!(err, CollaboratorError::Scheduler(_)));
        assert_eq!(service.job_count().await, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn oversized_interval_is_a_scheduler_error() {
        let service = CronTriggerService::new(None).await.unwrap();
        let workflow = scheduled("big", WorkflowTrigger::interval(u64::MAX / 60 + 1));

        let err = service.install(&workflow).await.unwrap_err();

        assert!(matches!(err, CollaboratorError::Scheduler(_)));
        assert!(!service.has_job("big").await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_forgets_every_job() {
        let service = CronTriggerService::new(None).await.unwrap();
        service.install(&scheduled("w1", WorkflowTrigger::interval(5))).await.unwrap();
        service.start().await.unwrap();

        service.stop().await.unwrap();

        assert_eq!(service.job_count().await, 0);
    }
}
