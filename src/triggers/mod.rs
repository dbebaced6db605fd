/// Trigger subsystem
///
/// Turns the time-based trigger descriptors of workflows (`interval`,
/// `cron-job`) into scheduled jobs, and tears them down again when a workflow
/// is updated, disabled or deleted.

// Background job scheduler for time-based triggers
pub mod scheduler;

pub use scheduler::{CronTriggerService, TriggerFired};
