//! Background job scheduler.
//!
//! Registers the recurring ingestion job. The job only queues a trigger; the
//! pipeline driver owns cycle execution and coalesces overlapping requests.

use pulse_pipeline::{Trigger, TriggerHandle, TriggerStatus};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    triggers: TriggerHandle,
    cycle_cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_ingestion_job(&scheduler, triggers, cycle_cron).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the recurring ingestion job on `cycle_cron` (six-field, seconds first).
async fn register_ingestion_job(
    scheduler: &JobScheduler,
    triggers: TriggerHandle,
    cycle_cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cycle_cron, move |_uuid, _lock| {
        let triggers = triggers.clone();

        Box::pin(async move {
            match triggers.request(Trigger::Schedule) {
                TriggerStatus::Queued => {
                    tracing::info!("scheduler: ingestion cycle queued");
                }
                TriggerStatus::Coalesced => {
                    tracing::info!("scheduler: cycle already pending; tick coalesced");
                }
                TriggerStatus::Closed => {
                    tracing::error!("scheduler: ingestion driver is not running");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = cycle_cron, "scheduler: ingestion job registered");
    Ok(())
}
