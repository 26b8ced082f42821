// Enqueue Use Case

use crate::application::gate::UniquenessGate;
use crate::domain::{Admission, EnqueueOutcome, JobDefinition, JobDescriptor, JobPayload};
use crate::error::Result;
use crate::port::JobQueue;
use tracing::{error, info, warn};

/// Execute enqueue use case
///
/// Plain jobs go straight to the queue. Unique jobs are pushed only when the
/// gate admits them; if the push itself fails the fresh lock is released again
/// so no phantom pending entry is left behind.
///
/// # Arguments
///
/// * `job_queue` - Underlying queue
/// * `gate` - Uniqueness gate
/// * `definition` - Registered definition of the job type
/// * `queue` - Target queue (already resolved)
/// * `payload` - Job arguments
pub async fn execute(
    job_queue: &dyn JobQueue,
    gate: &UniquenessGate,
    definition: &JobDefinition,
    queue: &str,
    payload: JobPayload,
) -> Result<EnqueueOutcome> {
    let job = JobDescriptor::new(queue, definition.job_type.clone(), payload);

    if !definition.uniqueness.is_unique() {
        job_queue.push(&job).await?;
        return Ok(EnqueueOutcome::Enqueued);
    }

    // Fail closed: a store error propagates and nothing is pushed
    let admission = gate.admit(queue, &job.job_type, &job.payload).await?;
    if admission == Admission::Duplicate {
        warn!(queue = %queue, job_type = %job.job_type, "Duplicate unique job rejected");
        return Ok(EnqueueOutcome::Duplicate);
    }

    if let Err(push_err) = job_queue.push(&job).await {
        warn!(
            queue = %queue,
            job_type = %job.job_type,
            error = %push_err,
            "Push failed, rolling back lock"
        );
        if let Err(release_err) = gate.vacate(queue, &job.job_type, &job.payload).await {
            error!(
                queue = %queue,
                job_type = %job.job_type,
                error = %release_err,
                "Lock rollback failed, entry stays until released or expired"
            );
        }
        return Err(push_err);
    }

    info!(queue = %queue, job_type = %job.job_type, "Unique job admitted");
    Ok(admission.into())
}
