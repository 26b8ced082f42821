// Unique Queue Service - uniqueness-aware facade over the underlying queue

pub mod enqueue;

use crate::application::gate::UniquenessGate;
use crate::application::lifecycle::LifecycleHook;
use crate::domain::job::{validate_job_type, validate_queue_name};
use crate::domain::{
    EnqueueOutcome, JobDefinition, JobDescriptor, JobPayload, JobRegistry, JobType, PendingStatus,
};
use crate::error::{AppError, Result};
use crate::port::{JobQueue, LockStore};
use std::sync::Arc;
use tracing::{error, info};

/// Public surface for producers and workers
pub struct UniqueQueueService {
    job_queue: Arc<dyn JobQueue>,
    registry: Arc<JobRegistry>,
    gate: Arc<UniquenessGate>,
    hook: LifecycleHook,
}

impl UniqueQueueService {
    pub fn new(
        job_queue: Arc<dyn JobQueue>,
        lock_store: Arc<dyn LockStore>,
        registry: Arc<JobRegistry>,
    ) -> Self {
        let gate = Arc::new(UniquenessGate::new(lock_store, Arc::clone(&registry)));
        let hook = LifecycleHook::new(Arc::clone(&gate));
        Self {
            job_queue,
            registry,
            gate,
            hook,
        }
    }

    /// Look up a registered job type. Names become lock key segments, so a
    /// definition registered in code with an unusable name is rejected here.
    fn definition(&self, job_type: &JobType) -> Result<&JobDefinition> {
        validate_job_type(job_type)?;
        let definition = self
            .registry
            .get(job_type)
            .ok_or_else(|| AppError::UnknownJobType(job_type.to_string()))?;
        validate_queue_name(&definition.default_queue)?;
        Ok(definition)
    }

    /// Enqueue to the job type's default queue
    pub async fn enqueue(&self, job_type: &JobType, payload: JobPayload) -> Result<EnqueueOutcome> {
        let queue = self.definition(job_type)?.default_queue.clone();
        self.enqueue_to(&queue, job_type, payload).await
    }

    /// Enqueue to an explicit queue
    pub async fn enqueue_to(
        &self,
        queue: &str,
        job_type: &JobType,
        payload: JobPayload,
    ) -> Result<EnqueueOutcome> {
        validate_queue_name(queue)?;
        let definition = self.definition(job_type)?;
        enqueue::execute(
            self.job_queue.as_ref(),
            self.gate.as_ref(),
            definition,
            queue,
            payload,
        )
        .await
    }

    /// Remove matching queued jobs from `queue` and release their lock.
    /// Returns how many descriptors were removed.
    pub async fn dequeue_from(
        &self,
        queue: &str,
        job_type: &JobType,
        payload: &JobPayload,
    ) -> Result<u64> {
        validate_queue_name(queue)?;
        let definition = self.definition(job_type)?;
        let removed = self
            .job_queue
            .remove_matching(queue, job_type, Some(payload))
            .await?;
        // Nothing removed: the lock may belong to a producer between admit and push
        if removed > 0 && definition.uniqueness.is_unique() {
            self.gate.vacate(queue, job_type, payload).await?;
        }
        info!(queue = %queue, job_type = %job_type, removed, "Dequeued jobs");
        Ok(removed)
    }

    /// Pending-ness in the job type's default queue
    pub async fn enqueued(
        &self,
        job_type: &JobType,
        payload: &JobPayload,
    ) -> Result<PendingStatus> {
        let queue = self.definition(job_type)?.default_queue.clone();
        self.enqueued_in(&queue, job_type, payload).await
    }

    /// Pending-ness in an explicit queue
    pub async fn enqueued_in(
        &self,
        queue: &str,
        job_type: &JobType,
        payload: &JobPayload,
    ) -> Result<PendingStatus> {
        validate_queue_name(queue)?;
        self.definition(job_type)?;
        self.gate.pending_status(queue, job_type, payload).await
    }

    /// Take the next job off `queue` for processing, releasing its lock first
    ///
    /// A lock that cannot be released is logged rather than returned as an
    /// error: the job has already left the queue and must not be dropped.
    /// The failure hook and the lock TTL are the remaining release points.
    pub async fn reserve(&self, queue: &str) -> Result<Option<JobDescriptor>> {
        let Some(job) = self.job_queue.pop(queue).await? else {
            return Ok(None);
        };
        if let Err(e) = self.hook.on_reserved(&job).await {
            error!(
                queue = %queue,
                job_type = %job.job_type,
                error = %e,
                "Failed to release lock on reserve"
            );
        }
        Ok(Some(job))
    }

    /// Destroy every queued job of `job_type` in `queue` and release their locks
    pub async fn destroy(&self, queue: &str, job_type: &JobType) -> Result<u64> {
        validate_queue_name(queue)?;
        validate_job_type(job_type)?;
        let removed = self.job_queue.remove_matching(queue, job_type, None).await?;
        self.hook.on_destroyed(queue, job_type).await?;
        info!(queue = %queue, job_type = %job_type, removed, "Destroyed jobs");
        Ok(removed)
    }

    /// Drop `queue` with all its jobs and locks
    pub async fn remove_queue(&self, queue: &str) -> Result<u64> {
        validate_queue_name(queue)?;
        let removed = self.job_queue.remove_queue(queue).await?;
        self.hook.on_queue_removed(queue).await?;
        Ok(removed)
    }

    pub async fn size(&self, queue: &str) -> Result<u64> {
        self.job_queue.size(queue).await
    }

    /// Hook for the worker's failure path
    pub fn hook(&self) -> &LifecycleHook {
        &self.hook
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }
}
