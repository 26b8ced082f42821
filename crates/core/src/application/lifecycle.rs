// Lifecycle Hook - releases unique-job locks when a job stops being pending
//
// Release points: reserved by a worker, destroyed in bulk, failed while
// being processed. Vacating is idempotent, so firing more than one of them
// for the same job is harmless.

use crate::application::gate::UniquenessGate;
use crate::domain::{JobDescriptor, JobType};
use crate::error::Result;
use std::sync::Arc;
use tracing::info;

pub struct LifecycleHook {
    gate: Arc<UniquenessGate>,
}

impl LifecycleHook {
    pub fn new(gate: Arc<UniquenessGate>) -> Self {
        Self { gate }
    }

    /// A worker took `job` off its queue. Runs before the job body.
    ///
    /// From here on an identical job is admitted again, even while this one runs.
    pub async fn on_reserved(&self, job: &JobDescriptor) -> Result<()> {
        self.release(job).await
    }

    /// The job body failed or panicked. By the time this returns the lock is gone.
    pub async fn on_failure(&self, job: &JobDescriptor) -> Result<()> {
        self.release(job).await
    }

    /// All queued jobs of `job_type` in `queue` were destroyed
    pub async fn on_destroyed(&self, queue: &str, job_type: &JobType) -> Result<u64> {
        if !self.gate.is_unique(job_type) {
            return Ok(0);
        }
        let released = self.gate.vacate_all(queue, job_type).await?;
        info!(queue = %queue, job_type = %job_type, released, "Released locks of destroyed jobs");
        Ok(released)
    }

    /// `queue` was dropped entirely
    pub async fn on_queue_removed(&self, queue: &str) -> Result<u64> {
        let released = self.gate.vacate_queue(queue).await?;
        info!(queue = %queue, released, "Released locks of removed queue");
        Ok(released)
    }

    async fn release(&self, job: &JobDescriptor) -> Result<()> {
        if !self.gate.is_unique(&job.job_type) {
            return Ok(());
        }
        self.gate
            .vacate(&job.queue, &job.job_type, &job.payload)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Admission, JobDefinition, JobPayload, JobRegistry};
    use crate::port::lock_store::mocks::InMemoryLockStore;
    use crate::port::LockStore;
    use serde_json::json;

    fn setup() -> (Arc<InMemoryLockStore>, Arc<UniquenessGate>, LifecycleHook) {
        let store = Arc::new(InMemoryLockStore::new());
        let registry = Arc::new(
            JobRegistry::new()
                .register(JobDefinition::plain("SomeJob", "some_queue"))
                .register(JobDefinition::unique("SomeUniqueJob", "other_queue")),
        );
        let gate = Arc::new(UniquenessGate::new(store.clone(), registry));
        let hook = LifecycleHook::new(gate.clone());
        (store, gate, hook)
    }

    fn unique_job(arg: &str) -> JobDescriptor {
        JobDescriptor::new(
            "other_queue",
            JobType::new("SomeUniqueJob"),
            JobPayload::new(vec![json!(arg)]),
        )
    }

    #[tokio::test]
    async fn test_reserve_then_failure_releases_once_and_tolerates_repeat() {
        let (store, gate, hook) = setup();
        let job = unique_job("foo");
        gate.admit(&job.queue, &job.job_type, &job.payload).await.unwrap();

        hook.on_reserved(&job).await.unwrap();
        assert!(store.is_empty());
        hook.on_failure(&job).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_failure_alone_releases() {
        let (store, gate, hook) = setup();
        let job = unique_job("foo");
        gate.admit(&job.queue, &job.job_type, &job.payload).await.unwrap();

        hook.on_failure(&job).await.unwrap();
        assert!(store.is_empty());
        assert_eq!(
            gate.admit(&job.queue, &job.job_type, &job.payload).await.unwrap(),
            Admission::Admitted
        );
    }

    #[tokio::test]
    async fn test_destroy_releases_every_payload_of_the_type() {
        let (store, gate, hook) = setup();
        for arg in ["a", "b", "c"] {
            let job = unique_job(arg);
            gate.admit(&job.queue, &job.job_type, &job.payload).await.unwrap();
        }

        let released = hook
            .on_destroyed("other_queue", &JobType::new("SomeUniqueJob"))
            .await
            .unwrap();
        assert_eq!(released, 3);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_plain_jobs_are_ignored() {
        let (store, _gate, hook) = setup();
        let job = JobDescriptor::new(
            "some_queue",
            JobType::new("SomeJob"),
            JobPayload::new(vec![json!("foo")]),
        );
        let fp = crate::domain::Fingerprint::encode(&job.job_type, &job.payload);
        store.try_acquire("some_queue", &fp, None).await.unwrap();

        hook.on_reserved(&job).await.unwrap();
        assert_eq!(
            hook.on_destroyed("some_queue", &JobType::new("SomeJob")).await.unwrap(),
            0
        );
        assert_eq!(store.len(), 1);
    }
}
