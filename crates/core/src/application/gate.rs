// Uniqueness Gate
//
// Per (queue, fingerprint): Absent --admit--> Pending --vacate--> Absent.
// Only job types registered as unique take part; everything else bypasses the gate.

use crate::domain::{Admission, Fingerprint, JobPayload, JobRegistry, JobType, PendingStatus};
use crate::error::Result;
use crate::port::LockStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Admission control for unique jobs, backed by a shared lock store
pub struct UniquenessGate {
    lock_store: Arc<dyn LockStore>,
    registry: Arc<JobRegistry>,
}

impl UniquenessGate {
    pub fn new(lock_store: Arc<dyn LockStore>, registry: Arc<JobRegistry>) -> Self {
        Self {
            lock_store,
            registry,
        }
    }

    /// Whether `job_type` is registered with the uniqueness capability
    pub fn is_unique(&self, job_type: &JobType) -> bool {
        self.registry
            .get(job_type)
            .is_some_and(|def| def.uniqueness.is_unique())
    }

    fn lock_ttl(&self, job_type: &JobType) -> Option<Duration> {
        self.registry
            .get(job_type)
            .and_then(|def| def.uniqueness.lock_ttl())
    }

    /// Try to move (queue, fingerprint) from Absent to Pending.
    ///
    /// `Duplicate` is a normal outcome. Errors only when the store cannot answer.
    pub async fn admit(
        &self,
        queue: &str,
        job_type: &JobType,
        payload: &JobPayload,
    ) -> Result<Admission> {
        let fingerprint = Fingerprint::encode(job_type, payload);
        let acquired = self
            .lock_store
            .try_acquire(queue, &fingerprint, self.lock_ttl(job_type))
            .await?;

        let admission = if acquired {
            Admission::Admitted
        } else {
            Admission::Duplicate
        };
        debug!(queue = %queue, fingerprint = %fingerprint, ?admission, "Gate decision");
        Ok(admission)
    }

    /// Pending -> Absent for one payload. No-op when already absent.
    pub async fn vacate(
        &self,
        queue: &str,
        job_type: &JobType,
        payload: &JobPayload,
    ) -> Result<()> {
        let fingerprint = Fingerprint::encode(job_type, payload);
        self.lock_store.release(queue, &fingerprint).await?;
        debug!(queue = %queue, fingerprint = %fingerprint, "Lock vacated");
        Ok(())
    }

    /// Pending -> Absent for every payload of `job_type` in `queue`
    pub async fn vacate_all(&self, queue: &str, job_type: &JobType) -> Result<u64> {
        let released = self.lock_store.release_all(queue, job_type).await?;
        debug!(queue = %queue, job_type = %job_type, released, "Locks vacated for job type");
        Ok(released)
    }

    /// Pending -> Absent for everything scoped to `queue`
    pub async fn vacate_queue(&self, queue: &str) -> Result<u64> {
        let released = self.lock_store.release_queue(queue).await?;
        debug!(queue = %queue, released, "Locks vacated for queue");
        Ok(released)
    }

    /// Side-effect free read of the state machine
    pub async fn is_pending(
        &self,
        queue: &str,
        job_type: &JobType,
        payload: &JobPayload,
    ) -> Result<bool> {
        let fingerprint = Fingerprint::encode(job_type, payload);
        self.lock_store.exists(queue, &fingerprint).await
    }

    /// Tri-state query: `NotApplicable` for job types that are not unique
    pub async fn pending_status(
        &self,
        queue: &str,
        job_type: &JobType,
        payload: &JobPayload,
    ) -> Result<PendingStatus> {
        if !self.is_unique(job_type) {
            return Ok(PendingStatus::NotApplicable);
        }
        Ok(self.is_pending(queue, job_type, payload).await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobDefinition;
    use crate::port::lock_store::mocks::{InMemoryLockStore, UnavailableLockStore};
    use serde_json::json;

    fn registry() -> Arc<JobRegistry> {
        Arc::new(
            JobRegistry::new()
                .register(JobDefinition::plain("SomeJob", "some_queue"))
                .register(JobDefinition::unique("SomeUniqueJob", "other_queue")),
        )
    }

    fn foo() -> JobPayload {
        JobPayload::new(vec![json!("foo")])
    }

    #[tokio::test]
    async fn test_admit_then_duplicate() {
        let gate = UniquenessGate::new(Arc::new(InMemoryLockStore::new()), registry());
        let job_type = JobType::new("SomeUniqueJob");

        assert_eq!(gate.admit("q", &job_type, &foo()).await.unwrap(), Admission::Admitted);
        assert_eq!(gate.admit("q", &job_type, &foo()).await.unwrap(), Admission::Duplicate);
        assert!(gate.is_pending("q", &job_type, &foo()).await.unwrap());
    }

    #[tokio::test]
    async fn test_vacate_returns_to_absent() {
        let gate = UniquenessGate::new(Arc::new(InMemoryLockStore::new()), registry());
        let job_type = JobType::new("SomeUniqueJob");

        gate.admit("q", &job_type, &foo()).await.unwrap();
        gate.vacate("q", &job_type, &foo()).await.unwrap();
        gate.vacate("q", &job_type, &foo()).await.unwrap();
        assert!(!gate.is_pending("q", &job_type, &foo()).await.unwrap());
        assert_eq!(gate.admit("q", &job_type, &foo()).await.unwrap(), Admission::Admitted);
    }

    #[tokio::test]
    async fn test_pending_status_for_plain_job_is_not_applicable() {
        let gate = UniquenessGate::new(Arc::new(InMemoryLockStore::new()), registry());

        let status = gate
            .pending_status("some_queue", &JobType::new("SomeJob"), &foo())
            .await
            .unwrap();
        assert_eq!(status, PendingStatus::NotApplicable);

        let status = gate
            .pending_status("other_queue", &JobType::new("SomeUniqueJob"), &foo())
            .await
            .unwrap();
        assert_eq!(status, PendingStatus::NotPending);
    }

    #[tokio::test]
    async fn test_store_failure_is_surfaced() {
        let gate = UniquenessGate::new(Arc::new(UnavailableLockStore), registry());
        let err = gate
            .admit("q", &JobType::new("SomeUniqueJob"), &foo())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
