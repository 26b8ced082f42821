// Worker - Job execution loop

pub mod constants;
mod shutdown;

use constants::*;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::unique_queue::UniqueQueueService;
use crate::domain::JobDescriptor;
use crate::error::Result;
use crate::port::JobPerformer;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info};

/// How a reserved job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed(String),
    Panicked(String),
}

/// Worker processes jobs from one queue
pub struct Worker {
    queue: String,
    service: Arc<UniqueQueueService>,
    performer: Arc<dyn JobPerformer>,
}

impl Worker {
    pub fn new(
        queue: impl Into<String>,
        service: Arc<UniqueQueueService>,
        performer: Arc<dyn JobPerformer>,
    ) -> Self {
        Self {
            queue: queue.into(),
            service,
            performer,
        }
    }

    /// Run worker loop with graceful shutdown support
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(queue = %self.queue, "Worker started");
        loop {
            if shutdown.is_shutdown() {
                info!(queue = %self.queue, "Worker shutting down");
                break;
            }
            match self.process_next_job().await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tokio::select! {
                        _ = sleep(IDLE_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => {
                            info!("Worker interrupted during idle");
                            break;
                        }
                    }
                }
                Err(e) => {
                    error!(queue = %self.queue, error = %e, "Worker error");
                    tokio::select! {
                        _ = sleep(ERROR_RECOVERY_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => {
                            info!("Worker interrupted during error recovery");
                            break;
                        }
                    }
                }
            }
        }
        info!(queue = %self.queue, "Worker stopped");
        Ok(())
    }

    /// Reserve and perform the next job. `None` when the queue is empty.
    ///
    /// The job's lock is released at reservation. If the body fails or
    /// panics the failure hook releases it again before this returns.
    pub async fn process_next_job(&self) -> Result<Option<JobOutcome>> {
        let job = match self.service.reserve(&self.queue).await? {
            Some(j) => j,
            None => return Ok(None),
        };

        info!(queue = %job.queue, job_type = %job.job_type, "Processing job");

        // Spawned so a panicking job body cannot take the worker down
        let job = Arc::new(job);
        let job_for_exec = Arc::clone(&job);
        let performer = Arc::clone(&self.performer);
        let handle = tokio::task::spawn(async move { performer.perform(&job_for_exec).await });

        let outcome = match handle.await {
            Ok(Ok(())) => {
                info!(queue = %job.queue, job_type = %job.job_type, "Job completed");
                JobOutcome::Succeeded
            }
            Ok(Err(e)) => {
                error!(queue = %job.queue, job_type = %job.job_type, error = %e, "Job failed");
                self.fail(&job).await?;
                JobOutcome::Failed(e.to_string())
            }
            Err(join_err) => {
                if join_err.is_panic() {
                    error!(
                        queue = %job.queue,
                        job_type = %job.job_type,
                        "Job panicked: {:?}",
                        join_err
                    );
                } else {
                    error!(
                        queue = %job.queue,
                        job_type = %job.job_type,
                        "Job cancelled: {:?}",
                        join_err
                    );
                }
                self.fail(&job).await?;
                JobOutcome::Panicked(join_err.to_string())
            }
        };
        Ok(Some(outcome))
    }

    async fn fail(&self, job: &JobDescriptor) -> Result<()> {
        self.service.hook().on_failure(job).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        EnqueueOutcome, JobDefinition, JobPayload, JobRegistry, JobType, PendingStatus,
    };
    use crate::port::job_performer::mocks::MockPerformer;
    use crate::port::job_queue::mocks::InMemoryJobQueue;
    use crate::port::lock_store::mocks::InMemoryLockStore;
    use serde_json::json;

    fn service() -> Arc<UniqueQueueService> {
        let registry =
            JobRegistry::new().register(JobDefinition::unique("SomeUniqueJob", "other_queue"));
        Arc::new(UniqueQueueService::new(
            Arc::new(InMemoryJobQueue::new()),
            Arc::new(InMemoryLockStore::new()),
            Arc::new(registry),
        ))
    }

    fn foo() -> JobPayload {
        JobPayload::new(vec![json!("foo")])
    }

    fn job_type() -> JobType {
        JobType::new("SomeUniqueJob")
    }

    #[tokio::test]
    async fn test_empty_queue_processes_nothing() {
        let worker = Worker::new("other_queue", service(), Arc::new(MockPerformer::new_success()));
        assert_eq!(worker.process_next_job().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_successful_job() {
        let service = service();
        let performer = Arc::new(MockPerformer::new_success());
        let worker = Worker::new("other_queue", service.clone(), performer.clone());
        service.enqueue(&job_type(), foo()).await.unwrap();

        let outcome = worker.process_next_job().await.unwrap();
        assert_eq!(outcome, Some(JobOutcome::Succeeded));
        assert_eq!(performer.performed()[0].payload, foo());
        assert_eq!(
            service.enqueued(&job_type(), &foo()).await.unwrap(),
            PendingStatus::NotPending
        );
    }

    #[tokio::test]
    async fn test_failing_job_leaves_no_lock() {
        let service = service();
        let worker = Worker::new(
            "other_queue",
            service.clone(),
            Arc::new(MockPerformer::new_fail("I beg to differ")),
        );
        assert_eq!(
            service.enqueue(&job_type(), foo()).await.unwrap(),
            EnqueueOutcome::Admitted
        );
        assert_eq!(
            service.enqueue(&job_type(), foo()).await.unwrap(),
            EnqueueOutcome::Duplicate
        );

        let outcome = worker.process_next_job().await.unwrap();
        assert!(matches!(
            outcome,
            Some(JobOutcome::Failed(msg)) if msg.contains("I beg to differ")
        ));
        assert_eq!(service.size("other_queue").await.unwrap(), 0);
        assert_eq!(
            service.enqueue(&job_type(), foo()).await.unwrap(),
            EnqueueOutcome::Admitted
        );
    }

    #[tokio::test]
    async fn test_panicking_job_is_isolated() {
        let service = service();
        let worker = Worker::new(
            "other_queue",
            service.clone(),
            Arc::new(MockPerformer::new_panic_inducing("boom")),
        );
        service.enqueue(&job_type(), foo()).await.unwrap();

        let outcome = worker.process_next_job().await.unwrap();
        assert!(matches!(outcome, Some(JobOutcome::Panicked(_))));
        assert_eq!(
            service.enqueued(&job_type(), &foo()).await.unwrap(),
            PendingStatus::NotPending
        );
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let service = service();
        let performer = Arc::new(MockPerformer::new_success());
        let worker = Worker::new("other_queue", service.clone(), performer.clone());
        service.enqueue(&job_type(), foo()).await.unwrap();

        let (tx, token) = shutdown_channel();
        let handle = tokio::spawn(async move { worker.run(token).await });

        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while performer.call_count() == 0 {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        tx.shutdown();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap();
        assert!(result.unwrap().is_ok());
        assert_eq!(performer.call_count(), 1);
    }
}
