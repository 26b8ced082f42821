// Job Queue Port (Interface)
//
// The underlying FIFO queue this layer augments. It knows nothing about
// uniqueness; lock handling happens around these calls.

use crate::domain::{JobDescriptor, JobPayload, JobType};
use crate::error::Result;
use async_trait::async_trait;

/// Underlying FIFO queue, one ordered sequence per queue name
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Append a descriptor to the tail of `job.queue`
    async fn push(&self, job: &JobDescriptor) -> Result<()>;

    /// Reserve (remove and return) the head of `queue`
    async fn pop(&self, queue: &str) -> Result<Option<JobDescriptor>>;

    /// Remove queued descriptors of `job_type`; with `payload`, only equivalent ones.
    /// Returns the number removed.
    async fn remove_matching(
        &self,
        queue: &str,
        job_type: &JobType,
        payload: Option<&JobPayload>,
    ) -> Result<u64>;

    /// Number of descriptors waiting in `queue`
    async fn size(&self, queue: &str) -> Result<u64>;

    /// Drop `queue` with everything in it. Returns the number removed.
    async fn remove_queue(&self, queue: &str) -> Result<u64>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// In-process FIFO queues
    #[derive(Default)]
    pub struct InMemoryJobQueue {
        queues: Mutex<HashMap<String, VecDeque<JobDescriptor>>>,
        fail_push: AtomicBool,
    }

    impl InMemoryJobQueue {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make subsequent pushes fail (storage outage)
        pub fn set_fail_push(&self, fail: bool) {
            self.fail_push.store(fail, Ordering::SeqCst);
        }

        /// Snapshot of a queue's contents, head first
        pub fn contents(&self, queue: &str) -> Vec<JobDescriptor> {
            self.queues
                .lock()
                .unwrap()
                .get(queue)
                .map(|q| q.iter().cloned().collect())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl JobQueue for InMemoryJobQueue {
        async fn push(&self, job: &JobDescriptor) -> Result<()> {
            if self.fail_push.load(Ordering::SeqCst) {
                return Err(AppError::Database("push failed (mock)".to_string()));
            }
            self.queues
                .lock()
                .unwrap()
                .entry(job.queue.clone())
                .or_default()
                .push_back(job.clone());
            Ok(())
        }

        async fn pop(&self, queue: &str) -> Result<Option<JobDescriptor>> {
            Ok(self
                .queues
                .lock()
                .unwrap()
                .get_mut(queue)
                .and_then(|q| q.pop_front()))
        }

        async fn remove_matching(
            &self,
            queue: &str,
            job_type: &JobType,
            payload: Option<&JobPayload>,
        ) -> Result<u64> {
            let mut queues = self.queues.lock().unwrap();
            let Some(q) = queues.get_mut(queue) else {
                return Ok(0);
            };
            let before = q.len();
            q.retain(|job| !job.matches(job_type, payload));
            Ok((before - q.len()) as u64)
        }

        async fn size(&self, queue: &str) -> Result<u64> {
            Ok(self
                .queues
                .lock()
                .unwrap()
                .get(queue)
                .map_or(0, |q| q.len() as u64))
        }

        async fn remove_queue(&self, queue: &str) -> Result<u64> {
            Ok(self
                .queues
                .lock()
                .unwrap()
                .remove(queue)
                .map_or(0, |q| q.len() as u64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::InMemoryJobQueue;
    use super::*;
    use serde_json::json;

    fn job(queue: &str, job_type: &str, arg: serde_json::Value) -> JobDescriptor {
        JobDescriptor::new(queue, JobType::new(job_type), JobPayload::new(vec![arg]))
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = InMemoryJobQueue::new();
        queue.push(&job("q", "A", json!(1))).await.unwrap();
        queue.push(&job("q", "A", json!(2))).await.unwrap();

        assert_eq!(queue.pop("q").await.unwrap(), Some(job("q", "A", json!(1))));
        assert_eq!(queue.pop("q").await.unwrap(), Some(job("q", "A", json!(2))));
        assert_eq!(queue.pop("q").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_matching_by_payload() {
        let queue = InMemoryJobQueue::new();
        queue.push(&job("q", "A", json!(22))).await.unwrap();
        queue.push(&job("q", "A", json!(23))).await.unwrap();
        queue.push(&job("q", "B", json!(22))).await.unwrap();

        let payload = JobPayload::new(vec![json!(22)]);
        let removed = queue
            .remove_matching("q", &JobType::new("A"), Some(&payload))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(queue.size("q").await.unwrap(), 2);

        let removed = queue
            .remove_matching("q", &JobType::new("B"), None)
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(queue.contents("q"), vec![job("q", "A", json!(23))]);
    }

    #[tokio::test]
    async fn test_remove_queue() {
        let queue = InMemoryJobQueue::new();
        queue.push(&job("q", "A", json!(1))).await.unwrap();
        queue.push(&job("other", "A", json!(1))).await.unwrap();

        assert_eq!(queue.remove_queue("q").await.unwrap(), 1);
        assert_eq!(queue.size("q").await.unwrap(), 0);
        assert_eq!(queue.size("other").await.unwrap(), 1);
    }
}
