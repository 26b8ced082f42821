// Lock Store Port (Interface)
//
// Shared key-value store holding one entry per pending unique job,
// keyed by (queue, fingerprint). Every method is a single atomic request.

use crate::domain::{Fingerprint, JobType};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Atomic lock store for pending unique jobs
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Create the entry if absent (or expired). Returns true when this call created it.
    ///
    /// Must be one atomic set-if-absent on the shared store; a read followed by
    /// a write lets two producers both win.
    async fn try_acquire(
        &self,
        queue: &str,
        fingerprint: &Fingerprint,
        ttl: Option<Duration>,
    ) -> Result<bool>;

    /// Delete the entry. Deleting a missing entry is a no-op.
    async fn release(&self, queue: &str, fingerprint: &Fingerprint) -> Result<()>;

    /// Whether a live entry exists. No side effects.
    async fn exists(&self, queue: &str, fingerprint: &Fingerprint) -> Result<bool>;

    /// Delete every entry created for (queue, job_type). Returns how many were removed.
    async fn release_all(&self, queue: &str, job_type: &JobType) -> Result<u64>;

    /// Delete every entry scoped to `queue`. Returns how many were removed.
    async fn release_queue(&self, queue: &str) -> Result<u64>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use crate::port::time_provider::{SystemTimeProvider, TimeProvider};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type LockKey = (String, JobType, String);

    /// In-process lock store. The mutex makes set-if-absent atomic within one process.
    pub struct InMemoryLockStore {
        // value: expiry in epoch ms, None = no expiry
        entries: Mutex<HashMap<LockKey, Option<i64>>>,
        time_provider: Arc<dyn TimeProvider>,
    }

    impl InMemoryLockStore {
        pub fn new() -> Self {
            Self::with_time_provider(Arc::new(SystemTimeProvider))
        }

        pub fn with_time_provider(time_provider: Arc<dyn TimeProvider>) -> Self {
            Self {
                entries: Mutex::new(HashMap::new()),
                time_provider,
            }
        }

        /// Number of live entries (expired ones excluded)
        pub fn len(&self) -> usize {
            let now = self.time_provider.now_millis();
            self.entries
                .lock()
                .unwrap()
                .values()
                .filter(|expiry| is_live(**expiry, now))
                .count()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        fn key(queue: &str, fingerprint: &Fingerprint) -> LockKey {
            (
                queue.to_string(),
                fingerprint.job_type().clone(),
                fingerprint.digest().to_string(),
            )
        }
    }

    impl Default for InMemoryLockStore {
        fn default() -> Self {
            Self::new()
        }
    }

    fn is_live(expiry: Option<i64>, now: i64) -> bool {
        expiry.map_or(true, |at| at > now)
    }

    #[async_trait]
    impl LockStore for InMemoryLockStore {
        async fn try_acquire(
            &self,
            queue: &str,
            fingerprint: &Fingerprint,
            ttl: Option<Duration>,
        ) -> Result<bool> {
            let now = self.time_provider.now_millis();
            let mut entries = self.entries.lock().unwrap();
            let key = Self::key(queue, fingerprint);

            if let Some(expiry) = entries.get(&key) {
                if is_live(*expiry, now) {
                    return Ok(false);
                }
            }
            let expiry = ttl.map(|t| now + t.as_millis() as i64);
            entries.insert(key, expiry);
            Ok(true)
        }

        async fn release(&self, queue: &str, fingerprint: &Fingerprint) -> Result<()> {
            self.entries
                .lock()
                .unwrap()
                .remove(&Self::key(queue, fingerprint));
            Ok(())
        }

        async fn exists(&self, queue: &str, fingerprint: &Fingerprint) -> Result<bool> {
            let now = self.time_provider.now_millis();
            Ok(self
                .entries
                .lock()
                .unwrap()
                .get(&Self::key(queue, fingerprint))
                .is_some_and(|expiry| is_live(*expiry, now)))
        }

        async fn release_all(&self, queue: &str, job_type: &JobType) -> Result<u64> {
            let mut entries = self.entries.lock().unwrap();
            let before = entries.len();
            entries.retain(|(q, t, _), _| !(q == queue && t == job_type));
            Ok((before - entries.len()) as u64)
        }

        async fn release_queue(&self, queue: &str) -> Result<u64> {
            let mut entries = self.entries.lock().unwrap();
            let before = entries.len();
            entries.retain(|(q, _, _), _| q != queue);
            Ok((before - entries.len()) as u64)
        }
    }

    /// Lock store whose backend is unreachable: every call fails
    pub struct UnavailableLockStore;

    fn unavailable() -> AppError {
        AppError::StoreUnavailable("connection refused (mock)".to_string())
    }

    #[async_trait]
    impl LockStore for UnavailableLockStore {
        async fn try_acquire(&self, _: &str, _: &Fingerprint, _: Option<Duration>) -> Result<bool> {
            Err(unavailable())
        }
        async fn release(&self, _: &str, _: &Fingerprint) -> Result<()> {
            Err(unavailable())
        }
        async fn exists(&self, _: &str, _: &Fingerprint) -> Result<bool> {
            Err(unavailable())
        }
        async fn release_all(&self, _: &str, _: &JobType) -> Result<u64> {
            Err(unavailable())
        }
        async fn release_queue(&self, _: &str) -> Result<u64> {
            Err(unavailable())
        }
    }
}
