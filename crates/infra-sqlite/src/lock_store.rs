// SQLite LockStore Implementation
//
// Atomic set-if-absent is one upsert: insert the row, or take over an
// expired one. A live row makes the statement change nothing.

use crate::error::map_lock_error;
use async_trait::async_trait;
use loner_core::domain::{Fingerprint, JobType};
use loner_core::error::Result;
use loner_core::port::{LockStore, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

/// Lock store backed by the `unique_locks` table.
///
/// Shared only by processes that open the same database file.
pub struct SqliteLockStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteLockStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

#[async_trait]
impl LockStore for SqliteLockStore {
    async fn try_acquire(
        &self,
        queue: &str,
        fingerprint: &Fingerprint,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let now = self.time_provider.now_millis();
        let expires_at = ttl.map(|t| now + t.as_millis() as i64);

        let result = sqlx::query(
            r#"
            INSERT INTO unique_locks (queue, job_type, digest, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (queue, job_type, digest) DO UPDATE
            SET created_at = excluded.created_at, expires_at = excluded.expires_at
            WHERE unique_locks.expires_at IS NOT NULL AND unique_locks.expires_at <= ?
            "#,
        )
        .bind(queue)
        .bind(fingerprint.job_type().as_str())
        .bind(fingerprint.digest())
        .bind(now)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_lock_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, queue: &str, fingerprint: &Fingerprint) -> Result<()> {
        sqlx::query("DELETE FROM unique_locks WHERE queue = ? AND job_type = ? AND digest = ?")
            .bind(queue)
            .bind(fingerprint.job_type().as_str())
            .bind(fingerprint.digest())
            .execute(&self.pool)
            .await
            .map_err(map_lock_error)?;

        Ok(())
    }

    async fn exists(&self, queue: &str, fingerprint: &Fingerprint) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM unique_locks
            WHERE queue = ? AND job_type = ? AND digest = ?
              AND (expires_at IS NULL OR expires_at > ?)
            "#,
        )
        .bind(queue)
        .bind(fingerprint.job_type().as_str())
        .bind(fingerprint.digest())
        .bind(self.time_provider.now_millis())
        .fetch_one(&self.pool)
        .await
        .map_err(map_lock_error)?;

        Ok(count > 0)
    }

    async fn release_all(&self, queue: &str, job_type: &JobType) -> Result<u64> {
        let result = sqlx::query("DELETE FROM unique_locks WHERE queue = ? AND job_type = ?")
            .bind(queue)
            .bind(job_type.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_lock_error)?;

        Ok(result.rows_affected())
    }

    async fn release_queue(&self, queue: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM unique_locks WHERE queue = ?")
            .bind(queue)
            .execute(&self.pool)
            .await
            .map_err(map_lock_error)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use loner_core::domain::JobPayload;
    use loner_core::port::time_provider::mocks::FixedTimeProvider;
    use serde_json::json;
    use tokio_test::assert_ok;

    async fn setup_test_store() -> (SqliteLockStore, Arc<FixedTimeProvider>) {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let clock = Arc::new(FixedTimeProvider::new(1_000_000));
        (SqliteLockStore::new(pool, clock.clone()), clock)
    }

    fn fingerprint(job_type: &str, arg: &str) -> Fingerprint {
        Fingerprint::encode(&JobType::new(job_type), &JobPayload::new(vec![json!(arg)]))
    }

    #[tokio::test]
    async fn test_acquire_once() {
        let (store, _) = setup_test_store().await;
        let fp = fingerprint("SomeUniqueJob", "foo");

        assert!(store.try_acquire("q", &fp, None).await.unwrap());
        assert!(!store.try_acquire("q", &fp, None).await.unwrap());
        assert!(store.exists("q", &fp).await.unwrap());
        assert!(!store.exists("other", &fp).await.unwrap());
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let (store, _) = setup_test_store().await;
        let fp = fingerprint("SomeUniqueJob", "foo");

        assert_ok!(store.release("q", &fp).await);
        store.try_acquire("q", &fp, None).await.unwrap();
        assert_ok!(store.release("q", &fp).await);
        assert_ok!(store.release("q", &fp).await);
        assert!(!store.exists("q", &fp).await.unwrap());
        assert!(store.try_acquire("q", &fp, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_ttl_expiry_and_takeover() {
        let (store, clock) = setup_test_store().await;
        let fp = fingerprint("SomeUniqueJob", "foo");

        assert!(store
            .try_acquire("q", &fp, Some(Duration::from_secs(60)))
            .await
            .unwrap());
        clock.advance(59_000);
        assert!(!store.try_acquire("q", &fp, None).await.unwrap());

        clock.advance(1_000);
        assert!(!store.exists("q", &fp).await.unwrap());
        assert!(store.try_acquire("q", &fp, None).await.unwrap());

        // taken over without ttl: never expires now
        clock.advance(10_000_000);
        assert!(store.exists("q", &fp).await.unwrap());
    }

    #[tokio::test]
    async fn test_release_all_and_queue() {
        let (store, _) = setup_test_store().await;
        store.try_acquire("q", &fingerprint("A", "1"), None).await.unwrap();
        store.try_acquire("q", &fingerprint("A", "2"), None).await.unwrap();
        store.try_acquire("q", &fingerprint("B", "1"), None).await.unwrap();
        store.try_acquire("p", &fingerprint("A", "1"), None).await.unwrap();

        assert_eq!(store.release_all("q", &JobType::new("A")).await.unwrap(), 2);
        assert!(store.exists("q", &fingerprint("B", "1")).await.unwrap());
        assert_eq!(store.release_queue("q").await.unwrap(), 1);
        assert!(store.exists("p", &fingerprint("A", "1")).await.unwrap());
    }
}
