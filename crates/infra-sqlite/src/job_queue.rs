// SQLite JobQueue Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use loner_core::domain::{JobDescriptor, JobPayload, JobType};
use loner_core::error::{AppError, Result};
use loner_core::port::{JobQueue, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

/// FIFO queues stored in the `queued_jobs` table, ordered by row id
pub struct SqliteJobQueue {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteJobQueue {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

#[async_trait]
impl JobQueue for SqliteJobQueue {
    async fn push(&self, job: &JobDescriptor) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO queued_jobs (queue, job_type, args, enqueued_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&job.queue)
        .bind(job.job_type.as_str())
        .bind(job.payload.canonical_json())
        .bind(self.time_provider.now_millis())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(queue = %job.queue, job_type = %job.job_type, "Pushed job");
        Ok(())
    }

    async fn pop(&self, queue: &str) -> Result<Option<JobDescriptor>> {
        // Single statement: two workers can never pop the same row
        let row = sqlx::query_as::<_, QueuedJobRow>(
            r#"
            DELETE FROM queued_jobs
            WHERE id = (
                SELECT id FROM queued_jobs
                WHERE queue = ?
                ORDER BY id ASC
                LIMIT 1
            )
            RETURNING queue, job_type, args
            "#,
        )
        .bind(queue)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(QueuedJobRow::into_descriptor).transpose()
    }

    async fn remove_matching(
        &self,
        queue: &str,
        job_type: &JobType,
        payload: Option<&JobPayload>,
    ) -> Result<u64> {
        let args = payload.map(JobPayload::canonical_json);

        let result = sqlx::query(
            r#"
            DELETE FROM queued_jobs
            WHERE queue = ? AND job_type = ? AND (? IS NULL OR args = ?)
            "#,
        )
        .bind(queue)
        .bind(job_type.as_str())
        .bind(&args)
        .bind(&args)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn size(&self, queue: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queued_jobs WHERE queue = ?")
            .bind(queue)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(count as u64)
    }

    async fn remove_queue(&self, queue: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM queued_jobs WHERE queue = ?")
            .bind(queue)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct QueuedJobRow {
    queue: String,
    job_type: String,
    args: String,
}

impl QueuedJobRow {
    fn into_descriptor(self) -> Result<JobDescriptor> {
        let args: Vec<serde_json::Value> = serde_json::from_str(&self.args).map_err(|e| {
            AppError::Database(format!("Corrupt args for queued {} job: {}", self.job_type, e))
        })?;

        Ok(JobDescriptor::new(
            self.queue,
            JobType::new(self.job_type),
            JobPayload::new(args),
        ))
    }
}
