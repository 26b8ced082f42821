// Redis LockStore Implementation
//
// Key layout: {prefix}:queue:{queue}:lock:{job_type}:{digest}
// Queue and job type segments are escaped (':' -> %3A, '%' -> %25), so every
// (queue) and (queue, job_type) scope is a plain key prefix of its own keys only.

use crate::config::RedisConfig;
use async_trait::async_trait;
use loner_core::domain::{Fingerprint, JobType};
use loner_core::error::{AppError, Result};
use loner_core::port::LockStore;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisResult};
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Lock store on a Redis server shared by all producers and workers
pub struct RedisLockStore {
    connection_manager: ConnectionManager,
    config: RedisConfig,
}

impl RedisLockStore {
    /// Connect using the given configuration
    pub async fn connect(config: RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str()).map_err(|e| {
            AppError::StoreUnavailable(format!("Invalid Redis url '{}': {}", config.url, e))
        })?;

        let connection_manager = timeout(config.connection_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                AppError::StoreUnavailable(format!(
                    "Redis connection timed out after {}ms",
                    config.connection_timeout.as_millis()
                ))
            })?
            .map_err(map_redis_error)?;

        Ok(Self {
            connection_manager,
            config,
        })
    }

    /// Execute a Redis command with timeout
    async fn with_timeout<F, T>(&self, operation: F) -> Result<T>
    where
        F: std::future::Future<Output = RedisResult<T>>,
    {
        timeout(self.config.command_timeout, operation)
            .await
            .map_err(|_| {
                AppError::StoreUnavailable(format!(
                    "Redis command timed out after {}ms",
                    self.config.command_timeout.as_millis()
                ))
            })?
            .map_err(map_redis_error)
    }

    fn lock_key(&self, queue: &str, fingerprint: &Fingerprint) -> String {
        lock_key(&self.config.key_prefix, queue, fingerprint)
    }

    /// SCAN keys matching `pattern` and DEL them batch by batch
    async fn delete_matching(&self, pattern: &str) -> Result<u64> {
        let mut conn = self.connection_manager.clone();
        let mut cursor = 0u64;
        let mut deleted = 0u64;
        loop {
            let (next, keys): (u64, Vec<String>) = self
                .with_timeout(
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(self.config.scan_count)
                        .query_async(&mut conn),
                )
                .await?;
            if !keys.is_empty() {
                let removed: u64 = self.with_timeout(conn.del(keys)).await?;
                deleted += removed;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(deleted)
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn try_acquire(
        &self,
        queue: &str,
        fingerprint: &Fingerprint,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let mut conn = self.connection_manager.clone();
        let key = self.lock_key(queue, fingerprint);

        // SET NX [PX ttl] is the single atomic set-if-absent
        let mut cmd = redis::cmd("SET");
        cmd.arg(&key).arg(1).arg("NX");
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl.as_millis().max(1) as u64);
        }
        let result: Option<String> = self.with_timeout(cmd.query_async(&mut conn)).await?;

        debug!(key = %key, acquired = result.is_some(), "SET NX");
        Ok(result.is_some())
    }

    async fn release(&self, queue: &str, fingerprint: &Fingerprint) -> Result<()> {
        let mut conn = self.connection_manager.clone();
        let key = self.lock_key(queue, fingerprint);
        let _: u64 = self.with_timeout(conn.del(&key)).await?;
        Ok(())
    }

    async fn exists(&self, queue: &str, fingerprint: &Fingerprint) -> Result<bool> {
        let mut conn = self.connection_manager.clone();
        let key = self.lock_key(queue, fingerprint);
        self.with_timeout(conn.exists(&key)).await
    }

    async fn release_all(&self, queue: &str, job_type: &JobType) -> Result<u64> {
        let pattern = format!(
            "{}*",
            escape_glob(&job_type_prefix(&self.config.key_prefix, queue, job_type))
        );
        self.delete_matching(&pattern).await
    }

    async fn release_queue(&self, queue: &str) -> Result<u64> {
        let pattern = format!(
            "{}*",
            escape_glob(&queue_prefix(&self.config.key_prefix, queue))
        );
        self.delete_matching(&pattern).await
    }
}

fn map_redis_error(err: redis::RedisError) -> AppError {
    AppError::StoreUnavailable(format!("Redis error: {}", err))
}

/// Escape a name so it cannot contain the ':' separator
fn key_segment(name: &str) -> String {
    name.replace('%', "%25").replace(':', "%3A")
}

fn queue_prefix(key_prefix: &str, queue: &str) -> String {
    format!("{}:queue:{}:lock:", key_prefix, key_segment(queue))
}

fn job_type_prefix(key_prefix: &str, queue: &str, job_type: &JobType) -> String {
    format!(
        "{}{}:",
        queue_prefix(key_prefix, queue),
        key_segment(job_type.as_str())
    )
}

fn lock_key(key_prefix: &str, queue: &str, fingerprint: &Fingerprint) -> String {
    format!(
        "{}{}",
        job_type_prefix(key_prefix, queue, fingerprint.job_type()),
        fingerprint.digest()
    )
}

/// Escape glob metacharacters so a literal prefix can be used in SCAN MATCH
fn escape_glob(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\' | '^') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
