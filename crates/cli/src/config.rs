// Environment-driven configuration and dependency wiring

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use loner_core::application::UniqueQueueService;
use loner_core::domain::{JobDefinition, JobRegistry};
use loner_core::port::time_provider::SystemTimeProvider;
use loner_core::port::{LockStore, TimeProvider};
use loner_infra_redis::{RedisConfig, RedisLockStore};
use loner_infra_sqlite::{create_pool, run_migrations, SqliteJobQueue, SqliteLockStore};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

const DEFAULT_DB_PATH: &str = "~/.loner/queue.db";
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_REDIS_PREFIX: &str = "loner";

/// Where uniqueness locks live
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LockStoreKind {
    /// Same SQLite database as the queue
    Sqlite,
    /// Shared Redis server
    Redis,
}

#[derive(Debug, Args)]
pub struct Config {
    /// Queue database file
    #[arg(long, global = true, env = "LONER_DB_PATH", default_value = DEFAULT_DB_PATH)]
    pub db_path: String,

    /// Lock store backend
    #[arg(
        long,
        global = true,
        env = "LONER_LOCK_STORE",
        value_enum,
        default_value_t = LockStoreKind::Sqlite
    )]
    pub lock_store: LockStoreKind,

    /// Redis URL when the lock store is redis
    #[arg(long, global = true, env = "LONER_REDIS_URL", default_value = DEFAULT_REDIS_URL)]
    pub redis_url: String,

    /// Prefix for Redis lock keys
    #[arg(long, global = true, env = "LONER_REDIS_PREFIX", default_value = DEFAULT_REDIS_PREFIX)]
    pub redis_prefix: String,

    /// Job definitions, comma separated: Name=queue[:unique[:ttl_secs]]
    #[arg(long, global = true, env = "LONER_JOBS", value_delimiter = ',')]
    pub jobs: Vec<JobDefinition>,

    /// Log output: pretty or json
    #[arg(long, global = true, env = "LONER_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

impl Config {
    pub fn db_path(&self) -> String {
        shellexpand::tilde(&self.db_path).into_owned()
    }

    pub fn registry(&self) -> JobRegistry {
        self.jobs.iter().cloned().collect()
    }

    /// Open the stores and build the service
    pub async fn build_service(&self) -> Result<UniqueQueueService> {
        let db_path = self.db_path();
        if let Some(parent) = Path::new(&db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        info!(db_path = %db_path, lock_store = ?self.lock_store, "Opening stores");
        let pool = create_pool(&db_path)
            .await
            .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
        run_migrations(&pool)
            .await
            .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

        let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
        let job_queue = Arc::new(SqliteJobQueue::new(pool.clone(), time_provider.clone()));

        let lock_store: Arc<dyn LockStore> = match self.lock_store {
            LockStoreKind::Sqlite => Arc::new(SqliteLockStore::new(pool, time_provider)),
            LockStoreKind::Redis => {
                let config = RedisConfig::new()
                    .with_url(self.redis_url.clone())
                    .with_key_prefix(self.redis_prefix.clone());
                let store = RedisLockStore::connect(config)
                    .await
                    .map_err(|e| anyhow::anyhow!("Redis connection failed: {}", e))?;
                Arc::new(store)
            }
        };

        Ok(UniqueQueueService::new(
            job_queue,
            lock_store,
            Arc::new(self.registry()),
        ))
    }
}
