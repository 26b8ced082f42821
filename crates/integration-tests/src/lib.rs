//! Shared fixtures for the end-to-end tests

use loner_core::application::UniqueQueueService;
use loner_core::domain::{JobDefinition, JobRegistry};
use loner_core::port::time_provider::SystemTimeProvider;
use loner_core::port::TimeProvider;
use loner_infra_sqlite::{create_pool, run_migrations, SqliteJobQueue, SqliteLockStore};
use std::sync::Arc;

pub const PLAIN_JOB: &str = "SomeJob";
pub const UNIQUE_JOB: &str = "SomeUniqueJob";
pub const UNIQUE_JOB_QUEUE: &str = "other_queue";
pub const PLAIN_JOB_QUEUE: &str = "some_queue";

pub fn registry() -> JobRegistry {
    JobRegistry::new()
        .register(JobDefinition::plain(PLAIN_JOB, PLAIN_JOB_QUEUE))
        .register(JobDefinition::unique(UNIQUE_JOB, UNIQUE_JOB_QUEUE))
}

/// Service over a SQLite database at `url`, with the queue and the locks in it
pub async fn sqlite_service(url: &str) -> UniqueQueueService {
    sqlite_service_with(url, registry()).await
}

pub async fn sqlite_service_with(url: &str, registry: JobRegistry) -> UniqueQueueService {
    let pool = create_pool(url).await.unwrap();
    run_migrations(&pool).await.unwrap();
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);

    UniqueQueueService::new(
        Arc::new(SqliteJobQueue::new(pool.clone(), time_provider.clone())),
        Arc::new(SqliteLockStore::new(pool, time_provider)),
        Arc::new(registry),
    )
}

pub async fn memory_service() -> UniqueQueueService {
    sqlite_service("sqlite::memory:").await
}
