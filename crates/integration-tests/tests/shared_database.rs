//! Several producers and workers sharing one database file

use loner_core::application::UniqueQueueService;
use loner_core::domain::{EnqueueOutcome, JobDefinition, JobPayload, JobRegistry, JobType};
use loner_core::port::time_provider::mocks::FixedTimeProvider;
use loner_core::port::TimeProvider;
use loner_infra_sqlite::{create_pool, run_migrations, SqliteJobQueue, SqliteLockStore};
use loner_integration_tests::*;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

struct TempDb(PathBuf);

impl TempDb {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("loner_{}_{}.db", name, std::process::id()));
        Self::cleanup(&path);
        Self(path)
    }

    fn url(&self) -> String {
        self.0.to_string_lossy().into_owned()
    }

    fn cleanup(path: &PathBuf) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        Self::cleanup(&self.0);
    }
}

fn foo() -> JobPayload {
    JobPayload::new(vec![json!("foo")])
}

#[tokio::test]
async fn test_producers_on_separate_pools_admit_one() {
    let db = TempDb::new("producers");
    // Migrate once before the producers race
    let first = Arc::new(sqlite_service(&db.url()).await);
    let mut producers = vec![first];
    for _ in 0..3 {
        producers.push(Arc::new(sqlite_service(&db.url()).await));
    }

    let attempts = producers.iter().cycle().take(24).map(|service| {
        let service = Arc::clone(service);
        tokio::spawn(async move { service.enqueue(&JobType::new(UNIQUE_JOB), foo()).await })
    });
    let outcomes: Vec<EnqueueOutcome> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(outcomes.iter().filter(|o| o.was_pushed()).count(), 1);
    assert_eq!(producers[0].size(UNIQUE_JOB_QUEUE).await.unwrap(), 1);
}

#[tokio::test]
async fn test_worker_reserve_releases_for_other_producer() {
    let db = TempDb::new("reserve");
    let producer = sqlite_service(&db.url()).await;
    let worker = sqlite_service(&db.url()).await;
    let job_type = JobType::new(UNIQUE_JOB);

    assert_eq!(producer.enqueue(&job_type, foo()).await.unwrap(), EnqueueOutcome::Admitted);
    assert_eq!(producer.enqueue(&job_type, foo()).await.unwrap(), EnqueueOutcome::Duplicate);

    let job = worker.reserve(UNIQUE_JOB_QUEUE).await.unwrap().unwrap();
    assert_eq!(job.payload, foo());

    assert_eq!(producer.enqueue(&job_type, foo()).await.unwrap(), EnqueueOutcome::Admitted);
}

#[tokio::test]
async fn test_jobs_survive_reopen() {
    let db = TempDb::new("reopen");
    {
        let service = sqlite_service(&db.url()).await;
        service.enqueue(&JobType::new(UNIQUE_JOB), foo()).await.unwrap();
    }

    let reopened = sqlite_service(&db.url()).await;
    assert_eq!(reopened.size(UNIQUE_JOB_QUEUE).await.unwrap(), 1);
    assert_eq!(
        reopened.enqueue(&JobType::new(UNIQUE_JOB), foo()).await.unwrap(),
        EnqueueOutcome::Duplicate
    );
}

#[tokio::test]
async fn test_expired_lock_is_taken_over() {
    let pool = create_pool("sqlite::memory:").await.unwrap();
    run_migrations(&pool).await.unwrap();
    let clock = Arc::new(FixedTimeProvider::new(1_000_000));
    let time_provider: Arc<dyn TimeProvider> = clock.clone();

    let registry = JobRegistry::new().register(
        JobDefinition::unique("ExpiringJob", "expiring").with_lock_ttl(Duration::from_secs(60)),
    );
    let service = UniqueQueueService::new(
        Arc::new(SqliteJobQueue::new(pool.clone(), time_provider.clone())),
        Arc::new(SqliteLockStore::new(pool, time_provider)),
        Arc::new(registry),
    );
    let job_type = JobType::new("ExpiringJob");

    assert_eq!(service.enqueue(&job_type, foo()).await.unwrap(), EnqueueOutcome::Admitted);
    clock.advance(59_000);
    assert_eq!(service.enqueue(&job_type, foo()).await.unwrap(), EnqueueOutcome::Duplicate);

    clock.advance(1_000);
    assert_eq!(service.enqueue(&job_type, foo()).await.unwrap(), EnqueueOutcome::Admitted);
    assert_eq!(service.size("expiring").await.unwrap(), 2);
}
