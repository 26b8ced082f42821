// Loner Infrastructure - SQLite Adapter
// Implements: JobQueue (underlying FIFO queue), LockStore (single-host shared store)

mod connection;
mod error;
mod job_queue;
mod lock_store;
mod migration;

pub use connection::create_pool;
pub use job_queue::SqliteJobQueue;
pub use lock_store::SqliteLockStore;
pub use migration::run_migrations;

// Note: sqlx::Error conversion is handled by helper functions in `error`
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
