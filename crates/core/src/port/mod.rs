// Port Layer - Interfaces for external dependencies

pub mod job_performer;
pub mod job_queue;
pub mod lock_store;
pub mod time_provider; // For deterministic testing

// Re-exports
pub use job_performer::{JobPerformer, PerformError};
pub use job_queue::JobQueue;
pub use lock_store::LockStore;
pub use time_provider::TimeProvider;
