// Application Layer - Use Cases and Business Logic

pub mod gate;
pub mod lifecycle;
pub mod unique_queue;
pub mod worker;

// Re-exports
pub use gate::UniquenessGate;
pub use lifecycle::LifecycleHook;
pub use unique_queue::UniqueQueueService;
pub use worker::{shutdown_channel, JobOutcome, ShutdownSender, ShutdownToken, Worker};
