// Domain Layer - Pure business logic and entities

pub mod error;
pub mod fingerprint;
pub mod job;
pub mod outcome;
pub mod registry;

// Re-exports
pub use error::DomainError;
pub use fingerprint::Fingerprint;
pub use job::{JobDescriptor, JobPayload, JobType, QueueName};
pub use outcome::{Admission, EnqueueOutcome, PendingStatus};
pub use registry::{JobDefinition, JobRegistry, Uniqueness};
