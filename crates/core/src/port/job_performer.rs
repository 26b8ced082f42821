// Job Performer Port
// Runs the body of a reserved job. Dispatch by job type is the implementor's concern.

use crate::domain::JobDescriptor;
use async_trait::async_trait;
use thiserror::Error;

/// Failure raised by a job body
#[derive(Error, Debug)]
pub enum PerformError {
    #[error("Job failed: {0}")]
    Failed(String),

    #[error("No performer for job type: {0}")]
    UnknownJobType(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Job Performer trait
#[async_trait]
pub trait JobPerformer: Send + Sync {
    /// Execute the job body
    ///
    /// # Errors
    /// - PerformError::Failed if the body reports failure
    /// - PerformError::InvalidPayload if the arguments do not fit the job
    async fn perform(&self, job: &JobDescriptor) -> Result<(), PerformError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock performer behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed
        Success,
        /// Always fail with message
        Fail(String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
    }

    /// Mock Job Performer for testing
    pub struct MockPerformer {
        behavior: Arc<Mutex<MockBehavior>>,
        performed: Arc<Mutex<Vec<JobDescriptor>>>,
    }

    impl MockPerformer {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                performed: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }

        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }

        pub fn new_panic_inducing(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Panic(message.into()))
        }

        pub fn call_count(&self) -> usize {
            self.performed.lock().unwrap().len()
        }

        /// Jobs handed to `perform`, in call order
        pub fn performed(&self) -> Vec<JobDescriptor> {
            self.performed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobPerformer for MockPerformer {
        async fn perform(&self, job: &JobDescriptor) -> Result<(), PerformError> {
            self.performed.lock().unwrap().push(job.clone());

            let behavior = self.behavior.lock().unwrap().clone();

            match behavior {
                MockBehavior::Success => Ok(()),
                MockBehavior::Fail(msg) => Err(PerformError::Failed(msg)),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
            }
        }
    }
}
