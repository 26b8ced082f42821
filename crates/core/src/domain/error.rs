// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid queue name: {0}")]
    InvalidQueueName(String),

    #[error("Invalid job type: {0}")]
    InvalidJobType(String),

    #[error("Invalid job definition '{input}': {reason}")]
    InvalidJobDefinition { input: String, reason: String },
}

pub type Result<T> = std::result::Result<T, DomainError>;
