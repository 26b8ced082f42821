// Job Registry - which job types exist, where they go, and whether they are unique

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use super::error::{DomainError, Result};
use super::job::{validate_job_type, validate_queue_name, JobType, QueueName};

/// Uniqueness capability, chosen when a job type is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uniqueness {
    /// At most one pending instance per (queue, fingerprint).
    /// `lock_ttl` bounds how long an unreleased lock survives.
    Unique { lock_ttl: Option<Duration> },
    /// Plain job: enqueued as many times as asked
    Plain,
}

impl Uniqueness {
    pub fn is_unique(&self) -> bool {
        matches!(self, Uniqueness::Unique { .. })
    }

    pub fn lock_ttl(&self) -> Option<Duration> {
        match self {
            Uniqueness::Unique { lock_ttl } => *lock_ttl,
            Uniqueness::Plain => None,
        }
    }
}

/// Registration of one job type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDefinition {
    pub job_type: JobType,
    pub default_queue: QueueName,
    pub uniqueness: Uniqueness,
}

impl JobDefinition {
    pub fn plain(job_type: impl Into<String>, default_queue: impl Into<String>) -> Self {
        Self {
            job_type: JobType::new(job_type),
            default_queue: default_queue.into(),
            uniqueness: Uniqueness::Plain,
        }
    }

    pub fn unique(job_type: impl Into<String>, default_queue: impl Into<String>) -> Self {
        Self {
            job_type: JobType::new(job_type),
            default_queue: default_queue.into(),
            uniqueness: Uniqueness::Unique { lock_ttl: None },
        }
    }

    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        if let Uniqueness::Unique { lock_ttl } = &mut self.uniqueness {
            *lock_ttl = Some(ttl);
        }
        self
    }
}

/// Parses `Name=queue`, `Name=queue:unique` or `Name=queue:unique:<ttl_secs>`
impl FromStr for JobDefinition {
    type Err = DomainError;

    fn from_str(input: &str) -> Result<Self> {
        let invalid = |reason: &str| DomainError::InvalidJobDefinition {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let (name, rest) = input
            .trim()
            .split_once('=')
            .ok_or_else(|| invalid("expected Name=queue"))?;
        let mut parts = rest.split(':');
        let queue = parts.next().unwrap_or_default();

        let definition = match (parts.next(), parts.next(), parts.next()) {
            (None, None, None) => JobDefinition::plain(name, queue),
            (Some("unique"), None, None) => JobDefinition::unique(name, queue),
            (Some("unique"), Some(ttl), None) => {
                let secs: u64 = ttl.parse().map_err(|_| invalid("ttl must be whole seconds"))?;
                if secs == 0 {
                    return Err(invalid("ttl must be positive"));
                }
                JobDefinition::unique(name, queue).with_lock_ttl(Duration::from_secs(secs))
            }
            _ => return Err(invalid("expected Name=queue[:unique[:ttl_secs]]")),
        };

        validate_job_type(&definition.job_type)?;
        validate_queue_name(&definition.default_queue)?;
        Ok(definition)
    }
}

/// Immutable set of job definitions, built once at startup
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    definitions: HashMap<JobType, JobDefinition>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a definition
    pub fn register(mut self, definition: JobDefinition) -> Self {
        self.definitions
            .insert(definition.job_type.clone(), definition);
        self
    }

    pub fn get(&self, job_type: &JobType) -> Option<&JobDefinition> {
        self.definitions.get(job_type)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl FromIterator<JobDefinition> for JobRegistry {
    fn from_iter<I: IntoIterator<Item = JobDefinition>>(iter: I) -> Self {
        iter.into_iter()
            .fold(JobRegistry::new(), |registry, def| registry.register(def))
    }
}
