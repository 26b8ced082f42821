// Job Domain Model

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{DomainError, Result};

/// Queue identifier
pub type QueueName = String;

/// Maximum length accepted for queue names and job types
pub const MAX_NAME_LEN: usize = 255;

/// Job Type (stable identifier of a job class)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobType(String);

impl JobType {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Job Payload: positional arguments, each already in JSON form.
///
/// A keyword-style call is a payload holding a single JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobPayload(Vec<Value>);

impl JobPayload {
    pub fn new(args: Vec<Value>) -> Self {
        Self(args)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build a single-argument payload from any serializable value.
    ///
    /// Fails when the value has no JSON form (e.g. a map keyed by tuples).
    pub fn single<T: Serialize>(arg: &T) -> crate::Result<Self> {
        Ok(Self(vec![serde_json::to_value(arg)?]))
    }

    /// Append one more positional argument.
    pub fn with_arg<T: Serialize>(mut self, arg: &T) -> crate::Result<Self> {
        self.0.push(serde_json::to_value(arg)?);
        Ok(self)
    }

    pub fn args(&self) -> &[Value] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical JSON text of the argument list (object keys sorted at every depth).
    pub fn canonical_json(&self) -> String {
        let mut out = String::new();
        super::fingerprint::write_canonical(&Value::Array(self.0.clone()), &mut out);
        out
    }
}

impl From<Vec<Value>> for JobPayload {
    fn from(args: Vec<Value>) -> Self {
        Self(args)
    }
}

/// Job Descriptor: one entry of an underlying queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub queue: QueueName,
    #[serde(rename = "class")]
    pub job_type: JobType,
    #[serde(rename = "args")]
    pub payload: JobPayload,
}

impl JobDescriptor {
    pub fn new(queue: impl Into<String>, job_type: JobType, payload: JobPayload) -> Self {
        Self {
            queue: queue.into(),
            job_type,
            payload,
        }
    }

    /// Whether this descriptor carries the given type and (if given) an equivalent payload.
    pub fn matches(&self, job_type: &JobType, payload: Option<&JobPayload>) -> bool {
        if &self.job_type != job_type {
            return false;
        }
        match payload {
            Some(p) => self.payload.canonical_json() == p.canonical_json(),
            None => true,
        }
    }
}

/// Reject queue names that cannot be used as store key segments
pub fn validate_queue_name(queue: &str) -> Result<()> {
    validate_name(queue).map_err(DomainError::InvalidQueueName)
}

/// Reject job types that cannot be used as store key segments
pub fn validate_job_type(job_type: &JobType) -> Result<()> {
    validate_name(job_type.as_str()).map_err(DomainError::InvalidJobType)
}

fn validate_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("name cannot be empty".to_string());
    }
    if name.len() > MAX_NAME_LEN {
        return Err(format!("name too long ({} > {})", name.len(), MAX_NAME_LEN));
    }
    if name.contains(':') || name.chars().any(char::is_whitespace) {
        return Err(format!("'{}' must not contain ':' or whitespace", name));
    }
    Ok(())
}
