// Fingerprint Encoder
//
// Identity of a job = SHA-256 over the canonical JSON of {"args": [..], "class": ".."}.
// Canonical JSON sorts object keys at every depth, so key order never matters, and
// any two values that serialize to the same JSON (a string key and a unit enum
// variant renamed to that string, say) collapse to one fingerprint.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::job::{JobPayload, JobType};

/// Deterministic identity of (job type, canonical payload)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    job_type: JobType,
    digest: String,
}

impl Fingerprint {
    /// Encode an already-JSON payload. Pure and infallible.
    pub fn encode(job_type: &JobType, payload: &JobPayload) -> Self {
        let digest = sha256_hex(&canonical_form(job_type, payload));
        Self {
            job_type: job_type.clone(),
            digest,
        }
    }

    /// Encode arbitrary serializable arguments.
    ///
    /// Fails with `UnserializablePayload` when `args` has no JSON form.
    pub fn encode_args<T: Serialize>(job_type: &JobType, args: &T) -> crate::Result<Self> {
        let payload = match serde_json::to_value(args)? {
            Value::Array(items) => JobPayload::new(items),
            single => JobPayload::new(vec![single]),
        };
        Ok(Self::encode(job_type, &payload))
    }

    pub fn job_type(&self) -> &JobType {
        &self.job_type
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.job_type, self.digest)
    }
}

/// Canonical text that is hashed into the digest
pub fn canonical_form(job_type: &JobType, payload: &JobPayload) -> String {
    let mut out = String::new();
    out.push_str("{\"args\":");
    write_canonical(&Value::Array(payload.args().to_vec()), &mut out);
    out.push_str(",\"class\":");
    write_canonical(&Value::String(job_type.as_str().to_string()), &mut out);
    out.push('}');
    out
}

/// Write `value` as compact JSON with object keys in lexicographic order.
///
/// Does not rely on `serde_json::Map` ordering, which changes with the
/// `preserve_order` feature.
pub(crate) fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(val, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
