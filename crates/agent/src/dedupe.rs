//! Call fingerprinting for loop detection.
//!
//! A fingerprint is the first 16 hex chars of SHA-256 over the canonical JSON
//! encoding of `{"args": <normalized>, "tool": <name>}`. Keys are sorted at
//! every level and the top-level `idempotency_key` is dropped, so identical
//! calls carrying different tokens share one fingerprint.

use std::collections::HashMap;

use serde_json::Value;
use sha2::{Digest, Sha256};
use sprintloop_core::IDEMPOTENCY_KEY;

/// Deterministic fingerprint of a tool call.
pub fn fingerprint(tool: &str, args: &Value) -> String {
    let args = match args {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| k.as_str() != IDEMPOTENCY_KEY)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    };

    let mut canonical = String::from("{\"args\":");
    write_canonical(&args, &mut canonical);
    canonical.push_str(",\"tool\":");
    write_canonical(&Value::String(tool.to_string()), &mut canonical);
    canonical.push('}');

    let digest = Sha256::digest(canonical.as_bytes());
    digest
        .iter()
        .take(8)
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
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

/// What the deduplicator saw for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sighting {
    pub fingerprint: String,
    /// Occurrences so far, this one included.
    pub count: u32,
    /// The count is over the repeat ceiling.
    pub looping: bool,
}

/// Per-run fingerprint counter.
#[derive(Debug, Clone)]
pub struct CallDeduplicator {
    counts: HashMap<String, u32>,
    ceiling: u32,
}

impl CallDeduplicator {
    pub fn new(ceiling: u32) -> Self {
        Self {
            counts: HashMap::new(),
            ceiling,
        }
    }

    /// Count one occurrence of the call.
    pub fn observe(&mut self, tool: &str, args: &Value) -> Sighting {
        let fingerprint = fingerprint(tool, args);
        let count = self.counts.entry(fingerprint.clone()).or_insert(0);
        *count += 1;
        Sighting {
            looping: *count > self.ceiling,
            count: *count,
            fingerprint,
        }
    }
}
