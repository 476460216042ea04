//! Per-run idempotency cache.
//!
//! Maps an idempotency token to the result the first dispatch produced.
//! Entries keep their insertion order so the artifact extractor can tell
//! which story was created last.

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct IdempotencyCache {
    index: HashMap<String, usize>,
    entries: Vec<(String, serde_json::Value)>,
}

impl IdempotencyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, token: &str) -> Option<&serde_json::Value> {
        self.index.get(token).map(|&i| &self.entries[i].1)
    }

    /// Store a result. The first result for a token wins; later inserts
    /// for the same token are ignored and return `false`.
    pub fn insert(&mut self, token: impl Into<String>, value: serde_json::Value) -> bool {
        let token = token.into();
        if self.index.contains_key(&token) {
            return false;
        }
        self.index.insert(token.clone(), self.entries.len());
        self.entries.push((token, value));
        true
    }

    /// Cached results in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &serde_json::Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
