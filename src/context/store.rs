// ============================================================================
// Transaction Context Store
// ============================================================================
//
// A per-run key/value bag used to pass values produced by one command to the
// commands that depend on them. Entries are partitioned into streams so the
// same key name can serve both as a column payload and as row-targeting
// criteria without colliding.
//
// ============================================================================

use crate::core::Value;
use std::collections::HashMap;
use std::fmt;

/// Named partition of the context store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextStream {
    /// Values destined for row columns on insert/update.
    Data,
    /// Values used to target existing rows on update/delete.
    Criteria,
}

impl fmt::Display for ContextStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextStream::Data => write!(f, "DATA"),
            ContextStream::Criteria => write!(f, "CRITERIA"),
        }
    }
}

/// Transaction-scoped context store.
///
/// Owned exclusively by one transaction run and torn down with it. Mutated
/// by commands during their completion step, read during readiness
/// evaluation and execution. Entries are never deleted, only added or
/// overwritten under the fresh rule.
#[derive(Debug, Clone, Default)]
pub struct ContextStore {
    entries: HashMap<(ContextStream, String), Value>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value under `(stream, key)`.
    ///
    /// With `fresh = false` an existing entry for the same key is preserved
    /// (first-write-wins); with `fresh = true` the value overwrites
    /// unconditionally.
    pub fn register(&mut self, stream: ContextStream, key: &str, value: Value, fresh: bool) {
        let slot = (stream, key.to_string());
        if fresh || !self.entries.contains_key(&slot) {
            self.entries.insert(slot, value);
        }
    }

    /// Current value for `(stream, key)`, if registered.
    pub fn get(&self, stream: ContextStream, key: &str) -> Option<&Value> {
        self.entries.get(&(stream, key.to_string()))
    }

    pub fn contains(&self, stream: ContextStream, key: &str) -> bool {
        self.entries.contains_key(&(stream, key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
