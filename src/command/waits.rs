// ============================================================================
// Context Wait Ledger
// ============================================================================

use crate::context::{ContextStore, ContextStream};
use crate::core::{ColumnMap, Value};

/// A declared dependency on a context value.
#[derive(Debug, Clone)]
pub struct ContextWait {
    pub stream: ContextStream,
    pub key: String,
    pub required: bool,
}

/// A command's declared waits together with values handed to it directly.
///
/// Readiness consults both sources: a required wait is satisfied once its key
/// is present either in the shared store or among the directly received
/// values. Direct values take precedence at resolution time since they were
/// addressed to this command specifically.
#[derive(Debug, Clone, Default)]
pub struct ContextWaits {
    waits: Vec<ContextWait>,
    received: ContextStore,
}

impl ContextWaits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a wait on `(stream, key)`. Re-declaring the same key keeps
    /// the stricter `required` flag.
    pub fn wait(&mut self, stream: ContextStream, key: &str, required: bool) {
        if let Some(existing) = self
            .waits
            .iter_mut()
            .find(|w| w.stream == stream && w.key == key)
        {
            existing.required = existing.required || required;
            return;
        }
        self.waits.push(ContextWait {
            stream,
            key: key.to_string(),
            required,
        });
    }

    /// Hand a value directly to the owning command, under the fresh rule.
    pub fn accept(&mut self, stream: ContextStream, key: &str, value: Value, fresh: bool) {
        self.received.register(stream, key, value, fresh);
    }

    /// True once every required wait has a value available.
    pub fn is_satisfied(&self, cx: &ContextStore) -> bool {
        self.waits
            .iter()
            .filter(|w| w.required)
            .all(|w| self.received.contains(w.stream, &w.key) || cx.contains(w.stream, &w.key))
    }

    /// Resolve the waits declared on `stream` into a column map.
    ///
    /// Absent optional values read as NULL at execute time.
    pub fn resolve(&self, stream: ContextStream, cx: &ContextStore) -> ColumnMap {
        self.waits
            .iter()
            .filter(|w| w.stream == stream)
            .map(|w| {
                let value = self
                    .received
                    .get(w.stream, &w.key)
                    .or_else(|| cx.get(w.stream, &w.key))
                    .cloned()
                    .unwrap_or(Value::Null);
                (w.key.clone(), value)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.waits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_wait_blocks_until_registered() {
        let mut waits = ContextWaits::new();
        waits.wait(ContextStream::Data, "parent_id", true);

        let mut cx = ContextStore::new();
        assert!(!waits.is_satisfied(&cx));

        cx.register(ContextStream::Data, "parent_id", Value::Integer(3), true);
        assert!(waits.is_satisfied(&cx));
    }

    #[test]
    fn test_optional_wait_never_blocks() {
        let mut waits = ContextWaits::new();
        waits.wait(ContextStream::Data, "note", false);

        let cx = ContextStore::new();
        assert!(waits.is_satisfied(&cx));
        assert_eq!(
            waits.resolve(ContextStream::Data, &cx).get("note"),
            Some(&Value::Null)
        );
    }

    #[test]
    fn test_direct_value_satisfies_wait() {
        let mut waits = ContextWaits::new();
        waits.wait(ContextStream::Criteria, "id", true);
        waits.accept(ContextStream::Criteria, "id", Value::Integer(9), false);

        let cx = ContextStore::new();
        assert!(waits.is_satisfied(&cx));
        assert_eq!(
            waits.resolve(ContextStream::Criteria, &cx).get("id"),
            Some(&Value::Integer(9))
        );
    }

    #[test]
    fn test_direct_value_wins_over_store() {
        let mut waits = ContextWaits::new();
        waits.wait(ContextStream::Data, "id", true);
        waits.accept(ContextStream::Data, "id", Value::Integer(1), false);

        let mut cx = ContextStore::new();
        cx.register(ContextStream::Data, "id", Value::Integer(2), true);

        assert_eq!(
            waits.resolve(ContextStream::Data, &cx).get("id"),
            Some(&Value::Integer(1))
        );
    }

    #[test]
    fn test_redeclared_wait_keeps_stricter_flag() {
        let mut waits = ContextWaits::new();
        waits.wait(ContextStream::Data, "id", false);
        waits.wait(ContextStream::Data, "id", true);
        assert_eq!(waits.len(), 1);

        let cx = ContextStore::new();
        assert!(!waits.is_satisfied(&cx));
    }
}
