use super::{CarrierCommand, CommandBox, CommandId, SchedulerPass};
use crate::context::{ContextStore, ContextStream};
use crate::core::{PersistError, Result, Value};
use async_trait::async_trait;
use std::collections::HashMap;

/// Which half of a split handles a given context key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Half {
    Head,
    Tail,
}

/// Two halves of persisting a single logical change.
///
/// The typical case is an insert that can only carry self-contained columns
/// (the head), followed by an update once a circular or self-referential
/// foreign key value becomes available (the tail). External dependents
/// interact with the split as a single carrier command.
///
/// Wait routing: a required wait belongs to the head, which cannot run
/// without it. An optional wait names a value unknown at insert time, which
/// is exactly what the tail exists to apply, so it routes to the tail and
/// becomes required there. Registrations follow the route recorded for
/// their `(stream, key)` and default to the head.
///
/// The tail is not reachable until the head has executed, so the deferred
/// update can never precede its insert.
pub struct Split {
    id: CommandId,
    head: CommandBox,
    tail: CommandBox,
    routes: HashMap<(ContextStream, String), Half>,
}

impl Split {
    pub fn new(head: impl CarrierCommand + 'static, tail: impl CarrierCommand + 'static) -> Self {
        Self {
            id: CommandId::new(),
            head: Box::new(head),
            tail: Box::new(tail),
            routes: HashMap::new(),
        }
    }

    fn route(&self, stream: ContextStream, key: &str) -> Half {
        self.routes
            .get(&(stream, key.to_string()))
            .copied()
            .unwrap_or(Half::Head)
    }
}

#[async_trait]
impl CarrierCommand for Split {
    fn id(&self) -> CommandId {
        self.id
    }

    fn name(&self) -> &'static str {
        "SPLIT"
    }

    fn is_ready(&self, cx: &ContextStore) -> bool {
        if !self.head.is_executed() {
            self.head.is_ready(cx)
        } else {
            self.tail.is_ready(cx)
        }
    }

    fn is_executed(&self) -> bool {
        self.head.is_executed() && self.tail.is_executed()
    }

    async fn execute(&mut self, cx: &ContextStore) -> Result<()> {
        if !self.head.is_executed() {
            self.head.execute(cx).await
        } else if !self.tail.is_executed() {
            self.tail.execute(cx).await
        } else {
            Err(PersistError::ExecutionError(format!(
                "Cannot execute {}: both halves are already EXECUTED",
                self.id
            )))
        }
    }

    fn complete(&mut self, cx: &mut ContextStore) -> Result<()> {
        // completion belongs to the half that just executed
        if self.head.is_executed() && !self.tail.is_executed() {
            self.head.complete(cx)
        } else if self.is_executed() {
            self.tail.complete(cx)
        } else {
            Err(PersistError::ExecutionError(format!(
                "Cannot complete {}: neither half has executed",
                self.id
            )))
        }
    }

    async fn roll_back(&mut self) -> Result<()> {
        let mut first_err = None;
        if let Err(e) = self.tail.roll_back().await {
            log::error!("rollback of {} failed: {}", self.tail.id(), e);
            first_err.get_or_insert(e);
        }
        if let Err(e) = self.head.roll_back().await {
            log::error!("rollback of {} failed: {}", self.head.id(), e);
            first_err.get_or_insert(e);
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn wait_context(&mut self, stream: ContextStream, key: &str, required: bool) {
        if required {
            self.head.wait_context(stream, key, true);
            self.routes.insert((stream, key.to_string()), Half::Head);
        } else {
            self.tail.wait_context(stream, key, true);
            self.routes.insert((stream, key.to_string()), Half::Tail);
        }
    }

    fn register(&mut self, stream: ContextStream, key: &str, value: Value, fresh: bool) {
        match self.route(stream, key) {
            Half::Head => self.head.register(stream, key, value, fresh),
            Half::Tail => self.tail.register(stream, key, value, fresh),
        }
    }

    async fn advance(&mut self, pass: &mut SchedulerPass<'_>) -> Result<()> {
        if !self.head.is_executed() {
            self.head.advance(pass).await?;
            if !self.tail.is_executed() {
                pass.pending += 1;
            }
            return Ok(());
        }
        self.tail.advance(pass).await
    }

    async fn roll_back_in(&mut self, id: CommandId) -> Option<Result<()>> {
        if let Some(result) = self.head.roll_back_in(id).await {
            return Some(result);
        }
        self.tail.roll_back_in(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::NilCommand;

    #[test]
    fn test_never_executed() {
        let split = Split::new(NilCommand::new(), NilCommand::new());
        assert!(!split.is_executed());
    }

    #[tokio::test]
    async fn test_executed_once_both_halves_ran() {
        let mut split = Split::new(NilCommand::new(), NilCommand::new());
        let cx = ContextStore::new();

        split.execute(&cx).await.unwrap();
        assert!(!split.is_executed());

        split.execute(&cx).await.unwrap();
        assert!(split.is_executed());

        assert!(split.execute(&cx).await.is_err());
    }

    #[test]
    fn test_required_wait_routes_to_head() {
        let mut split = Split::new(NilCommand::new(), NilCommand::new());
        split.wait_context(ContextStream::Data, "parent_id", true);
        assert_eq!(split.route(ContextStream::Data, "parent_id"), Half::Head);
    }

    #[test]
    fn test_optional_wait_routes_to_tail() {
        let mut split = Split::new(NilCommand::new(), NilCommand::new());
        split.wait_context(ContextStream::Data, "partner_id", false);
        assert_eq!(split.route(ContextStream::Data, "partner_id"), Half::Tail);
    }

    #[test]
    fn test_unrouted_key_defaults_to_head() {
        let split = Split::new(NilCommand::new(), NilCommand::new());
        assert_eq!(split.route(ContextStream::Criteria, "id"), Half::Head);
    }
}
