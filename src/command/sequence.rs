use super::{CarrierCommand, CommandBox, CommandId, SchedulerPass};
use crate::context::{ContextStore, ContextStream};
use crate::core::{PersistError, Result, Value};
use async_trait::async_trait;

/// An ordered list of sub-commands.
///
/// Only the first non-executed child is reachable in any scheduler pass: a
/// later command never executes before an earlier one has executed and
/// completed, even when the later command's own waits are already
/// satisfied. This enforces cascade ordering (parent row before child rows)
/// without wiring every parent/child pair through explicit context waits.
///
/// Carrier operations (`wait_context`, `register`) forward to the first
/// child, which acts as the sequence's primary command.
pub struct Sequence {
    id: CommandId,
    commands: Vec<CommandBox>,
}

impl Sequence {
    pub fn new() -> Self {
        Self {
            id: CommandId::new(),
            commands: Vec::new(),
        }
    }

    /// Append a command to the end of the sequence
    pub fn add(mut self, command: impl CarrierCommand + 'static) -> Self {
        self.commands.push(Box::new(command));
        self
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn front_mut(&mut self) -> Option<&mut CommandBox> {
        self.commands.iter_mut().find(|c| !c.is_executed())
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CarrierCommand for Sequence {
    fn id(&self) -> CommandId {
        self.id
    }

    fn name(&self) -> &'static str {
        "SEQUENCE"
    }

    fn is_ready(&self, cx: &ContextStore) -> bool {
        match self.commands.iter().find(|c| !c.is_executed()) {
            Some(front) => front.is_ready(cx),
            None => true,
        }
    }

    fn is_executed(&self) -> bool {
        self.commands.iter().all(|c| c.is_executed())
    }

    async fn execute(&mut self, cx: &ContextStore) -> Result<()> {
        let id = self.id;
        match self.front_mut() {
            Some(front) => front.execute(cx).await,
            None => Err(PersistError::ExecutionError(format!(
                "Cannot execute {}: sequence is already EXECUTED",
                id
            ))),
        }
    }

    fn complete(&mut self, cx: &mut ContextStore) -> Result<()> {
        // completion belongs to the child that just executed
        match self.commands.iter_mut().rev().find(|c| c.is_executed()) {
            Some(last) => last.complete(cx),
            None => Ok(()),
        }
    }

    async fn roll_back(&mut self) -> Result<()> {
        let mut first_err = None;
        for command in self.commands.iter_mut().rev() {
            if let Err(e) = command.roll_back().await {
                log::error!("rollback of {} failed: {}", command.id(), e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn wait_context(&mut self, stream: ContextStream, key: &str, required: bool) {
        if let Some(primary) = self.commands.first_mut() {
            primary.wait_context(stream, key, required);
        }
    }

    fn register(&mut self, stream: ContextStream, key: &str, value: Value, fresh: bool) {
        if let Some(primary) = self.commands.first_mut() {
            primary.register(stream, key, value, fresh);
        }
    }

    async fn advance(&mut self, pass: &mut SchedulerPass<'_>) -> Result<()> {
        let mut advanced = false;
        for command in self.commands.iter_mut() {
            if command.is_executed() {
                continue;
            }
            if advanced {
                // out of reach this pass: strictly after the current front
                pass.pending += 1;
                continue;
            }
            command.advance(pass).await?;
            advanced = true;
        }
        Ok(())
    }

    async fn roll_back_in(&mut self, id: CommandId) -> Option<Result<()>> {
        for command in self.commands.iter_mut() {
            if let Some(result) = command.roll_back_in(id).await {
                return Some(result);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::NilCommand;

    #[tokio::test]
    async fn test_sequence_executes_in_declared_order() {
        let mut seq = Sequence::new().add(NilCommand::new()).add(NilCommand::new());
        let cx = ContextStore::new();

        assert!(!seq.is_executed());

        seq.execute(&cx).await.unwrap();
        assert!(!seq.is_executed());

        seq.execute(&cx).await.unwrap();
        assert!(seq.is_executed());

        assert!(seq.execute(&cx).await.is_err());
    }

    #[test]
    fn test_empty_sequence_is_executed() {
        let seq = Sequence::new();
        assert!(seq.is_empty());
        assert!(seq.is_executed());
    }
}
