use super::{CarrierCommand, CommandId, CommandState};
use crate::context::{ContextStore, ContextStream};
use crate::core::{PersistError, Result, Value};
use async_trait::async_trait;

/// A command that persists nothing.
///
/// Used as the inert arm of a [`Branch`](super::Branch) when one of the two
/// outcomes is "do nothing".
#[derive(Debug)]
pub struct NilCommand {
    id: CommandId,
    state: CommandState,
}

impl NilCommand {
    pub fn new() -> Self {
        Self {
            id: CommandId::new(),
            state: CommandState::Pending,
        }
    }
}

impl Default for NilCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CarrierCommand for NilCommand {
    fn id(&self) -> CommandId {
        self.id
    }

    fn name(&self) -> &'static str {
        "NIL"
    }

    fn is_ready(&self, _cx: &ContextStore) -> bool {
        true
    }

    fn is_executed(&self) -> bool {
        self.state.is_executed()
    }

    async fn execute(&mut self, _cx: &ContextStore) -> Result<()> {
        if !self.state.is_pending() {
            return Err(PersistError::ExecutionError(format!(
                "Cannot execute {}: command is already {}",
                self.id, self.state
            )));
        }
        self.state = CommandState::Executed;
        Ok(())
    }

    fn complete(&mut self, _cx: &mut ContextStore) -> Result<()> {
        Ok(())
    }

    async fn roll_back(&mut self) -> Result<()> {
        if self.state.is_executed() {
            self.state = CommandState::RolledBack;
        }
        Ok(())
    }

    fn wait_context(&mut self, _stream: ContextStream, _key: &str, _required: bool) {}

    fn register(&mut self, _stream: ContextStream, _key: &str, _value: Value, _fresh: bool) {}
}
