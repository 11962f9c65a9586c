//! Shared test doubles for the command and runner integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use rowflow::{
    CarrierCommand, CommandId, CommandState, ContextStore, ContextStream, ContextWaits,
    PersistError, Result, Value,
};
use std::sync::{Arc, Mutex};

/// Shared, ordered record of execute/rollback events across commands.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// A carrier command that records what happens to it instead of touching
/// any storage. Configurable to produce context values on completion and
/// to fail on execute or rollback.
pub struct ProbeCommand {
    id: CommandId,
    label: String,
    log: EventLog,
    waits: ContextWaits,
    produces: Vec<(ContextStream, String, Value)>,
    fail_on_execute: bool,
    fail_on_rollback: bool,
    state: CommandState,
}

impl ProbeCommand {
    pub fn new(label: &str, log: &EventLog) -> Self {
        Self {
            id: CommandId::new(),
            label: label.to_string(),
            log: log.clone(),
            waits: ContextWaits::new(),
            produces: Vec::new(),
            fail_on_execute: false,
            fail_on_rollback: false,
            state: CommandState::Pending,
        }
    }

    /// Register `(stream, key) -> value` on completion, fresh
    pub fn produces(mut self, stream: ContextStream, key: &str, value: Value) -> Self {
        self.produces.push((stream, key.to_string(), value));
        self
    }

    /// Declare a required wait
    pub fn requires(mut self, stream: ContextStream, key: &str) -> Self {
        self.waits.wait(stream, key, true);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_on_execute = true;
        self
    }

    pub fn failing_rollback(mut self) -> Self {
        self.fail_on_rollback = true;
        self
    }
}

#[async_trait]
impl CarrierCommand for ProbeCommand {
    fn id(&self) -> CommandId {
        self.id
    }

    fn name(&self) -> &'static str {
        "PROBE"
    }

    fn is_ready(&self, cx: &ContextStore) -> bool {
        self.waits.is_satisfied(cx)
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
        if self.fail_on_execute {
            return Err(PersistError::ExecutionError(format!(
                "{} refused to execute",
                self.label
            )));
        }
        self.log.lock().unwrap().push(format!("execute:{}", self.label));
        self.state = CommandState::Executed;
        Ok(())
    }

    fn complete(&mut self, cx: &mut ContextStore) -> Result<()> {
        for (stream, key, value) in &self.produces {
            cx.register(*stream, key, value.clone(), true);
        }
        Ok(())
    }

    async fn roll_back(&mut self) -> Result<()> {
        if !self.state.is_executed() {
            return Ok(());
        }
        self.log
            .lock()
            .unwrap()
            .push(format!("rollback:{}", self.label));
        self.state = CommandState::RolledBack;
        if self.fail_on_rollback {
            return Err(PersistError::ExecutionError(format!(
                "{} refused to roll back",
                self.label
            )));
        }
        Ok(())
    }

    fn wait_context(&mut self, stream: ContextStream, key: &str, required: bool) {
        self.waits.wait(stream, key, required);
    }

    fn register(&mut self, stream: ContextStream, key: &str, value: Value, fresh: bool) {
        self.waits.accept(stream, key, value, fresh);
    }
}
