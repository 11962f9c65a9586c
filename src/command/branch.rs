use super::{CarrierCommand, CommandBox, CommandId, SchedulerPass};
use crate::context::{ContextStore, ContextStream};
use crate::core::{Result, Value};
use async_trait::async_trait;
use std::sync::OnceLock;

/// Exactly one of two candidate commands, chosen at run time.
///
/// The condition is evaluated once, at the point the branch is first asked
/// to execute. From then on the chosen candidate is "the" command for all
/// readiness, execution, completion, and rollback purposes; the unselected
/// candidate is discarded and never participates in anything.
///
/// Waits and registrations arriving before selection forward to both
/// candidates; the one left unselected is inert, so this is harmless.
pub struct Branch {
    id: CommandId,
    condition: Box<dyn Fn() -> bool + Send + Sync>,
    on_true: CommandBox,
    on_false: CommandBox,
    selected: OnceLock<bool>,
}

impl Branch {
    pub fn new(
        condition: impl Fn() -> bool + Send + Sync + 'static,
        on_true: impl CarrierCommand + 'static,
        on_false: impl CarrierCommand + 'static,
    ) -> Self {
        Self {
            id: CommandId::new(),
            condition: Box::new(condition),
            on_true: Box::new(on_true),
            on_false: Box::new(on_false),
            selected: OnceLock::new(),
        }
    }

    /// True once the condition has been evaluated
    pub fn is_selected(&self) -> bool {
        self.selected.get().is_some()
    }

    fn choose(&self) -> bool {
        *self.selected.get_or_init(|| (self.condition)())
    }

    fn chosen(&self) -> &CommandBox {
        if self.choose() {
            &self.on_true
        } else {
            &self.on_false
        }
    }

    fn chosen_mut(&mut self) -> &mut CommandBox {
        if self.choose() {
            &mut self.on_true
        } else {
            &mut self.on_false
        }
    }
}

#[async_trait]
impl CarrierCommand for Branch {
    fn id(&self) -> CommandId {
        self.id
    }

    fn name(&self) -> &'static str {
        "BRANCH"
    }

    fn is_ready(&self, cx: &ContextStore) -> bool {
        self.chosen().is_ready(cx)
    }

    fn is_executed(&self) -> bool {
        match self.selected.get() {
            Some(true) => self.on_true.is_executed(),
            Some(false) => self.on_false.is_executed(),
            None => false,
        }
    }

    async fn execute(&mut self, cx: &ContextStore) -> Result<()> {
        self.chosen_mut().execute(cx).await
    }

    fn complete(&mut self, cx: &mut ContextStore) -> Result<()> {
        self.chosen_mut().complete(cx)
    }

    async fn roll_back(&mut self) -> Result<()> {
        // only a selected candidate can have executed
        match self.selected.get() {
            Some(true) => self.on_true.roll_back().await,
            Some(false) => self.on_false.roll_back().await,
            None => Ok(()),
        }
    }

    fn wait_context(&mut self, stream: ContextStream, key: &str, required: bool) {
        self.on_true.wait_context(stream, key, required);
        self.on_false.wait_context(stream, key, required);
    }

    fn register(&mut self, stream: ContextStream, key: &str, value: Value, fresh: bool) {
        self.on_true.register(stream, key, value.clone(), fresh);
        self.on_false.register(stream, key, value, fresh);
    }

    async fn advance(&mut self, pass: &mut SchedulerPass<'_>) -> Result<()> {
        self.chosen_mut().advance(pass).await
    }

    async fn roll_back_in(&mut self, id: CommandId) -> Option<Result<()>> {
        match self.selected.get() {
            Some(true) => self.on_true.roll_back_in(id).await,
            Some(false) => self.on_false.roll_back_in(id).await,
            None => None,
        }
    }
}
