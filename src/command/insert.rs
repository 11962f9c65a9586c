use super::{CarrierCommand, CommandId, CommandState, ContextWaits};
use crate::access::RowAccess;
use crate::context::{ContextStore, ContextStream};
use crate::core::{ColumnMap, PersistError, Result, Value};
use async_trait::async_trait;
use std::sync::Arc;

/// Insert one row into a table.
///
/// Columns known at build time are set with [`column`](Self::column);
/// columns whose values another command produces are declared with
/// `wait_context` on the Data stream and resolved at execute time. The key
/// generated by the driver is captured and, on `complete`, registered under
/// every configured publication target so dependent commands unblock.
///
/// Rollback deletes the inserted row by its key column.
pub struct InsertCommand {
    id: CommandId,
    access: Arc<dyn RowAccess>,
    table: String,
    columns: ColumnMap,
    waits: ContextWaits,
    key_column: String,
    publish: Vec<(ContextStream, String)>,
    generated: Option<Value>,
    state: CommandState,
}

impl InsertCommand {
    pub fn new(access: Arc<dyn RowAccess>, table: impl Into<String>) -> Self {
        Self {
            id: CommandId::new(),
            access,
            table: table.into(),
            columns: ColumnMap::new(),
            waits: ContextWaits::new(),
            key_column: "id".to_string(),
            publish: Vec::new(),
            generated: None,
            state: CommandState::Pending,
        }
    }

    /// Set a column value known at build time
    pub fn column(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.insert(name.into(), value.into());
        self
    }

    /// Name of the column holding the row key (default `id`)
    pub fn key_column(mut self, name: impl Into<String>) -> Self {
        self.key_column = name.into();
        self
    }

    /// Register the generated key under `(stream, key)` once this command
    /// completes. May be called multiple times to feed several dependents.
    pub fn publish_key(mut self, stream: ContextStream, key: impl Into<String>) -> Self {
        self.publish.push((stream, key.into()));
        self
    }

    /// The key returned by the driver, available after execution
    pub fn generated_key(&self) -> Option<&Value> {
        self.generated.as_ref()
    }

    pub fn state(&self) -> CommandState {
        self.state
    }
}

#[async_trait]
impl CarrierCommand for InsertCommand {
    fn id(&self) -> CommandId {
        self.id
    }

    fn name(&self) -> &'static str {
        "INSERT"
    }

    fn is_ready(&self, cx: &ContextStore) -> bool {
        self.waits.is_satisfied(cx)
    }

    fn is_executed(&self) -> bool {
        self.state.is_executed()
    }

    async fn execute(&mut self, cx: &ContextStore) -> Result<()> {
        if !self.state.is_pending() {
            return Err(PersistError::ExecutionError(format!(
                "Cannot execute {}: command is already {}",
                self.id, self.state
            )));
        }

        let mut columns = self.columns.clone();
        columns.extend(self.waits.resolve(ContextStream::Data, cx));

        let key = self.access.insert(&self.table, columns).await?;
        log::debug!("{} inserted into '{}' with key {}", self.id, self.table, key);

        self.generated = Some(key);
        self.state = CommandState::Executed;
        Ok(())
    }

    fn complete(&mut self, cx: &mut ContextStore) -> Result<()> {
        if !self.state.is_executed() {
            return Err(PersistError::ExecutionError(format!(
                "Cannot complete {}: command is {}",
                self.id, self.state
            )));
        }
        if let Some(key) = &self.generated {
            for (stream, name) in &self.publish {
                cx.register(*stream, name, key.clone(), true);
            }
        }
        Ok(())
    }

    async fn roll_back(&mut self) -> Result<()> {
        if !self.state.is_executed() {
            return Ok(());
        }
        let Some(key) = self.generated.clone() else {
            return Ok(());
        };

        let mut criteria = ColumnMap::new();
        criteria.insert(self.key_column.clone(), key);
        let affected = self.access.delete(&self.table, criteria).await?;
        if affected == 0 {
            log::warn!("{} rollback removed no rows from '{}'", self.id, self.table);
        }

        self.state = CommandState::RolledBack;
        Ok(())
    }

    fn wait_context(&mut self, stream: ContextStream, key: &str, required: bool) {
        self.waits.wait(stream, key, required);
    }

    fn register(&mut self, stream: ContextStream, key: &str, value: Value, fresh: bool) {
        self.waits.accept(stream, key, value, fresh);
    }
}
