use super::{CarrierCommand, CommandId, CommandState, ContextWaits};
use crate::access::RowAccess;
use crate::context::{ContextStore, ContextStream};
use crate::core::{ColumnMap, PersistError, Result, Value};
use async_trait::async_trait;
use std::sync::Arc;

/// Delete rows matching a criteria set.
///
/// Refuses to execute with an empty resolved criteria set: an unscoped
/// delete would wipe the whole table. Rollback re-inserts the prior row
/// image supplied by the builder.
pub struct DeleteCommand {
    id: CommandId,
    access: Arc<dyn RowAccess>,
    table: String,
    criteria: ColumnMap,
    waits: ContextWaits,
    prior: ColumnMap,
    state: CommandState,
}

impl DeleteCommand {
    pub fn new(access: Arc<dyn RowAccess>, table: impl Into<String>) -> Self {
        Self {
            id: CommandId::new(),
            access,
            table: table.into(),
            criteria: ColumnMap::new(),
            waits: ContextWaits::new(),
            prior: ColumnMap::new(),
            state: CommandState::Pending,
        }
    }

    /// Add a row-targeting condition known at build time
    pub fn criterion(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.criteria.insert(name.into(), value.into());
        self
    }

    /// Record the deleted row's image so the delete can be reversed
    pub fn prior(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.prior.insert(name.into(), value.into());
        self
    }

    pub fn state(&self) -> CommandState {
        self.state
    }
}

#[async_trait]
impl CarrierCommand for DeleteCommand {
    fn id(&self) -> CommandId {
        self.id
    }

    fn name(&self) -> &'static str {
        "DELETE"
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

        let mut criteria = self.criteria.clone();
        criteria.extend(self.waits.resolve(ContextStream::Criteria, cx));
        if criteria.is_empty() {
            return Err(PersistError::ExecutionError(format!(
                "Refusing to delete from '{}' without criteria",
                self.table
            )));
        }

        let affected = self.access.delete(&self.table, criteria).await?;
        if affected == 0 {
            log::warn!("{} matched no rows in '{}'", self.id, self.table);
        }

        self.state = CommandState::Executed;
        Ok(())
    }

    fn complete(&mut self, _cx: &mut ContextStore) -> Result<()> {
        if !self.state.is_executed() {
            return Err(PersistError::ExecutionError(format!(
                "Cannot complete {}: command is {}",
                self.id, self.state
            )));
        }
        Ok(())
    }

    async fn roll_back(&mut self) -> Result<()> {
        if !self.state.is_executed() {
            return Ok(());
        }

        if self.prior.is_empty() {
            log::warn!(
                "{} cannot restore deleted row in '{}': no prior row image",
                self.id,
                self.table
            );
        } else {
            self.access.insert(&self.table, self.prior.clone()).await?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::InMemoryAccess;
    use crate::core::columns;

    #[tokio::test]
    async fn test_delete_removes_matching_rows() {
        let access = Arc::new(InMemoryAccess::new());
        access.create_table("users", "id").await;
        access
            .insert("users", columns([("id", 1i64)]))
            .await
            .unwrap();
        access
            .insert("users", columns([("id", 2i64)]))
            .await
            .unwrap();

        let mut delete = DeleteCommand::new(access.clone(), "users").criterion("id", 1i64);
        let cx = ContextStore::new();

        delete.execute(&cx).await.unwrap();
        assert_eq!(access.row_count("users").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_refuses_empty_criteria() {
        let access = Arc::new(InMemoryAccess::new());
        access.create_table("users", "id").await;

        let mut delete = DeleteCommand::new(access, "users");
        let cx = ContextStore::new();

        assert!(delete.execute(&cx).await.is_err());
        assert!(!delete.is_executed());
    }

    #[tokio::test]
    async fn test_delete_rollback_reinserts_prior_image() {
        let access = Arc::new(InMemoryAccess::new());
        access.create_table("users", "id").await;
        access
            .insert(
                "users",
                columns([("id", Value::Integer(5)), ("name", Value::Text("Bob".into()))]),
            )
            .await
            .unwrap();

        let mut delete = DeleteCommand::new(access.clone(), "users")
            .criterion("id", 5i64)
            .prior("id", 5i64)
            .prior("name", "Bob");
        let cx = ContextStore::new();

        delete.execute(&cx).await.unwrap();
        assert_eq!(access.row_count("users").await.unwrap(), 0);

        delete.roll_back().await.unwrap();
        let rows = access.rows("users").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name"), Some(&Value::Text("Bob".into())));
    }
}
