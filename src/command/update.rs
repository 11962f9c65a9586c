use super::{CarrierCommand, CommandId, CommandState, ContextWaits};
use crate::access::RowAccess;
use crate::context::{ContextStore, ContextStream};
use crate::core::{ColumnMap, PersistError, Result, Value};
use async_trait::async_trait;
use std::sync::Arc;

/// Update rows matching a criteria set.
///
/// Data-stream waits resolve into the written columns, Criteria-stream waits
/// into the row-targeting criteria (e.g. a foreign key produced by another
/// command used as a where-condition). An update whose resolved column set
/// is empty completes without touching the driver.
///
/// Rollback re-applies the prior column image supplied by the builder; the
/// access boundary exposes no reads, so without a prior image the rollback
/// is a logged no-op.
pub struct UpdateCommand {
    id: CommandId,
    access: Arc<dyn RowAccess>,
    table: String,
    criteria: ColumnMap,
    columns: ColumnMap,
    waits: ContextWaits,
    prior: ColumnMap,
    applied_criteria: Option<ColumnMap>,
    state: CommandState,
}

impl UpdateCommand {
    pub fn new(access: Arc<dyn RowAccess>, table: impl Into<String>) -> Self {
        Self {
            id: CommandId::new(),
            access,
            table: table.into(),
            criteria: ColumnMap::new(),
            columns: ColumnMap::new(),
            waits: ContextWaits::new(),
            prior: ColumnMap::new(),
            applied_criteria: None,
            state: CommandState::Pending,
        }
    }

    /// Set a column value known at build time
    pub fn column(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.insert(name.into(), value.into());
        self
    }

    /// Add a row-targeting condition known at build time
    pub fn criterion(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.criteria.insert(name.into(), value.into());
        self
    }

    /// Record the previous value of a column so the update can be reversed
    pub fn prior(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.prior.insert(name.into(), value.into());
        self
    }

    pub fn state(&self) -> CommandState {
        self.state
    }
}

#[async_trait]
impl CarrierCommand for UpdateCommand {
    fn id(&self) -> CommandId {
        self.id
    }

    fn name(&self) -> &'static str {
        "UPDATE"
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

        if columns.is_empty() {
            log::debug!("{} has nothing to write to '{}'", self.id, self.table);
            self.state = CommandState::Executed;
            return Ok(());
        }

        let mut criteria = self.criteria.clone();
        criteria.extend(self.waits.resolve(ContextStream::Criteria, cx));
        if criteria.is_empty() {
            return Err(PersistError::ExecutionError(format!(
                "Refusing to update '{}' without criteria",
                self.table
            )));
        }

        let affected = self
            .access
            .update(&self.table, criteria.clone(), columns)
            .await?;
        if affected == 0 {
            log::warn!("{} matched no rows in '{}'", self.id, self.table);
        }

        self.applied_criteria = Some(criteria);
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

        match (&self.applied_criteria, self.prior.is_empty()) {
            (Some(criteria), false) => {
                self.access
                    .update(&self.table, criteria.clone(), self.prior.clone())
                    .await?;
            }
            (Some(_), true) => {
                log::warn!(
                    "{} cannot restore '{}': no prior column image",
                    self.id,
                    self.table
                );
            }
            // the driver was never touched
            (None, _) => {}
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

    async fn seeded_access() -> Arc<InMemoryAccess> {
        let access = Arc::new(InMemoryAccess::new());
        access.create_table("users", "id").await;
        access
            .insert("users", columns([("id", 1i64), ("age", 30i64)]))
            .await
            .unwrap();
        access
    }

    #[tokio::test]
    async fn test_update_applies_columns() {
        let access = seeded_access().await;

        let mut update = UpdateCommand::new(access.clone(), "users")
            .criterion("id", 1i64)
            .column("age", 31i64);
        let cx = ContextStore::new();

        update.execute(&cx).await.unwrap();

        let rows = access.rows("users").await.unwrap();
        assert_eq!(rows[0].get("age"), Some(&Value::Integer(31)));
    }

    #[tokio::test]
    async fn test_update_with_no_columns_is_noop() {
        let access = seeded_access().await;

        let mut update = UpdateCommand::new(access.clone(), "users").criterion("id", 1i64);
        let cx = ContextStore::new();

        update.execute(&cx).await.unwrap();
        assert!(update.is_executed());

        let rows = access.rows("users").await.unwrap();
        assert_eq!(rows[0].get("age"), Some(&Value::Integer(30)));
    }

    #[tokio::test]
    async fn test_update_refuses_empty_criteria() {
        let access = seeded_access().await;

        let mut update = UpdateCommand::new(access, "users").column("age", 40i64);
        let cx = ContextStore::new();

        assert!(update.execute(&cx).await.is_err());
        assert!(!update.is_executed());
    }

    #[tokio::test]
    async fn test_update_rollback_restores_prior_image() {
        let access = seeded_access().await;

        let mut update = UpdateCommand::new(access.clone(), "users")
            .criterion("id", 1i64)
            .column("age", 31i64)
            .prior("age", 30i64);
        let cx = ContextStore::new();

        update.execute(&cx).await.unwrap();
        update.roll_back().await.unwrap();

        let rows = access.rows("users").await.unwrap();
        assert_eq!(rows[0].get("age"), Some(&Value::Integer(30)));
    }

    #[tokio::test]
    async fn test_update_criteria_from_context() {
        let access = seeded_access().await;

        let mut update = UpdateCommand::new(access.clone(), "users").column("age", 32i64);
        update.wait_context(ContextStream::Criteria, "id", true);

        let mut cx = ContextStore::new();
        assert!(!update.is_ready(&cx));

        cx.register(ContextStream::Criteria, "id", Value::Integer(1), true);
        assert!(update.is_ready(&cx));

        update.execute(&cx).await.unwrap();
        let rows = access.rows("users").await.unwrap();
        assert_eq!(rows[0].get("age"), Some(&Value::Integer(32)));
    }
}
