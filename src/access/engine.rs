use crate::core::{ColumnMap, Result, Value};
use async_trait::async_trait;

/// Row-level data access trait - allows pluggable drivers
///
/// One implementor serves one physical store. Each leaf command is bound to
/// an implementor and treats it as a single-writer resource for the
/// duration of a transaction run.
#[async_trait]
pub trait RowAccess: Send + Sync {
    /// Insert a row; returns the key under which it was stored
    async fn insert(&self, table: &str, columns: ColumnMap) -> Result<Value>;

    /// Update rows matching `criteria`; returns the number of affected rows
    async fn update(&self, table: &str, criteria: ColumnMap, columns: ColumnMap) -> Result<u64>;

    /// Delete rows matching `criteria`; returns the number of affected rows
    async fn delete(&self, table: &str, criteria: ColumnMap) -> Result<u64>;
}
