use super::RowAccess;
use crate::core::{ColumnMap, PersistError, Result, Value};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Debug)]
struct Table {
    key_column: String,
    unique: Vec<String>,
    next_key: i64,
    rows: Vec<ColumnMap>,
}

impl Table {
    fn new(key_column: &str, unique: &[&str]) -> Self {
        Self {
            key_column: key_column.to_string(),
            unique: unique.iter().map(|c| c.to_string()).collect(),
            next_key: 0,
            rows: Vec::new(),
        }
    }
}

/// In-memory reference driver for tests and examples.
///
/// Tables hold rows as column maps. The key column autoincrements unless
/// the caller supplies a value; the key column and any configured unique
/// columns reject duplicates. Criteria match on column equality, with a
/// missing column reading as NULL. `close` makes every subsequent call
/// fail, simulating a lost connection.
pub struct InMemoryAccess {
    tables: RwLock<HashMap<String, Table>>,
    closed: AtomicBool,
}

impl InMemoryAccess {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Create (or replace) a table with the given key column
    pub async fn create_table(&self, name: &str, key_column: &str) {
        self.create_table_with_unique(name, key_column, &[]).await;
    }

    /// Create (or replace) a table with additional unique columns
    pub async fn create_table_with_unique(&self, name: &str, key_column: &str, unique: &[&str]) {
        let mut tables = self.tables.write().await;
        tables.insert(name.to_string(), Table::new(key_column, unique));
    }

    /// Snapshot of a table's rows, for assertions
    pub async fn rows(&self, table: &str) -> Result<Vec<ColumnMap>> {
        let tables = self.tables.read().await;
        let table = tables
            .get(table)
            .ok_or_else(|| PersistError::TableNotFound(table.to_string()))?;
        Ok(table.rows.clone())
    }

    pub async fn row_count(&self, table: &str) -> Result<usize> {
        Ok(self.rows(table).await?.len())
    }

    /// Simulate a lost connection: every subsequent call fails
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PersistError::ConnectionError(
                "connection is closed".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for InMemoryAccess {
    fn default() -> Self {
        Self::new()
    }
}

fn row_matches(row: &ColumnMap, criteria: &ColumnMap) -> bool {
    criteria
        .iter()
        .all(|(column, value)| row.get(column).unwrap_or(&Value::Null) == value)
}

#[async_trait]
impl RowAccess for InMemoryAccess {
    async fn insert(&self, table: &str, columns: ColumnMap) -> Result<Value> {
        self.ensure_open()?;
        let mut tables = self.tables.write().await;
        let table_entry = tables
            .get_mut(table)
            .ok_or_else(|| PersistError::TableNotFound(table.to_string()))?;

        let key_column = table_entry.key_column.clone();
        let key = match columns.get(&key_column) {
            Some(value) if !value.is_null() => value.clone(),
            _ => {
                table_entry.next_key += 1;
                Value::Integer(table_entry.next_key)
            }
        };

        if table_entry
            .rows
            .iter()
            .any(|row| row.get(&key_column) == Some(&key))
        {
            return Err(PersistError::ConstraintViolation(format!(
                "Duplicate key {} in table '{}'",
                key, table
            )));
        }

        for column in &table_entry.unique {
            if let Some(value) = columns.get(column) {
                if !value.is_null()
                    && table_entry
                        .rows
                        .iter()
                        .any(|row| row.get(column) == Some(value))
                {
                    return Err(PersistError::ConstraintViolation(format!(
                        "Unique constraint violated for column '{}' in table '{}'",
                        column, table
                    )));
                }
            }
        }

        let mut row = columns;
        row.insert(key_column, key.clone());
        table_entry.rows.push(row);
        Ok(key)
    }

    async fn update(&self, table: &str, criteria: ColumnMap, columns: ColumnMap) -> Result<u64> {
        self.ensure_open()?;
        let mut tables = self.tables.write().await;
        let table_entry = tables
            .get_mut(table)
            .ok_or_else(|| PersistError::TableNotFound(table.to_string()))?;

        let mut affected = 0u64;
        for row in table_entry
            .rows
            .iter_mut()
            .filter(|row| row_matches(row, &criteria))
        {
            for (column, value) in &columns {
                row.insert(column.clone(), value.clone());
            }
            affected += 1;
        }
        Ok(affected)
    }

    async fn delete(&self, table: &str, criteria: ColumnMap) -> Result<u64> {
        self.ensure_open()?;
        let mut tables = self.tables.write().await;
        let table_entry = tables
            .get_mut(table)
            .ok_or_else(|| PersistError::TableNotFound(table.to_string()))?;

        let before = table_entry.rows.len();
        table_entry.rows.retain(|row| !row_matches(row, &criteria));
        Ok((before - table_entry.rows.len()) as u64)
    }
}
