// ============================================================================
// Rowflow Library
// ============================================================================
//
// Write-persistence command engine: converts a tree of pending row-level
// persistence commands (inserts, updates, deletes, including cascaded
// changes on related entities) into a correctly ordered execution inside
// one logical transaction, with rollback on failure. A command whose data
// depends on a value not yet known (an autoincrement key generated by a
// parent insert, say) waits for that value, receives it once produced,
// and only then executes.
//
// ============================================================================

pub mod access;
pub mod command;
pub mod context;
pub mod core;
pub mod transaction;

// Re-export main types for convenience
pub use crate::core::{ColumnMap, PersistError, Result, Value, columns};
pub use access::{InMemoryAccess, RowAccess};
pub use command::{
    Branch, CarrierCommand, CommandBox, CommandId, CommandState, ContextWait, ContextWaits,
    DeleteCommand, InsertCommand, NilCommand, SchedulerPass, Sequence, Split, UpdateCommand,
};
pub use context::{ContextStore, ContextStream};
pub use transaction::{RunError, RunReport, TransactionRunner};
