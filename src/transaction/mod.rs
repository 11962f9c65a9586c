// ============================================================================
// Transaction Module
// ============================================================================
//
// One transaction run converts a set of pending persistence commands into a
// correctly ordered sequence of row operations: commands whose data depends
// on values produced elsewhere wait for those values, and any failure
// unwinds everything already executed.
//
// Design Patterns Used:
// - Command Pattern: reversible persistence operations
// - State Pattern: command lifecycle (Pending, Executed, RolledBack)
//
// ============================================================================

pub mod runner;

pub use runner::{RunError, RunReport, TransactionRunner};
