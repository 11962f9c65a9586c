// ============================================================================
// Persistence Command Module
// ============================================================================
//
// Implements the Command Pattern for row-level persistence intents. Every
// command carries transaction context: it can declare waits on values that
// other commands produce, receive those values, and publish its own produced
// values once executed.
//
// Command kinds:
// - Leaf commands (Insert/Update/Delete/Nil): one atomic row operation
// - Sequence: strict execution order
// - Branch: exactly one of two candidates, chosen at run time
// - Split: two-phase persistence of a single logical change
//
// ============================================================================

pub mod branch;
pub mod delete;
pub mod insert;
pub mod nil;
pub mod sequence;
pub mod split;
pub mod state;
pub mod update;
pub mod waits;

pub use branch::Branch;
pub use delete::DeleteCommand;
pub use insert::InsertCommand;
pub use nil::NilCommand;
pub use sequence::Sequence;
pub use split::Split;
pub use state::CommandState;
pub use update::UpdateCommand;
pub use waits::{ContextWait, ContextWaits};

use crate::context::{ContextStore, ContextStream};
use crate::core::{Result, Value};
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global command ID counter
static NEXT_COMMAND_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a command within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u64);

impl CommandId {
    /// Generate a new unique command ID
    pub fn new() -> Self {
        CommandId(NEXT_COMMAND_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd_{}", self.0)
    }
}

/// Boxed command for tree composition and dynamic dispatch.
pub type CommandBox = Box<dyn CarrierCommand>;

/// Bookkeeping for one scheduler pass over the command trees.
///
/// `executed` is the transaction's execution journal: command IDs in the
/// exact order they executed, which doubles as the rollback stack.
pub struct SchedulerPass<'a> {
    pub context: &'a mut ContextStore,
    pub executed: &'a mut Vec<CommandId>,
    pub pending: usize,
}

/// The contract every composable persistence command implements.
///
/// A command executes at most once. Readiness is monotonic: once every
/// required wait is satisfied the command stays ready, because context
/// entries are never deleted during a run.
#[async_trait]
pub trait CarrierCommand: Send + Sync {
    fn id(&self) -> CommandId;

    /// Command kind, for logs and error messages
    fn name(&self) -> &'static str;

    /// True once every required wait has a registered value
    fn is_ready(&self, cx: &ContextStore) -> bool;

    fn is_executed(&self) -> bool;

    /// Perform the row operation using currently available context values.
    ///
    /// # Errors
    /// Returns an error if the command already executed or if the underlying
    /// data access fails.
    async fn execute(&mut self, cx: &ContextStore) -> Result<()>;

    /// Push values produced by a successful execute into the context store
    /// (`fresh = true`) so dependents unblock.
    fn complete(&mut self, cx: &mut ContextStore) -> Result<()>;

    /// Reverse the effect of a prior successful execute. No-op if the
    /// command never executed; idempotent if called more than once.
    async fn roll_back(&mut self) -> Result<()>;

    /// Declare a dependency on `(stream, key)` before execution begins.
    fn wait_context(&mut self, stream: ContextStream, key: &str, required: bool);

    /// Hand a value to this command. Composites route the registration to
    /// the child that needs that particular `(stream, key)`.
    fn register(&mut self, stream: ContextStream, key: &str, value: Value, fresh: bool);

    /// Advance this subtree by one scheduler pass: execute whatever is
    /// currently reachable and ready, count the rest as pending.
    ///
    /// The default body covers leaf commands; composites override it to
    /// steer traversal.
    async fn advance(&mut self, pass: &mut SchedulerPass<'_>) -> Result<()> {
        if self.is_executed() {
            return Ok(());
        }
        if !self.is_ready(pass.context) {
            pass.pending += 1;
            return Ok(());
        }
        log::debug!("executing {} {}", self.name(), self.id());
        self.execute(pass.context).await?;
        pass.executed.push(self.id());
        self.complete(pass.context)
    }

    /// Locate the executed command with the given ID inside this subtree and
    /// roll it back. Returns `None` when the ID does not live here.
    async fn roll_back_in(&mut self, id: CommandId) -> Option<Result<()>> {
        if self.id() == id {
            Some(self.roll_back().await)
        } else {
            None
        }
    }
}
