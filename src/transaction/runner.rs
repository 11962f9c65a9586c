// ============================================================================
// Transaction Runner
// ============================================================================
//
// Drives a set of command trees to completion or failure. Each pass executes
// every reachable command whose waits are satisfied, flushing produced
// context immediately so dependents unblock within the same run. A pass
// that executes nothing while commands remain pending means the supplied
// trees contain a cyclic or unsatisfiable required dependency.
//
// On any failure the executed prefix is unwound in exact reverse execution
// order. Rollback errors never stop the unwind; they are aggregated into
// the returned error.
//
// ============================================================================

use crate::command::{CarrierCommand, CommandBox, CommandId, SchedulerPass};
use crate::context::ContextStore;
use crate::core::PersistError;
use thiserror::Error;

/// Terminal failure of a transaction run
#[derive(Error, Debug)]
pub enum RunError {
    /// A full pass made no progress while commands remain pending:
    /// the tree holds a cyclic or unsatisfiable required wait.
    #[error("Transaction deadlocked: {pending} pending command(s) with unsatisfiable waits")]
    ReadinessDeadlock {
        pending: usize,
        rollback_errors: Vec<PersistError>,
    },

    /// An underlying write failed; everything already executed was unwound.
    #[error("Transaction failed: {cause}")]
    ExecutionFailure {
        cause: PersistError,
        rollback_errors: Vec<PersistError>,
    },
}

impl RunError {
    /// Errors collected while unwinding already-executed commands
    pub fn rollback_errors(&self) -> &[PersistError] {
        match self {
            RunError::ReadinessDeadlock {
                rollback_errors, ..
            } => rollback_errors,
            RunError::ExecutionFailure {
                rollback_errors, ..
            } => rollback_errors,
        }
    }

    /// True when every executed command rolled back cleanly
    pub fn rollback_clean(&self) -> bool {
        self.rollback_errors().is_empty()
    }
}

/// Outcome of a successful transaction run
#[derive(Debug)]
pub struct RunReport {
    /// Number of commands executed, in total across all trees
    pub executed: usize,
    /// Final context store, exposing every value published during the run
    pub context: ContextStore,
}

/// A single transaction run over a set of command trees.
///
/// The runner owns its context store; nothing about the run is ambient or
/// global, and a runner is never shared between concurrent transactions.
/// Trees pushed at the top level form an unordered set scheduled purely by
/// readiness; ordering constraints between commands are expressed with
/// [`Sequence`](crate::command::Sequence) or context waits.
///
/// # Examples
///
/// ```
/// use rowflow::{CarrierCommand, ContextStream, InMemoryAccess, InsertCommand, TransactionRunner};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let access = Arc::new(InMemoryAccess::new());
/// access.create_table("users", "id").await;
/// access.create_table("orders", "id").await;
///
/// // the order's foreign key is unknown until the user row exists
/// let user = InsertCommand::new(access.clone(), "users")
///     .column("name", "Alice")
///     .publish_key(ContextStream::Data, "user_id");
/// let mut order = InsertCommand::new(access.clone(), "orders").column("total", 9.5);
/// order.wait_context(ContextStream::Data, "user_id", true);
///
/// let mut runner = TransactionRunner::new();
/// runner.push(order); // pushed first, executes second
/// runner.push(user);
///
/// let report = runner.run().await.unwrap();
/// assert_eq!(report.executed, 2);
/// # });
/// ```
pub struct TransactionRunner {
    commands: Vec<CommandBox>,
    context: ContextStore,
}

impl TransactionRunner {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            context: ContextStore::new(),
        }
    }

    /// Add a command tree to the transaction set
    pub fn push(&mut self, command: impl CarrierCommand + 'static) {
        self.commands.push(Box::new(command));
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drive every pushed tree to completion or failure.
    ///
    /// # Errors
    /// [`RunError::ExecutionFailure`] if an underlying write failed,
    /// [`RunError::ReadinessDeadlock`] if pending commands can never become
    /// ready. In both cases every already-executed command has been rolled
    /// back in reverse execution order.
    pub async fn run(self) -> Result<RunReport, RunError> {
        let Self {
            mut commands,
            mut context,
        } = self;
        let mut journal: Vec<CommandId> = Vec::new();

        log::debug!("transaction run started: {} command tree(s)", commands.len());

        loop {
            let executed_before = journal.len();
            let mut failure: Option<PersistError> = None;
            let pending;
            {
                let mut pass = SchedulerPass {
                    context: &mut context,
                    executed: &mut journal,
                    pending: 0,
                };
                for command in commands.iter_mut() {
                    if let Err(cause) = command.advance(&mut pass).await {
                        failure = Some(cause);
                        break;
                    }
                }
                pending = pass.pending;
            }

            if let Some(cause) = failure {
                log::error!("command execution failed: {}", cause);
                let rollback_errors = unwind(&mut commands, &journal).await;
                return Err(RunError::ExecutionFailure {
                    cause,
                    rollback_errors,
                });
            }

            if pending == 0 {
                log::debug!(
                    "transaction run finished: {} command(s) executed",
                    journal.len()
                );
                return Ok(RunReport {
                    executed: journal.len(),
                    context,
                });
            }

            if journal.len() == executed_before {
                log::error!(
                    "transaction deadlocked: {} pending command(s) made no progress",
                    pending
                );
                let rollback_errors = unwind(&mut commands, &journal).await;
                return Err(RunError::ReadinessDeadlock {
                    pending,
                    rollback_errors,
                });
            }
        }
    }
}

impl Default for TransactionRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Roll back every executed command, newest first. Collects errors instead
/// of stopping so the remaining commands still get unwound.
async fn unwind(commands: &mut [CommandBox], journal: &[CommandId]) -> Vec<PersistError> {
    let mut errors = Vec::new();
    for id in journal.iter().rev() {
        let mut found = false;
        for command in commands.iter_mut() {
            match command.roll_back_in(*id).await {
                Some(Ok(())) => {
                    log::debug!("rolled back {}", id);
                    found = true;
                    break;
                }
                Some(Err(e)) => {
                    log::error!("rollback of {} failed: {}", id, e);
                    errors.push(e);
                    found = true;
                    break;
                }
                None => {}
            }
        }
        if !found {
            log::warn!("executed command {} not found during rollback", id);
        }
    }
    errors
}
