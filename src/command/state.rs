// ============================================================================
// Command State Management
// ============================================================================
//
// Implements the State Pattern for the command lifecycle. Each command moves
// through defined states: Pending -> Executed, and Executed -> RolledBack
// when a failure elsewhere in the transaction unwinds it.
//
// ============================================================================

use std::fmt;

/// Command lifecycle state following the State Pattern
///
/// State transitions:
/// ```text
/// Pending ──execute──> Executed ──rollBack──> RolledBack
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    /// Command has not executed yet and may still be waiting on context.
    Pending,

    /// Command executed successfully (terminal on the success path).
    Executed,

    /// Command's effect was reversed after a failure in the transaction.
    RolledBack,
}

impl CommandState {
    /// Check if the command may still execute
    pub fn is_pending(&self) -> bool {
        matches!(self, CommandState::Pending)
    }

    pub fn is_executed(&self) -> bool {
        matches!(self, CommandState::Executed)
    }

    /// Check if the command is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, CommandState::Executed | CommandState::RolledBack)
    }
}

impl fmt::Display for CommandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandState::Pending => write!(f, "PENDING"),
            CommandState::Executed => write!(f, "EXECUTED"),
            CommandState::RolledBack => write!(f, "ROLLED_BACK"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(CommandState::Pending.is_pending());
        assert!(!CommandState::Pending.is_terminal());

        assert!(CommandState::Executed.is_executed());
        assert!(CommandState::Executed.is_terminal());

        assert!(!CommandState::RolledBack.is_executed());
        assert!(CommandState::RolledBack.is_terminal());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CommandState::Pending.to_string(), "PENDING");
        assert_eq!(CommandState::Executed.to_string(), "EXECUTED");
        assert_eq!(CommandState::RolledBack.to_string(), "ROLLED_BACK");
    }
}
