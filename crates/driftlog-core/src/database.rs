//! Database collaborator interface.
//!
//! The engine only ever hands statements to a [`Database`]; it never parses
//! or generates them.

use parking_lot::Mutex;
use thiserror::Error;

/// Failure reported by a [`Database`] for a single statement.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DatabaseError {
    /// Driver-supplied description of the failure.
    pub message: String,
}

impl DatabaseError {
    /// Create a new database error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Executes change-set statements against the target store.
///
/// Calls are blocking. A failure aborts the remainder of the run.
pub trait Database: Send + Sync {
    /// Execute a single statement.
    fn execute(&self, statement: &str) -> Result<(), DatabaseError>;
}

/// In-memory database that records executed statements, for testing.
#[derive(Debug, Default)]
pub struct RecordingDatabase {
    executed: Mutex<Vec<String>>,
    fail_on: Mutex<Option<String>>,
}

impl RecordingDatabase {
    /// Create a new recording database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every statement containing `needle`.
    pub fn fail_on(&self, needle: impl Into<String>) {
        *self.fail_on.lock() = Some(needle.into());
    }

    /// Stop failing statements.
    pub fn clear_failure(&self) {
        *self.fail_on.lock() = None;
    }

    /// All statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    /// Number of statements executed so far.
    pub fn len(&self) -> usize {
        self.executed.lock().len()
    }

    /// Check if nothing has been executed.
    pub fn is_empty(&self) -> bool {
        self.executed.lock().is_empty()
    }
}

impl Database for RecordingDatabase {
    fn execute(&self, statement: &str) -> Result<(), DatabaseError> {
        if let Some(needle) = self.fail_on.lock().as_deref() {
            if statement.contains(needle) {
                return Err(DatabaseError::new(format!("rejected statement: {statement}")));
            }
        }
        self.executed.lock().push(statement.to_string());
        Ok(())
    }
}
