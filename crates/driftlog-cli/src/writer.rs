//! Database that writes statements out instead of executing them.

use driftlog_core::{Database, DatabaseError};
use parking_lot::Mutex;
use std::io::Write;

/// Emits each statement, `;`-terminated, for piping into the store's shell.
pub struct ScriptWriter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ScriptWriter {
    /// Create a writer over `out`.
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl Database for ScriptWriter {
    fn execute(&self, statement: &str) -> Result<(), DatabaseError> {
        let mut out = self.out.lock();
        let statement = statement.trim_end();
        let result = if statement.ends_with(';') {
            writeln!(out, "{statement}")
        } else {
            writeln!(out, "{statement};")
        };
        result
            .and_then(|()| out.flush())
            .map_err(|e| DatabaseError::new(format!("cannot write statement: {e}")))
    }
}
