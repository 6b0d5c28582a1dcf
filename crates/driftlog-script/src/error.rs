//! Script loading errors.

use driftlog_core::MigrateError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading, parsing or validating a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The script file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The script is not valid JSON or does not match the script format.
    #[error("invalid script {script}: {source}")]
    Parse {
        /// Script name.
        script: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// A script includes itself, directly or transitively.
    #[error("include cycle: {}", chain.join(" -> "))]
    IncludeCycle {
        /// Include chain ending with the repeated script.
        chain: Vec<String>,
    },

    /// A placeholder names a variable that was not supplied.
    #[error("unknown variable `{name}` in change-set #{index} of {script}")]
    UnknownVariable {
        /// Script name.
        script: String,
        /// Index of the change-set within its script.
        index: usize,
        /// Variable name.
        name: String,
    },

    /// A `${` placeholder is never closed.
    #[error("unterminated placeholder in change-set #{index} of {script}")]
    UnterminatedPlaceholder {
        /// Script name.
        script: String,
        /// Index of the change-set within its script.
        index: usize,
    },

    /// A change-set is missing required content.
    #[error("invalid change-set #{index} of {script}: {message}")]
    Invalid {
        /// Script name.
        script: String,
        /// Index of the change-set within its script.
        index: usize,
        /// What is wrong.
        message: String,
    },
}

impl From<ScriptError> for MigrateError {
    fn from(err: ScriptError) -> Self {
        let script = match &err {
            ScriptError::Io { path, .. } => path.display().to_string(),
            ScriptError::Parse { script, .. }
            | ScriptError::UnknownVariable { script, .. }
            | ScriptError::UnterminatedPlaceholder { script, .. }
            | ScriptError::Invalid { script, .. } => script.clone(),
            ScriptError::IncludeCycle { chain } => chain.first().cloned().unwrap_or_default(),
        };
        MigrateError::load(script, err.to_string())
    }
}
