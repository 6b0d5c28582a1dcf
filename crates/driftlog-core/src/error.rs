//! Error types for migration runs.

use crate::database::DatabaseError;
use thiserror::Error;

/// Errors surfaced by a migration run.
///
/// Every variant is fatal for the run that produced it. Nothing is retried
/// and nothing is swallowed; the caller decides what to do next.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// A change-set recorded in the log no longer matches its declaration.
    #[error(
        "change-set at revision {revision} (version {version}) was altered: declared change-set \
         #{position} (version {declared_version}) does not match the recorded hash"
    )]
    Altered {
        /// Revision of the log entry that failed verification.
        revision: u64,
        /// Declaration index of the change-set compared against it.
        position: usize,
        /// Version recorded in the log entry.
        version: String,
        /// Version currently declared at `position`.
        declared_version: String,
    },

    /// A change-set recorded in the log is no longer declared at all.
    #[error(
        "change-set at revision {revision} (version {version}) was removed from the script"
    )]
    Removed {
        /// Revision of the orphaned log entry.
        revision: u64,
        /// Version recorded in the log entry.
        version: String,
    },

    /// A statement failed against the database.
    #[error(
        "change-set #{position} (version {version}) failed at statement {statement_index}: {source}"
    )]
    Execution {
        /// Declaration index of the failing change-set.
        position: usize,
        /// Version of the failing change-set.
        version: String,
        /// Index of the failing statement within the change-set.
        statement_index: usize,
        /// The database failure.
        source: DatabaseError,
    },

    /// The script source could not be read, parsed or validated.
    #[error("failed to load {script}: {message}")]
    Load {
        /// Name of the script source.
        script: String,
        /// Description of the failure.
        message: String,
    },

    /// The conditional write on the log found the revision already taken.
    #[error(
        "revision {revision} (bucket {bucket}) is already recorded; another run is applying \
         change-sets concurrently"
    )]
    StoreRace {
        /// Bucket of the contested key.
        bucket: u64,
        /// The contested revision.
        revision: u64,
    },

    /// The run was cancelled between change-sets.
    #[error("run cancelled after applying {applied} change-set(s)")]
    Cancelled {
        /// Number of change-sets applied before cancellation.
        applied: usize,
    },

    /// The change log contents break its own invariants.
    #[error("change log corrupted: {message}")]
    LogCorrupted {
        /// Description of the corruption.
        message: String,
    },

    /// The log was created with different layout settings.
    #[error("change log mismatch: {message}")]
    StoreMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl MigrateError {
    /// Create a load error for the named script.
    pub fn load(script: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Load {
            script: script.into(),
            message: message.into(),
        }
    }

    /// Whether this error reports drift between the log and the declarations.
    pub fn is_alteration(&self) -> bool {
        matches!(self, Self::Altered { .. } | Self::Removed { .. })
    }

    /// The log revision this error refers to, if any.
    pub fn revision(&self) -> Option<u64> {
        match self {
            Self::Altered { revision, .. }
            | Self::Removed { revision, .. }
            | Self::StoreRace { revision, .. } => Some(*revision),
            _ => None,
        }
    }
}
