//! Loader collaborator interface.

use crate::definition::ChangeSetDefinition;
use crate::error::MigrateError;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Substitution variables handed to the loader.
pub type Variables = BTreeMap<String, String>;

/// Where a migration script comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// A script file. Relative includes resolve against its directory.
    File(PathBuf),
    /// Script text held in memory. Relative includes resolve against the
    /// working directory.
    Inline {
        /// Name used in error messages.
        name: String,
        /// Script text.
        text: String,
    },
}

impl ScriptSource {
    /// Create an in-memory source.
    pub fn inline(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Inline {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Name used in logs and error messages.
    pub fn name(&self) -> String {
        match self {
            ScriptSource::File(path) => path.display().to_string(),
            ScriptSource::Inline { name, .. } => name.clone(),
        }
    }
}

impl From<PathBuf> for ScriptSource {
    fn from(path: PathBuf) -> Self {
        ScriptSource::File(path)
    }
}

/// Turns a script source into an ordered, validated list of change-sets.
///
/// Implementations flatten includes and substitute variables; the engine
/// only sees the resulting sequence.
pub trait Loader: Send + Sync {
    /// Load the change-sets declared by `source`.
    fn load(
        &self,
        source: &ScriptSource,
        variables: &Variables,
    ) -> Result<Vec<ChangeSetDefinition>, MigrateError>;
}

/// Loader returning a fixed list, regardless of source.
#[derive(Debug, Clone, Default)]
pub struct StaticLoader {
    changes: Vec<ChangeSetDefinition>,
}

impl StaticLoader {
    /// Create a loader that always yields `changes`.
    pub fn new(changes: Vec<ChangeSetDefinition>) -> Self {
        Self { changes }
    }
}

impl Loader for StaticLoader {
    fn load(
        &self,
        _source: &ScriptSource,
        _variables: &Variables,
    ) -> Result<Vec<ChangeSetDefinition>, MigrateError> {
        Ok(self.changes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_names() {
        assert_eq!(ScriptSource::inline("init", "{}").name(), "init");
        let source: ScriptSource = PathBuf::from("migrations/main.json").into();
        assert_eq!(source.name(), "migrations/main.json");
    }
}
