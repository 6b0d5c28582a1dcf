//! On-disk script format.
//!
//! ```json
//! {
//!   "include": ["base.json"],
//!   "changesets": [
//!     {
//!       "version": "1.0",
//!       "author": "alice",
//!       "description": "users table",
//!       "tags": ["dev"],
//!       "statements": ["CREATE TABLE ${keyspace}.users (id uuid PRIMARY KEY)"]
//!     }
//!   ]
//! }
//! ```

use crate::error::ScriptError;
use crate::substitute::{substitute, PlaceholderError};
use driftlog_core::{ChangeSetDefinition, Variables};
use serde::Deserialize;

/// A parsed script file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptFile {
    /// Scripts to load before this one, relative to this file.
    #[serde(default)]
    pub include: Vec<String>,
    /// Change-sets declared by this file, in order.
    #[serde(default)]
    pub changesets: Vec<ScriptChangeSet>,
}

/// A change-set as written in a script.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptChangeSet {
    /// Version label. Required and non-blank.
    pub version: String,
    /// Who wrote the change-set.
    #[serde(default)]
    pub author: Option<String>,
    /// Free-form description, stored in the log.
    #[serde(default)]
    pub description: Option<String>,
    /// Tags gating the change-set. Empty means it always runs.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Statements in execution order, `${name}` placeholders unexpanded.
    pub statements: Vec<String>,
}

impl ScriptChangeSet {
    /// Validate, substitute variables and convert to a definition.
    pub fn into_definition(
        self,
        script: &str,
        index: usize,
        variables: &Variables,
    ) -> Result<ChangeSetDefinition, ScriptError> {
        let invalid = |message: &str| ScriptError::Invalid {
            script: script.to_string(),
            index,
            message: message.to_string(),
        };

        if self.version.trim().is_empty() {
            return Err(invalid("version is required"));
        }
        if self.statements.is_empty() {
            return Err(invalid("at least one statement is required"));
        }
        if self.statements.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid("statements must not be empty"));
        }
        if self.tags.iter().any(|t| t.trim().is_empty()) {
            return Err(invalid("tags must not be empty"));
        }

        let statements = self
            .statements
            .iter()
            .map(|statement| substitute(statement, variables))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| match err {
                PlaceholderError::Unknown(name) => ScriptError::UnknownVariable {
                    script: script.to_string(),
                    index,
                    name,
                },
                PlaceholderError::Unterminated => ScriptError::UnterminatedPlaceholder {
                    script: script.to_string(),
                    index,
                },
            })?;

        Ok(ChangeSetDefinition {
            statements,
            version: self.version,
            author: self.author,
            description: self.description,
            tags: self.tags.into_iter().collect(),
        })
    }
}
