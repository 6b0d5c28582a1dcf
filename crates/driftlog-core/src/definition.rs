//! Declared change-sets.

use crate::hash::{Fingerprint, HashAlgorithm};
use std::collections::BTreeSet;

/// One author-declared unit of schema change.
///
/// Produced by a loader, consumed by a single run, then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSetDefinition {
    /// Statements, executed in this order.
    pub statements: Vec<String>,
    /// Author-supplied version label. Informational only.
    pub version: String,
    /// Optional author.
    pub author: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Tags selecting which runs may apply this change-set.
    pub tags: BTreeSet<String>,
}

impl ChangeSetDefinition {
    /// Create an untagged change-set.
    pub fn new<I, S>(version: impl Into<String>, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            statements: statements.into_iter().map(Into::into).collect(),
            version: version.into(),
            author: None,
            description: None,
            tags: BTreeSet::new(),
        }
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Whether the change-set carries any tag.
    pub fn is_tagged(&self) -> bool {
        !self.tags.is_empty()
    }

    /// Fingerprint of the statements.
    pub fn fingerprint(&self, algorithm: HashAlgorithm) -> Fingerprint {
        Fingerprint::of_with(algorithm, &self.statements)
    }
}
