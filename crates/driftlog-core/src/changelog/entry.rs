//! Persisted change log entries.

use crate::definition::ChangeSetDefinition;
use crate::error::MigrateError;
use crate::hash::Fingerprint;
use rkyv::{Archive, Deserialize, Serialize};
use std::collections::BTreeSet;

/// Record of one successfully applied change-set.
///
/// Written once, never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    /// Partition bucket, derived from `revision`.
    pub bucket: u64,
    /// Position in the applied history, starting at 0.
    pub revision: u64,
    /// When the change-set was applied (microseconds since epoch).
    pub applied_at: u64,
    /// Author at apply time.
    pub author: Option<String>,
    /// Description at apply time.
    pub description: Option<String>,
    /// Fingerprint of the applied statements.
    pub hash: Fingerprint,
    /// Version label at apply time.
    pub version: String,
    /// Tags at apply time, sorted and de-duplicated.
    pub tags: Vec<String>,
}

impl ChangeLogEntry {
    /// Build the entry for a change-set that was just applied.
    pub fn for_change_set(
        revision: u64,
        bucket: u64,
        change: &ChangeSetDefinition,
        hash: Fingerprint,
    ) -> Self {
        Self {
            bucket,
            revision,
            applied_at: current_timestamp(),
            author: change.author.clone(),
            description: change.description.clone(),
            hash,
            version: change.version.clone(),
            tags: change.tags.iter().cloned().collect(),
        }
    }

    /// Tags as a set.
    pub fn tag_set(&self) -> BTreeSet<String> {
        self.tags.iter().cloned().collect()
    }

    /// Serialize the entry to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MigrateError> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| MigrateError::Serialization(e.to_string()))
    }

    /// Deserialize an entry from bytes.
    ///
    /// Entries hashed with an algorithm this build does not know are
    /// rejected as corrupt.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MigrateError> {
        let entry = rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| MigrateError::Deserialization(e.to_string()))?;
        if entry.hash.algorithm().is_none() {
            return Err(MigrateError::LogCorrupted {
                message: format!(
                    "revision {} uses unknown hash algorithm id {}",
                    entry.revision, entry.hash.algorithm_id
                ),
            });
        }
        Ok(entry)
    }
}

/// Current time in microseconds since the Unix epoch.
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{fingerprint, HashAlgorithm};

    #[test]
    fn test_entry_from_change_set() {
        let change = ChangeSetDefinition::new("3.1", ["ALTER TABLE t ADD c text"])
            .with_author("ops")
            .with_tag("seed")
            .with_tag("dev");
        let hash = change.fingerprint(HashAlgorithm::Blake3);

        let entry = ChangeLogEntry::for_change_set(7, 0, &change, hash);

        assert_eq!(entry.revision, 7);
        assert_eq!(entry.bucket, 0);
        assert_eq!(entry.version, "3.1");
        assert_eq!(entry.author.as_deref(), Some("ops"));
        assert_eq!(entry.description, None);
        assert_eq!(entry.tags, vec!["dev".to_string(), "seed".to_string()]);
        assert_eq!(entry.tag_set(), change.tags);
        assert!(entry.applied_at > 0);
    }

    #[test]
    fn test_entry_serialization() {
        let change = ChangeSetDefinition::new("1", ["CREATE TABLE t (id int PRIMARY KEY)"])
            .with_description("first");
        let entry = ChangeLogEntry::for_change_set(0, 0, &change, fingerprint(&change.statements));

        let bytes = entry.to_bytes().unwrap();
        let restored = ChangeLogEntry::from_bytes(&bytes).unwrap();

        assert_eq!(restored, entry);
        assert!(restored.hash.matches(&change.statements));
    }

    #[test]
    fn test_unknown_hash_algorithm_rejected() {
        let change = ChangeSetDefinition::new("1", ["x"]);
        let mut hash = fingerprint(&change.statements);
        hash.algorithm_id = 42;
        let entry = ChangeLogEntry::for_change_set(4, 0, &change, hash);

        let err = ChangeLogEntry::from_bytes(&entry.to_bytes().unwrap()).unwrap_err();

        match err {
            MigrateError::LogCorrupted { message } => assert!(message.contains("42")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_corrupt_bytes_rejected() {
        assert!(matches!(
            ChangeLogEntry::from_bytes(&[1, 2, 3]),
            Err(MigrateError::Deserialization(_))
        ));
    }
}
