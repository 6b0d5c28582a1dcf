//! In-memory change log.

use super::{ChangeLogEntry, ChangeLogStore, LogKey};
use crate::error::MigrateError;
use parking_lot::Mutex;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Change log kept in memory, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryChangeLog {
    entries: Mutex<BTreeMap<LogKey, ChangeLogEntry>>,
}

impl MemoryChangeLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log pre-populated with `entries`.
    ///
    /// Entries go through [`ChangeLogStore::append`], so a repeated
    /// `(bucket, revision)` fails with `StoreRace`.
    pub fn with_entries(
        entries: impl IntoIterator<Item = ChangeLogEntry>,
    ) -> Result<Self, MigrateError> {
        let log = Self::new();
        for entry in entries {
            log.append(&entry)?;
        }
        Ok(log)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl ChangeLogStore for MemoryChangeLog {
    fn load_all(&self) -> Result<Vec<ChangeLogEntry>, MigrateError> {
        let mut entries: Vec<ChangeLogEntry> = self.entries.lock().values().cloned().collect();
        entries.sort_by_key(|entry| entry.revision);
        Ok(entries)
    }

    fn append(&self, entry: &ChangeLogEntry) -> Result<(), MigrateError> {
        match self
            .entries
            .lock()
            .entry(LogKey::new(entry.bucket, entry.revision))
        {
            Entry::Occupied(_) => Err(MigrateError::StoreRace {
                bucket: entry.bucket,
                revision: entry.revision,
            }),
            Entry::Vacant(slot) => {
                slot.insert(entry.clone());
                Ok(())
            }
        }
    }
}
