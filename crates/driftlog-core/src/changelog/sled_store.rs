//! sled-backed change log.

use super::{ChangeLogEntry, ChangeLogStore};
use crate::bucket::BucketAllocator;
use crate::error::MigrateError;
use sled::{Db, Tree};
use tracing::{debug, warn};

/// Tree name for log entries.
const ENTRIES_TREE: &str = "changelog:entries";

/// Tree name for log metadata.
const META_TREE: &str = "changelog:meta";

/// Meta key recording the bucket size the log was created with.
const BUCKET_SIZE_KEY: &[u8] = b"bucket_size";

/// Encoded key size.
pub const LOG_KEY_SIZE: usize = 16;

/// Primary key of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogKey {
    /// Partition bucket.
    pub bucket: u64,
    /// Revision within the whole log.
    pub revision: u64,
}

impl LogKey {
    /// Create a new key.
    pub fn new(bucket: u64, revision: u64) -> Self {
        Self { bucket, revision }
    }

    /// Encode the key to bytes.
    pub fn encode(&self) -> [u8; LOG_KEY_SIZE] {
        let mut buf = [0u8; LOG_KEY_SIZE];
        buf[..8].copy_from_slice(&self.bucket.to_be_bytes());
        buf[8..].copy_from_slice(&self.revision.to_be_bytes());
        buf
    }

    /// Decode a key from bytes.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != LOG_KEY_SIZE {
            return None;
        }

        let mut bucket = [0u8; 8];
        bucket.copy_from_slice(&bytes[..8]);
        let mut revision = [0u8; 8];
        revision.copy_from_slice(&bytes[8..]);

        Some(Self {
            bucket: u64::from_be_bytes(bucket),
            revision: u64::from_be_bytes(revision),
        })
    }
}

/// Change log persisted in a sled database.
pub struct SledChangeLog {
    entries: Tree,
    meta: Tree,
    allocator: BucketAllocator,
    flush_on_append: bool,
}

impl SledChangeLog {
    /// Open or create the change log trees in `db`.
    ///
    /// The first open records `bucket_size`; later opens must use the same
    /// value.
    pub fn open(db: &Db, bucket_size: u64) -> Result<Self, MigrateError> {
        let allocator = BucketAllocator::new(bucket_size)?;
        let entries = db.open_tree(ENTRIES_TREE)?;
        let meta = db.open_tree(META_TREE)?;

        let recorded = meta.compare_and_swap(
            BUCKET_SIZE_KEY,
            None::<&[u8]>,
            Some(&bucket_size.to_be_bytes()[..]),
        )?;
        if let Err(existing) = recorded {
            let stored = existing
                .current
                .as_deref()
                .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
                .map(u64::from_be_bytes)
                .ok_or_else(|| MigrateError::LogCorrupted {
                    message: "unreadable bucket size in log metadata".to_string(),
                })?;
            if stored != bucket_size {
                return Err(MigrateError::StoreMismatch {
                    message: format!(
                        "log was created with bucket size {stored}, opened with {bucket_size}"
                    ),
                });
            }
        }

        debug!(bucket_size, entries = entries.len(), "opened change log");
        Ok(Self {
            entries,
            meta,
            allocator,
            flush_on_append: true,
        })
    }

    /// Set whether each append is flushed to disk before returning.
    pub fn flush_on_append(mut self, flush: bool) -> Self {
        self.flush_on_append = flush;
        self
    }

    /// The bucket size this log was opened with.
    pub fn bucket_size(&self) -> u64 {
        self.allocator.bucket_size()
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the log has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flush changes to disk.
    pub fn flush(&self) -> Result<(), MigrateError> {
        self.entries.flush()?;
        self.meta.flush()?;
        Ok(())
    }
}

impl ChangeLogStore for SledChangeLog {
    fn load_all(&self) -> Result<Vec<ChangeLogEntry>, MigrateError> {
        let mut entries = Vec::with_capacity(self.entries.len());
        for result in self.entries.iter() {
            let (key, value) = result?;
            let key = LogKey::decode(&key).ok_or_else(|| MigrateError::LogCorrupted {
                message: format!("invalid key of {} bytes", key.len()),
            })?;
            let entry = ChangeLogEntry::from_bytes(&value)?;
            if entry.revision != key.revision || entry.bucket != key.bucket {
                return Err(MigrateError::LogCorrupted {
                    message: format!(
                        "entry for revision {} stored under key ({}, {})",
                        entry.revision, key.bucket, key.revision
                    ),
                });
            }
            entries.push(entry);
        }
        Ok(entries)
    }

    fn append(&self, entry: &ChangeLogEntry) -> Result<(), MigrateError> {
        let expected_bucket = self.allocator.bucket_of(entry.revision);
        if entry.bucket != expected_bucket {
            return Err(MigrateError::StoreMismatch {
                message: format!(
                    "revision {} belongs in bucket {expected_bucket}, not {}",
                    entry.revision, entry.bucket
                ),
            });
        }

        let key = LogKey::new(entry.bucket, entry.revision).encode();
        let value = entry.to_bytes()?;

        // Write-if-absent so a concurrent run cannot silently overwrite us.
        let swapped = self
            .entries
            .compare_and_swap(key, None::<&[u8]>, Some(value))?;
        if swapped.is_err() {
            warn!(
                bucket = entry.bucket,
                revision = entry.revision,
                "revision already recorded by another run"
            );
            return Err(MigrateError::StoreRace {
                bucket: entry.bucket,
                revision: entry.revision,
            });
        }

        if self.flush_on_append {
            self.entries.flush()?;
        }
        Ok(())
    }
}
