//! Durable record of applied change-sets.
//!
//! Entries are keyed by `(bucket, revision)`. The bucket bounds how many
//! entries share a partition; the revision orders entries within and across
//! buckets. Appends are conditional: writing a key that already exists fails
//! with [`MigrateError::StoreRace`] instead of overwriting it.
//!
//! ## Layout
//!
//! ```text
//! key:   [bucket (8 bytes, BE)][revision (8 bytes, BE)]
//! value: rkyv(ChangeLogEntry)
//! ```
//!
//! Big-endian keys make sled's lexicographic order equal revision order.

mod entry;
mod memory;
mod sled_store;

pub use entry::{current_timestamp, ChangeLogEntry};
pub use memory::MemoryChangeLog;
pub use sled_store::{LogKey, SledChangeLog};

use crate::error::MigrateError;

/// Storage backend for the change log.
pub trait ChangeLogStore: Send + Sync {
    /// Load every entry, sorted by revision ascending.
    fn load_all(&self) -> Result<Vec<ChangeLogEntry>, MigrateError>;

    /// Append an entry if its `(bucket, revision)` key is unused.
    ///
    /// The caller is responsible for choosing the next revision; the store
    /// only guarantees an existing entry is never overwritten.
    fn append(&self, entry: &ChangeLogEntry) -> Result<(), MigrateError>;
}
