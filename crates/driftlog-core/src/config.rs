//! Run and storage configuration.

use crate::bucket::DEFAULT_BUCKET_SIZE;
use crate::error::MigrateError;
use crate::hash::HashAlgorithm;
use std::path::PathBuf;

/// Configuration for a migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Revisions per log bucket. Fixed for the lifetime of a log.
    pub bucket_size: u64,
    /// Algorithm used to fingerprint newly applied change-sets.
    pub hash_algorithm: HashAlgorithm,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            bucket_size: DEFAULT_BUCKET_SIZE,
            hash_algorithm: HashAlgorithm::default(),
        }
    }
}

impl MigrationConfig {
    /// Set the bucket size.
    pub fn with_bucket_size(mut self, bucket_size: u64) -> Self {
        self.bucket_size = bucket_size;
        self
    }

    /// Set the fingerprint algorithm for new entries.
    pub fn with_hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = algorithm;
        self
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), MigrateError> {
        if self.bucket_size == 0 {
            return Err(MigrateError::InvalidConfig(
                "bucket size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the sled database holding the change log.
#[derive(Debug, Clone)]
pub struct ChangeLogConfig {
    /// Path to the database directory.
    pub path: PathBuf,

    /// Page cache capacity in bytes.
    pub cache_capacity: u64,

    /// Temporary database (deleted on drop).
    pub temporary: bool,

    /// Flush each appended entry before returning.
    pub flush_on_append: bool,
}

impl Default for ChangeLogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./driftlog_data"),
            cache_capacity: 64 * 1024 * 1024, // 64MB
            temporary: false,
            flush_on_append: true,
        }
    }
}

impl ChangeLogConfig {
    /// Create a config for the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create a config for a temporary database.
    pub fn temporary() -> Self {
        Self {
            temporary: true,
            ..Default::default()
        }
    }

    /// Set the cache capacity.
    pub fn cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    /// Set whether appends are flushed immediately.
    pub fn flush_on_append(mut self, flush: bool) -> Self {
        self.flush_on_append = flush;
        self
    }

    /// Convert to sled configuration.
    pub fn to_sled_config(&self) -> sled::Config {
        let config = sled::Config::new()
            .cache_capacity(self.cache_capacity)
            .temporary(self.temporary);
        if self.temporary {
            config
        } else {
            config.path(&self.path)
        }
    }

    /// Open the sled database.
    pub fn open_db(&self) -> Result<sled::Db, MigrateError> {
        Ok(self.to_sled_config().open()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_config_defaults() {
        let config = MigrationConfig::default();
        assert_eq!(config.bucket_size, 100);
        assert_eq!(config.hash_algorithm, HashAlgorithm::Blake3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_migration_config_validation() {
        let config = MigrationConfig::default().with_bucket_size(0);
        assert!(matches!(
            config.validate(),
            Err(MigrateError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_change_log_config_open() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = ChangeLogConfig::new(temp_dir.path().join("log")).cache_capacity(1024 * 1024);
        let db = config.open_db().unwrap();
        assert!(!db.tree_names().is_empty());

        let db = ChangeLogConfig::temporary().open_db().unwrap();
        assert!(db.is_empty());
    }
}
