//! Revision to partition-bucket mapping.

use crate::error::MigrateError;

/// Default number of revisions per bucket.
pub const DEFAULT_BUCKET_SIZE: u64 = 100;

/// Maps revisions onto log partitions so no partition grows without bound.
///
/// The bucket size must stay fixed for the lifetime of a log; changing it
/// would place new entries in buckets that disagree with existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketAllocator {
    bucket_size: u64,
}

impl BucketAllocator {
    /// Create an allocator with the given bucket size.
    pub fn new(bucket_size: u64) -> Result<Self, MigrateError> {
        if bucket_size == 0 {
            return Err(MigrateError::InvalidConfig(
                "bucket size must be positive".to_string(),
            ));
        }
        Ok(Self { bucket_size })
    }

    /// The configured bucket size.
    pub fn bucket_size(&self) -> u64 {
        self.bucket_size
    }

    /// Bucket holding `revision`.
    pub fn bucket_of(&self, revision: u64) -> u64 {
        revision / self.bucket_size
    }
}

impl Default for BucketAllocator {
    fn default() -> Self {
        Self {
            bucket_size: DEFAULT_BUCKET_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        let allocator = BucketAllocator::default();
        assert_eq!(allocator.bucket_of(0), 0);
        assert_eq!(allocator.bucket_of(99), 0);
        assert_eq!(allocator.bucket_of(100), 1);
        assert_eq!(allocator.bucket_of(250), 2);
    }

    #[test]
    fn test_custom_bucket_size() {
        let allocator = BucketAllocator::new(1).unwrap();
        assert_eq!(allocator.bucket_of(7), 7);

        let allocator = BucketAllocator::new(10).unwrap();
        assert_eq!(allocator.bucket_of(9), 0);
        assert_eq!(allocator.bucket_of(10), 1);
    }

    #[test]
    fn test_zero_bucket_size_rejected() {
        assert!(matches!(
            BucketAllocator::new(0),
            Err(MigrateError::InvalidConfig(_))
        ));
    }
}
