//! Content fingerprints for change-set statements.
//!
//! The fingerprint is the only record of what an applied change-set
//! contained, so it is computed over the statements exactly as declared.
//! Each statement is length-prefixed before it is fed to the digest, which
//! keeps statement boundaries significant.

use rkyv::{Archive, Deserialize, Serialize};
use std::fmt;

/// Size of a fingerprint digest in bytes.
pub const DIGEST_SIZE: usize = 32;

/// Digest algorithm used to produce a [`Fingerprint`].
///
/// Only [`HashAlgorithm::id`] is persisted, never the variant itself, so
/// variants may be reordered freely. Ids must never be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    /// BLAKE3, 256-bit output.
    #[default]
    Blake3,
    /// SHA-256.
    Sha256,
}

impl HashAlgorithm {
    /// Stable numeric identifier.
    pub fn id(self) -> u8 {
        match self {
            HashAlgorithm::Blake3 => 1,
            HashAlgorithm::Sha256 => 2,
        }
    }

    /// Look up an algorithm by its numeric identifier.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(HashAlgorithm::Blake3),
            2 => Some(HashAlgorithm::Sha256),
            _ => None,
        }
    }

    /// Short lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Blake3 => "blake3",
            HashAlgorithm::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fingerprint of an ordered list of statements.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
pub struct Fingerprint {
    /// [`HashAlgorithm::id`] of the algorithm that produced the digest.
    pub algorithm_id: u8,
    /// Raw digest bytes.
    pub digest: [u8; DIGEST_SIZE],
}

impl Fingerprint {
    /// Fingerprint statements with the given algorithm.
    pub fn of_with<S: AsRef<str>>(algorithm: HashAlgorithm, statements: &[S]) -> Self {
        let digest = match algorithm {
            HashAlgorithm::Blake3 => {
                let mut hasher = blake3::Hasher::new();
                for statement in statements {
                    let bytes = statement.as_ref().as_bytes();
                    hasher.update(&(bytes.len() as u64).to_le_bytes());
                    hasher.update(bytes);
                }
                *hasher.finalize().as_bytes()
            }
            HashAlgorithm::Sha256 => {
                use sha2::{Digest, Sha256};

                let mut hasher = Sha256::new();
                for statement in statements {
                    let bytes = statement.as_ref().as_bytes();
                    hasher.update((bytes.len() as u64).to_le_bytes());
                    hasher.update(bytes);
                }
                let mut digest = [0u8; DIGEST_SIZE];
                digest.copy_from_slice(&hasher.finalize());
                digest
            }
        };

        Self {
            algorithm_id: algorithm.id(),
            digest,
        }
    }

    /// Algorithm recorded in this fingerprint, if this build knows it.
    pub fn algorithm(&self) -> Option<HashAlgorithm> {
        HashAlgorithm::from_id(self.algorithm_id)
    }

    /// Check whether `statements` hash to this fingerprint.
    ///
    /// Uses the algorithm recorded in `self`, not the current default. An
    /// unknown algorithm never matches.
    pub fn matches<S: AsRef<str>>(&self, statements: &[S]) -> bool {
        self.algorithm()
            .is_some_and(|algorithm| Self::of_with(algorithm, statements) == *self)
    }

    /// Hex encoding of the digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// First 12 hex characters of the digest, for display.
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(12);
        hex
    }
}

impl Fingerprint {
    fn algorithm_name(&self) -> String {
        match self.algorithm() {
            Some(algorithm) => algorithm.name().to_string(),
            None => format!("unknown({})", self.algorithm_id),
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm_name(), self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({}:{})", self.algorithm_name(), self.short())
    }
}

/// Fingerprint statements with the default algorithm.
pub fn fingerprint<S: AsRef<str>>(statements: &[S]) -> Fingerprint {
    Fingerprint::of_with(HashAlgorithm::default(), statements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let statements = ["CREATE TABLE users (id uuid PRIMARY KEY)", "CREATE INDEX ON users (id)"];
        assert_eq!(fingerprint(&statements), fingerprint(&statements));
        assert_eq!(fingerprint(&statements).algorithm(), Some(HashAlgorithm::Blake3));
    }

    #[test]
    fn test_fingerprint_is_stable_across_processes() {
        // Pinned value: any change here breaks verification of existing logs.
        let fp = Fingerprint::of_with(
            HashAlgorithm::Sha256,
            &["CREATE TABLE t (id int PRIMARY KEY)"],
        );
        assert_eq!(
            fp.to_hex(),
            "ae40a1247bddf35aa719b66aa3fc44144651e7411b7e6d1e4e7df14bfb1d00fc"
        );

        let expected = {
            let mut hasher = blake3::Hasher::new();
            hasher.update(&3u64.to_le_bytes());
            hasher.update(b"abc");
            *hasher.finalize().as_bytes()
        };
        assert_eq!(fingerprint(&["abc"]).digest, expected);
    }

    #[test]
    fn test_fingerprint_is_whitespace_sensitive() {
        let a = fingerprint(&["ALTER TABLE t ADD c int"]);
        let b = fingerprint(&["ALTER TABLE t  ADD c int"]);
        let c = fingerprint(&["alter table t add c int"]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_statement_boundaries_matter() {
        assert_ne!(fingerprint(&["ab", "c"]), fingerprint(&["a", "bc"]));
        assert_ne!(fingerprint(&["abc"]), fingerprint(&["abc", ""]));
    }

    #[test]
    fn test_matches_uses_recorded_algorithm() {
        let statements = ["CREATE TABLE t (id int PRIMARY KEY)"];
        let legacy = Fingerprint::of_with(HashAlgorithm::Sha256, &statements);

        assert_ne!(legacy, fingerprint(&statements));
        assert!(legacy.matches(&statements));
        assert!(!legacy.matches(&["CREATE TABLE t (id bigint PRIMARY KEY)"]));
    }

    #[test]
    fn test_algorithm_ids() {
        for algorithm in [HashAlgorithm::Blake3, HashAlgorithm::Sha256] {
            assert_eq!(HashAlgorithm::from_id(algorithm.id()), Some(algorithm));
        }
        assert_eq!(HashAlgorithm::from_id(0), None);
    }

    #[test]
    fn test_archived_bytes_carry_stable_id() {
        for algorithm in [HashAlgorithm::Blake3, HashAlgorithm::Sha256] {
            let fp = Fingerprint::of_with(algorithm, &["x"]);
            let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&fp).unwrap();

            assert_eq!(bytes.len(), 1 + DIGEST_SIZE);
            assert_eq!(bytes[0], algorithm.id());
            assert_eq!(&bytes[1..], &fp.digest[..]);
        }
    }

    #[test]
    fn test_unknown_algorithm_never_matches() {
        let mut fp = fingerprint(&["x"]);
        fp.algorithm_id = 0;

        assert_eq!(fp.algorithm(), None);
        assert!(!fp.matches(&["x"]));
        assert!(fp.to_string().starts_with("unknown(0):"));
    }

    #[test]
    fn test_display() {
        let fp = fingerprint(&["x"]);
        assert!(fp.to_string().starts_with("blake3:"));
        assert_eq!(fp.short().len(), 12);
        assert_eq!(fp.to_hex().len(), DIGEST_SIZE * 2);
    }
}
