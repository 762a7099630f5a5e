use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::Path;

use sha2::{Digest, Sha256};
use stencil_types::{HashAlgorithm, NormalizedHash};
use tracing::debug;

use crate::error::{HashError, HashResult};
use crate::normalize::normalize_bytes;

/// Normalizing content hasher.
///
/// Every entry point except [`ContentHasher::hash_canonical`] canonicalizes
/// its input first, so two files that differ only in line endings, a BOM or
/// trailing whitespace produce the same [`NormalizedHash`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::SHA256
    }
}

impl ContentHasher {
    /// SHA-256 hasher, the algorithm fingerprint databases are published with.
    pub const SHA256: Self = Self {
        algorithm: HashAlgorithm::Sha256,
    };
    /// BLAKE3 hasher.
    pub const BLAKE3: Self = Self {
        algorithm: HashAlgorithm::Blake3,
    };

    /// Create a hasher for the given algorithm.
    pub const fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The algorithm this hasher tags its output with.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash bytes that are already canonical. No normalization is applied.
    pub fn hash_canonical(&self, canonical: &[u8]) -> NormalizedHash {
        match self.algorithm {
            HashAlgorithm::Sha256 => {
                NormalizedHash::from_digest(self.algorithm, &Sha256::digest(canonical))
            }
            HashAlgorithm::Blake3 => {
                NormalizedHash::from_digest(self.algorithm, blake3::hash(canonical).as_bytes())
            }
        }
    }

    /// Normalize raw bytes and hash the canonical form.
    pub fn hash_bytes(&self, raw: &[u8]) -> NormalizedHash {
        self.hash_canonical(&normalize_bytes(raw))
    }

    /// Normalize text and hash the canonical form.
    pub fn hash_text(&self, text: &str) -> NormalizedHash {
        self.hash_bytes(text.as_bytes())
    }

    /// Read a file and hash its canonical form.
    ///
    /// Any read failure is returned with the path attached; it is never
    /// treated as "unchanged".
    pub fn hash_file(&self, path: &Path) -> HashResult<NormalizedHash> {
        let raw = std::fs::read(path).map_err(|source| HashError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let hash = self.hash_bytes(&raw);
        debug!(path = %path.display(), hash = hash.short(), "hashed file");
        Ok(hash)
    }

    /// Hash a set of `/`-separated relative paths under `root`.
    ///
    /// Paths that do not exist are collected in [`TreeHashes::missing`];
    /// every other read failure aborts with the offending path.
    pub fn hash_tree<'a, I>(&self, root: &Path, paths: I) -> HashResult<TreeHashes>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut tree = TreeHashes::default();
        for rel in paths {
            let full = root.join(rel);
            match std::fs::read(&full) {
                Ok(raw) => {
                    tree.hashes.insert(rel.to_string(), self.hash_bytes(&raw));
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tree.missing.insert(rel.to_string());
                }
                Err(source) => return Err(HashError::Read { path: full, source }),
            }
        }
        debug!(
            root = %root.display(),
            hashed = tree.hashes.len(),
            missing = tree.missing.len(),
            "hashed tree"
        );
        Ok(tree)
    }
}

/// Hashes of the files found under a root, plus the paths that were absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeHashes {
    /// Relative path to hash, for every file that exists.
    pub hashes: BTreeMap<String, NormalizedHash>,
    /// Relative paths that were requested but do not exist.
    pub missing: BTreeSet<String>,
}

/// Case-insensitive equality of two normalized hashes.
pub fn equal(a: &NormalizedHash, b: &NormalizedHash) -> bool {
    a.matches(b)
}
