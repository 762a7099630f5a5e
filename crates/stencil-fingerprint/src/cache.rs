//! Caller-owned memo of local file hashes.
//!
//! A single update cycle asks for the hash of the same file several times
//! (detection, reconciliation, post-merge verification). The cache is an
//! ordinary value created per run; entries are dropped explicitly whenever
//! the caller rewrites a file.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use stencil_hash::{ContentHasher, HashResult, TreeHashes};
use stencil_types::NormalizedHash;

/// Memoized hashes of files under one project root.
#[derive(Debug)]
pub struct HashCache {
    root: PathBuf,
    hasher: ContentHasher,
    /// `None` records that the file was absent when last checked.
    entries: HashMap<String, Option<NormalizedHash>>,
}

impl HashCache {
    /// Create an empty cache for files under `root`.
    pub fn new(root: impl Into<PathBuf>, hasher: ContentHasher) -> Self {
        Self {
            root: root.into(),
            hasher,
            entries: HashMap::new(),
        }
    }

    /// The project root the cached paths are relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Hash of `rel`, computed on first use. `None` when the file is absent.
    pub fn get(&mut self, rel: &str) -> HashResult<Option<NormalizedHash>> {
        if let Some(cached) = self.entries.get(rel) {
            return Ok(cached.clone());
        }
        let tree = self.hasher.hash_tree(&self.root, [rel])?;
        let hash = tree.hashes.get(rel).cloned();
        self.entries.insert(rel.to_string(), hash.clone());
        Ok(hash)
    }

    /// Hashes for a set of paths, going through the cache.
    pub fn snapshot<'a, I>(&mut self, paths: I) -> HashResult<TreeHashes>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut tree = TreeHashes::default();
        for rel in paths {
            match self.get(rel)? {
                Some(hash) => {
                    tree.hashes.insert(rel.to_string(), hash);
                }
                None => {
                    tree.missing.insert(rel.to_string());
                }
            }
        }
        Ok(tree)
    }

    /// Hashes of every cached file that exists.
    pub fn known(&self) -> BTreeMap<String, NormalizedHash> {
        self.entries
            .iter()
            .filter_map(|(p, h)| h.as_ref().map(|h| (p.clone(), h.clone())))
            .collect()
    }

    /// Forget one path, e.g. after the file was rewritten.
    pub fn invalidate(&mut self, rel: &str) {
        self.entries.remove(rel);
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached paths (present or absent).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_until_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plan.md");
        std::fs::write(&file, "one").unwrap();

        let mut cache = HashCache::new(dir.path(), ContentHasher::SHA256);
        let first = cache.get("plan.md").unwrap().unwrap();

        std::fs::write(&file, "two").unwrap();
        assert_eq!(cache.get("plan.md").unwrap().unwrap(), first);

        cache.invalidate("plan.md");
        let second = cache.get("plan.md").unwrap().unwrap();
        assert_ne!(first, second);
        assert_eq!(second, ContentHasher::SHA256.hash_text("two"));
    }

    #[test]
    fn absent_files_are_cached_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = HashCache::new(dir.path(), ContentHasher::SHA256);
        assert_eq!(cache.get("missing.md").unwrap(), None);
        assert_eq!(cache.len(), 1);
        assert!(cache.known().is_empty());
    }

    #[test]
    fn snapshot_splits_present_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "a").unwrap();
        let mut cache = HashCache::new(dir.path(), ContentHasher::SHA256);

        let tree = cache.snapshot(["a.md", "b.md"]).unwrap();
        assert_eq!(tree.hashes.len(), 1);
        assert!(tree.missing.contains("b.md"));

        cache.clear();
        assert!(cache.is_empty());
    }
}
