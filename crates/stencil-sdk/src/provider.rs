//! Where release content comes from.
//!
//! Fetching archives, authentication and rate limits all live behind
//! [`UpstreamProvider`]. The updater only needs a listing of each release
//! and the text of individual files.

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use stencil_types::ReleaseVersion;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{ProviderError, ProviderResult};

/// Source of upstream release files.
///
/// Paths are relative and `/`-separated.
pub trait UpstreamProvider: Send + Sync {
    /// Text of `path` in `version`.
    ///
    /// Returns `Ok(None)` if the release does not ship the file.
    /// Returns `Err` if the release itself is unknown or unreadable.
    fn get(&self, version: &ReleaseVersion, path: &str) -> ProviderResult<Option<String>>;

    /// Every file path `version` ships.
    fn list(&self, version: &ReleaseVersion) -> ProviderResult<BTreeSet<String>>;

    /// Known releases, oldest first.
    fn versions(&self) -> ProviderResult<Vec<ReleaseVersion>>;

    /// The most recent known release.
    fn latest(&self) -> ProviderResult<Option<ReleaseVersion>> {
        Ok(self.versions()?.pop())
    }
}

/// Reject absolute paths and paths that climb out of their root.
pub(crate) fn check_relative(path: &str) -> ProviderResult<()> {
    let escapes = Path::new(path)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if path.is_empty() || escapes {
        return Err(ProviderError::InvalidPath(path.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// DirectoryProvider
// ---------------------------------------------------------------------------

/// Extracted releases on disk, one directory per release:
/// `<root>/<version>/<path>`.
#[derive(Clone, Debug)]
pub struct DirectoryProvider {
    root: PathBuf,
}

impl DirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn release_dir(&self, version: &ReleaseVersion) -> ProviderResult<PathBuf> {
        let dir = self.root.join(version.as_str());
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(ProviderError::VersionNotFound(version.to_string()))
        }
    }
}

impl UpstreamProvider for DirectoryProvider {
    fn get(&self, version: &ReleaseVersion, path: &str) -> ProviderResult<Option<String>> {
        check_relative(path)?;
        let full = self.release_dir(version)?.join(path);
        match std::fs::read_to_string(&full) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ProviderError::Read { path: full, source }),
        }
    }

    fn list(&self, version: &ReleaseVersion) -> ProviderResult<BTreeSet<String>> {
        let dir = self.release_dir(version)?;
        let mut paths = BTreeSet::new();
        for entry in WalkDir::new(&dir).follow_links(false) {
            let entry = entry.map_err(|e| ProviderError::Listing {
                path: dir.clone(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&dir) else {
                continue;
            };
            let parts: Vec<String> = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            paths.insert(parts.join("/"));
        }
        debug!(version = %version, files = paths.len(), "listed release directory");
        Ok(paths)
    }

    fn versions(&self) -> ProviderResult<Vec<ReleaseVersion>> {
        let entries = std::fs::read_dir(&self.root).map_err(|source| ProviderError::Read {
            path: self.root.clone(),
            source,
        })?;
        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ProviderError::Read {
                path: self.root.clone(),
                source,
            })?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Ok(version) = ReleaseVersion::new(entry.file_name().to_string_lossy()) {
                versions.push(version);
            }
        }
        versions.sort();
        Ok(versions)
    }
}

// ---------------------------------------------------------------------------
// InMemoryProvider
// ---------------------------------------------------------------------------

/// Releases held in memory. Useful for tests and for callers that already
/// fetched an archive.
#[derive(Clone, Debug, Default)]
pub struct InMemoryProvider {
    releases: BTreeMap<ReleaseVersion, BTreeMap<String, String>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty release.
    pub fn add_release(&mut self, version: ReleaseVersion) {
        self.releases.entry(version).or_default();
    }

    /// Add or replace one file of a release.
    pub fn insert(&mut self, version: ReleaseVersion, path: impl Into<String>, text: impl Into<String>) {
        self.releases
            .entry(version)
            .or_default()
            .insert(path.into(), text.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_file(mut self, version: &ReleaseVersion, path: &str, text: &str) -> Self {
        self.insert(version.clone(), path, text);
        self
    }

    fn release(&self, version: &ReleaseVersion) -> ProviderResult<&BTreeMap<String, String>> {
        self.releases
            .get(version)
            .ok_or_else(|| ProviderError::VersionNotFound(version.to_string()))
    }
}

impl UpstreamProvider for InMemoryProvider {
    fn get(&self, version: &ReleaseVersion, path: &str) -> ProviderResult<Option<String>> {
        check_relative(path)?;
        Ok(self.release(version)?.get(path).cloned())
    }

    fn list(&self, version: &ReleaseVersion) -> ProviderResult<BTreeSet<String>> {
        Ok(self.release(version)?.keys().cloned().collect())
    }

    fn versions(&self) -> ProviderResult<Vec<ReleaseVersion>> {
        Ok(self.releases.keys().cloned().collect())
    }
}
