//! The persistent manifest of tracked and custom files.
//!
//! Read once per cycle, mutated in memory, and written back with a single
//! atomic replace (temporary file in the same directory, then rename), so a
//! crash never leaves a half-written manifest behind. Concurrent writers
//! must be serialized by the caller.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stencil_fingerprint::VersionMatch;
use stencil_types::{NormalizedHash, ReleaseVersion, UpstreamVersion};
use tracing::{debug, info};

use crate::entry::{OriginalHash, TrackedFile};
use crate::error::{IndexError, IndexResult};

/// Current manifest schema version.
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// Kind of cycle recorded in the history.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleKind {
    Bootstrap,
    Update,
}

/// Per-cycle counts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub merged: usize,
    pub conflicts: usize,
    /// Customized files upstream no longer ships, now kept as custom.
    pub orphaned: usize,
}

/// One completed cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub version: UpstreamVersion,
    pub timestamp: DateTime<Utc>,
    pub kind: CycleKind,
    pub summary: CycleSummary,
}

/// The effects of an applied update cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppliedCycle {
    /// Files now tracked with a new original hash: added, updated, merged
    /// or adopted from custom files.
    pub refreshed: BTreeMap<String, NormalizedHash>,
    /// Files no longer tracked.
    pub removed: BTreeSet<String>,
    /// Tracked files to keep as custom files.
    pub orphaned: BTreeSet<String>,
    pub summary: CycleSummary,
}

/// The manifest of a project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: u32,
    pub upstream_version: UpstreamVersion,
    tracked_files: BTreeMap<String, TrackedFile>,
    custom_files: BTreeSet<String>,
    history: Vec<HistoryEntry>,
}

#[derive(Deserialize)]
struct SchemaHeader {
    schema_version: u32,
}

impl Manifest {
    /// An empty manifest for `version`.
    pub fn new(version: UpstreamVersion) -> Self {
        Self {
            schema_version: MANIFEST_SCHEMA_VERSION,
            upstream_version: version,
            tracked_files: BTreeMap::new(),
            custom_files: BTreeSet::new(),
            history: Vec::new(),
        }
    }

    /// Build the first manifest of a project.
    ///
    /// `official` lists the paths upstream ships; those present in `local`
    /// become tracked. Their original hash comes from `release_hashes` when
    /// the release was detected and is `Unknown` otherwise, which makes
    /// every such file customized. Other local files become custom files.
    pub fn bootstrap(
        detected: &VersionMatch,
        release_hashes: &BTreeMap<String, NormalizedHash>,
        official: &BTreeSet<String>,
        local: &BTreeMap<String, NormalizedHash>,
    ) -> Self {
        let mut manifest = Self::new(detected.version.clone());
        for path in local.keys() {
            if !official.contains(path) {
                manifest.custom_files.insert(path.clone());
                continue;
            }
            let original = match (detected.is_detected(), release_hashes.get(path)) {
                (true, Some(hash)) => OriginalHash::Known(hash.clone()),
                _ => OriginalHash::Unknown,
            };
            let base_version = match original {
                OriginalHash::Known(_) => detected.version.known().cloned(),
                OriginalHash::Unknown => None,
            };
            manifest.tracked_files.insert(
                path.clone(),
                TrackedFile {
                    path: path.clone(),
                    original_hash: original,
                    base_version,
                    is_official: true,
                },
            );
        }
        manifest.history.push(HistoryEntry {
            version: detected.version.clone(),
            timestamp: Utc::now(),
            kind: CycleKind::Bootstrap,
            summary: CycleSummary {
                added: manifest.tracked_files.len(),
                ..CycleSummary::default()
            },
        });
        info!(
            version = %detected.version,
            tracked = manifest.tracked_files.len(),
            custom = manifest.custom_files.len(),
            "bootstrapped manifest"
        );
        manifest
    }

    /// Load a manifest, rejecting unknown schema versions.
    pub fn load(path: &Path) -> IndexResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| IndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Load a manifest if the file exists.
    pub fn load_if_exists(path: &Path) -> IndexResult<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_json(&raw).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(IndexError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Parse a manifest from JSON.
    pub fn from_json(raw: &str) -> IndexResult<Self> {
        let header: SchemaHeader =
            serde_json::from_str(raw).map_err(|e| IndexError::Serialization(e.to_string()))?;
        if header.schema_version != MANIFEST_SCHEMA_VERSION {
            return Err(IndexError::UnsupportedSchema {
                found: header.schema_version,
                expected: MANIFEST_SCHEMA_VERSION,
            });
        }
        let manifest: Self =
            serde_json::from_str(raw).map_err(|e| IndexError::Serialization(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> IndexResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| IndexError::Serialization(e.to_string()))
    }

    /// Write the manifest, replacing any previous file atomically.
    pub fn save(&self, path: &Path) -> IndexResult<()> {
        self.validate()?;
        let json = self.to_json()?;
        let io_err = |source: std::io::Error| IndexError::Io {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(io_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.write_all(b"\n").map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;

        debug!(path = %path.display(), tracked = self.tracked_files.len(), "manifest saved");
        Ok(())
    }

    /// Check that no path is both tracked and custom, and that keys agree
    /// with the records they index.
    pub fn validate(&self) -> IndexResult<()> {
        if let Some(path) = self
            .custom_files
            .iter()
            .find(|p| self.tracked_files.contains_key(*p))
        {
            return Err(IndexError::Overlap(path.clone()));
        }
        if let Some((key, _)) = self.tracked_files.iter().find(|(k, f)| **k != f.path) {
            return Err(IndexError::Serialization(format!(
                "tracked entry {key} records a different path"
            )));
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    pub fn tracked_files(&self) -> &BTreeMap<String, TrackedFile> {
        &self.tracked_files
    }

    pub fn custom_files(&self) -> &BTreeSet<String> {
        &self.custom_files
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn tracked(&self, path: &str) -> Option<&TrackedFile> {
        self.tracked_files.get(path)
    }

    pub fn is_custom(&self, path: &str) -> bool {
        self.custom_files.contains(path)
    }

    /// Whether the tracked file at `path` is customized, given its current
    /// hash.
    pub fn is_customized(&self, path: &str, current: Option<&NormalizedHash>) -> IndexResult<bool> {
        self.tracked_files
            .get(path)
            .map(|f| f.is_customized(current))
            .ok_or_else(|| IndexError::PathNotFound(path.to_string()))
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Start tracking a file. Fails if it is a custom file.
    pub fn track(&mut self, file: TrackedFile) -> IndexResult<()> {
        if self.custom_files.contains(&file.path) {
            return Err(IndexError::Overlap(file.path));
        }
        self.tracked_files.insert(file.path.clone(), file);
        Ok(())
    }

    /// Stop tracking a file.
    pub fn untrack(&mut self, path: &str) -> IndexResult<TrackedFile> {
        self.tracked_files
            .remove(path)
            .ok_or_else(|| IndexError::PathNotFound(path.to_string()))
    }

    /// Record a custom file. Fails if it is tracked.
    pub fn add_custom(&mut self, path: impl Into<String>) -> IndexResult<()> {
        let path = path.into();
        if self.tracked_files.contains_key(&path) {
            return Err(IndexError::Overlap(path));
        }
        self.custom_files.insert(path);
        Ok(())
    }

    /// Apply the results of an update cycle to `version`.
    ///
    /// Refreshed paths become tracked with their new original hash based on
    /// `version` (leaving the custom set if they were adopted). Paths not
    /// refreshed keep their previous base release. Removed paths are dropped,
    /// orphaned paths move to the custom set, and a history entry is added.
    pub fn commit_cycle(&mut self, version: ReleaseVersion, applied: &AppliedCycle) -> IndexResult<()> {
        for (path, hash) in &applied.refreshed {
            self.custom_files.remove(path);
            self.tracked_files.insert(
                path.clone(),
                TrackedFile::new(path.clone(), hash.clone()).with_base(version.clone()),
            );
        }
        for path in &applied.removed {
            self.tracked_files.remove(path);
        }
        for path in &applied.orphaned {
            self.tracked_files.remove(path);
            self.custom_files.insert(path.clone());
        }
        self.upstream_version = UpstreamVersion::Known(version);
        self.history.push(HistoryEntry {
            version: self.upstream_version.clone(),
            timestamp: Utc::now(),
            kind: CycleKind::Update,
            summary: applied.summary.clone(),
        });
        self.validate()?;
        info!(
            version = %self.upstream_version,
            tracked = self.tracked_files.len(),
            custom = self.custom_files.len(),
            "cycle committed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stencil_fingerprint::Confidence;
    use stencil_hash::ContentHasher;

    fn h(s: &str) -> NormalizedHash {
        ContentHasher::SHA256.hash_text(s)
    }

    fn v(s: &str) -> ReleaseVersion {
        ReleaseVersion::new(s).unwrap()
    }

    fn detected(version: Option<&str>) -> VersionMatch {
        VersionMatch {
            version: version.map_or(UpstreamVersion::Unknown, |s| UpstreamVersion::Known(v(s))),
            confidence: if version.is_some() { Confidence::High } else { Confidence::Low },
            customized_paths: BTreeSet::new(),
            missing_paths: BTreeSet::new(),
            matched: 0,
            total: 0,
            fast_path: false,
        }
    }

    fn sample() -> Manifest {
        let official: BTreeSet<String> = ["a.md", "b.md"].map(String::from).into();
        let release = BTreeMap::from([("a.md".to_string(), h("a")), ("b.md".to_string(), h("b"))]);
        let local = BTreeMap::from([
            ("a.md".to_string(), h("a")),
            ("b.md".to_string(), h("b edited")),
            ("mine.md".to_string(), h("mine")),
        ]);
        Manifest::bootstrap(&detected(Some("v1.0.0")), &release, &official, &local)
    }

    #[test]
    fn bootstrap_splits_tracked_and_custom() {
        let m = sample();
        assert_eq!(m.tracked_files().len(), 2);
        assert!(m.is_custom("mine.md"));
        assert!(!m.is_customized("a.md", Some(&h("a"))).unwrap());
        assert!(m.is_customized("b.md", Some(&h("b edited"))).unwrap());
        assert_eq!(m.history().len(), 1);
        assert_eq!(m.history()[0].kind, CycleKind::Bootstrap);
        assert_eq!(m.history()[0].summary.added, 2);
    }

    #[test]
    fn undetected_bootstrap_marks_everything_customized() {
        let official: BTreeSet<String> = ["a.md".to_string()].into();
        let local = BTreeMap::from([("a.md".to_string(), h("a"))]);
        let release = BTreeMap::from([("a.md".to_string(), h("a"))]);
        let m = Manifest::bootstrap(&detected(None), &release, &official, &local);
        assert!(m.upstream_version.is_unknown());
        assert_eq!(m.tracked("a.md").unwrap().original_hash, OriginalHash::Unknown);
        assert!(m.is_customized("a.md", Some(&h("a"))).unwrap());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".stencil").join("manifest.json");
        let m = sample();
        m.save(&path).unwrap();
        assert_eq!(Manifest::load(&path).unwrap(), m);

        // Overwrite in place; no temp files are left behind.
        m.save(&path).unwrap();
        let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn load_if_exists_handles_absence() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Manifest::load_if_exists(&dir.path().join("none.json"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn unknown_schema_is_rejected() {
        let mut json: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        json["schema_version"] = 2.into();
        let err = Manifest::from_json(&json.to_string()).unwrap_err();
        assert!(matches!(err, IndexError::UnsupportedSchema { found: 2, expected: 1 }));
    }

    #[test]
    fn overlapping_sets_are_rejected() {
        let mut json: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        json["custom_files"] = serde_json::json!(["a.md"]);
        let err = Manifest::from_json(&json.to_string()).unwrap_err();
        assert!(matches!(err, IndexError::Overlap(p) if p == "a.md"));

        let mut m = sample();
        assert!(matches!(m.add_custom("a.md"), Err(IndexError::Overlap(_))));
        assert!(matches!(m.track(TrackedFile::unknown("mine.md")), Err(IndexError::Overlap(_))));
    }

    #[test]
    fn corrupt_manifest_is_a_serialization_error() {
        assert!(matches!(
            Manifest::from_json("{\"schema_version\": 1, \"tracked_files\": 3}"),
            Err(IndexError::Serialization(_))
        ));
    }

    #[test]
    fn commit_cycle_applies_changes() {
        let mut m = sample();
        m.add_custom("adopt.md").unwrap();
        let applied = AppliedCycle {
            refreshed: BTreeMap::from([
                ("a.md".to_string(), h("a2")),
                ("adopt.md".to_string(), h("adopt")),
            ]),
            removed: BTreeSet::new(),
            orphaned: ["b.md".to_string()].into(),
            summary: CycleSummary {
                updated: 1,
                orphaned: 1,
                ..CycleSummary::default()
            },
        };
        m.commit_cycle(v("v1.1.0"), &applied).unwrap();

        assert_eq!(m.upstream_version, UpstreamVersion::Known(v("v1.1.0")));
        assert_eq!(m.tracked("a.md").unwrap().original_hash, OriginalHash::Known(h("a2")));
        assert!(m.tracked("adopt.md").is_some());
        assert!(!m.is_custom("adopt.md"));
        assert!(m.tracked("b.md").is_none());
        assert!(m.is_custom("b.md"));
        assert_eq!(m.history().last().unwrap().kind, CycleKind::Update);
    }

    #[test]
    fn base_release_moves_only_with_the_original_hash() {
        let mut m = sample();
        assert_eq!(m.tracked("a.md").unwrap().base_version, Some(v("v1.0.0")));

        let applied = AppliedCycle {
            refreshed: BTreeMap::from([("a.md".to_string(), h("a2"))]),
            ..AppliedCycle::default()
        };
        m.commit_cycle(v("v1.1.0"), &applied).unwrap();
        assert_eq!(m.tracked("a.md").unwrap().base_version, Some(v("v1.1.0")));
        // Not refreshed this cycle: still based on the release its hash came from.
        let b = m.tracked("b.md").unwrap();
        assert_eq!(b.base_version, Some(v("v1.0.0")));
        assert_eq!(b.original_hash, OriginalHash::Known(h("b")));
    }

    #[test]
    fn undetected_bootstrap_records_no_base_release() {
        let official: BTreeSet<String> = ["a.md".to_string()].into();
        let local = BTreeMap::from([("a.md".to_string(), h("a"))]);
        let m = Manifest::bootstrap(&detected(None), &BTreeMap::new(), &official, &local);
        assert_eq!(m.tracked("a.md").unwrap().base_version, None);
    }

    #[test]
    fn untrack_unknown_path_fails() {
        let mut m = sample();
        assert!(matches!(m.untrack("zzz.md"), Err(IndexError::PathNotFound(_))));
        assert!(m.untrack("a.md").is_ok());
    }
}
