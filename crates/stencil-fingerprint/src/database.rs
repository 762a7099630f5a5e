//! The release fingerprint database.
//!
//! A static JSON snapshot, shipped alongside the tool, that records the
//! normalized hash of every tracked path for every published release:
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "algorithm": "sha256",
//!   "signature_paths": ["commands/plan.md", "commands/tasks.md", "templates/checklist-template.md"],
//!   "tracked_paths": ["commands/plan.md", "..."],
//!   "versions": {
//!     "v0.0.70": { "commands/plan.md": "SHA256:...", "...": "..." }
//!   }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use stencil_types::{HashAlgorithm, NormalizedHash, ReleaseVersion};
use tracing::debug;

use crate::error::{FingerprintError, FingerprintResult};

/// Schema version written by and accepted by this build.
pub const DATABASE_SCHEMA_VERSION: u32 = 1;

/// Per-release hashes of every tracked path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintDatabase {
    /// Database format version.
    pub schema_version: u32,
    /// Algorithm every recorded hash was computed with.
    pub algorithm: HashAlgorithm,
    /// Small, high-discriminating subset checked first.
    pub signature_paths: Vec<String>,
    /// Every path that participates in full comparison.
    pub tracked_paths: Vec<String>,
    /// Release -> (path -> hash).
    pub versions: BTreeMap<ReleaseVersion, BTreeMap<String, NormalizedHash>>,
}

impl FingerprintDatabase {
    /// Create an empty database for the given signature and tracked paths.
    pub fn new(
        algorithm: HashAlgorithm,
        signature_paths: Vec<String>,
        tracked_paths: Vec<String>,
    ) -> Self {
        Self {
            schema_version: DATABASE_SCHEMA_VERSION,
            algorithm,
            signature_paths,
            tracked_paths,
            versions: BTreeMap::new(),
        }
    }

    /// Load and validate a database file.
    pub fn load(path: &Path) -> FingerprintResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| FingerprintError::Unavailable {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self::from_json(&raw)?;
        debug!(
            path = %path.display(),
            releases = db.versions.len(),
            tracked = db.tracked_paths.len(),
            "loaded fingerprint database"
        );
        Ok(db)
    }

    /// Parse and validate a database from JSON text.
    pub fn from_json(raw: &str) -> FingerprintResult<Self> {
        // Check the schema before the full shape so that a future format is
        // reported as unsupported rather than corrupt.
        let header: SchemaHeader =
            serde_json::from_str(raw).map_err(|e| FingerprintError::Corrupt(e.to_string()))?;
        if header.schema_version != DATABASE_SCHEMA_VERSION {
            return Err(FingerprintError::UnsupportedSchema {
                found: header.schema_version,
                expected: DATABASE_SCHEMA_VERSION,
            });
        }
        let db: Self =
            serde_json::from_str(raw).map_err(|e| FingerprintError::Corrupt(e.to_string()))?;
        db.validate()?;
        Ok(db)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> FingerprintResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| FingerprintError::Corrupt(e.to_string()))
    }

    /// Check internal consistency.
    pub fn validate(&self) -> FingerprintResult<()> {
        if self.versions.is_empty() {
            return Err(FingerprintError::Empty);
        }
        let tracked: BTreeSet<&str> = self.tracked_paths.iter().map(String::as_str).collect();
        if let Some(stray) = self
            .signature_paths
            .iter()
            .find(|p| !tracked.contains(p.as_str()))
        {
            return Err(FingerprintError::Corrupt(format!(
                "signature path {stray} is not a tracked path"
            )));
        }
        for (version, hashes) in &self.versions {
            if let Some((path, hash)) = hashes
                .iter()
                .find(|(_, h)| h.algorithm() != self.algorithm)
            {
                return Err(FingerprintError::Corrupt(format!(
                    "{version}: {path} is hashed with {} but the database uses {}",
                    hash.algorithm(),
                    self.algorithm
                )));
            }
        }
        Ok(())
    }

    /// Record the hashes of a release, replacing any previous record.
    ///
    /// Only tracked paths are kept.
    pub fn record_release(
        &mut self,
        version: ReleaseVersion,
        hashes: &BTreeMap<String, NormalizedHash>,
    ) {
        let recorded = self
            .tracked_paths
            .iter()
            .filter_map(|p| hashes.get(p).map(|h| (p.clone(), h.clone())))
            .collect();
        self.versions.insert(version, recorded);
    }

    /// Hashes recorded for one release.
    pub fn release(&self, version: &ReleaseVersion) -> Option<&BTreeMap<String, NormalizedHash>> {
        self.versions.get(version)
    }

    /// The most recent release in the database.
    pub fn latest(&self) -> Option<&ReleaseVersion> {
        self.versions.keys().next_back()
    }
}

#[derive(Deserialize)]
struct SchemaHeader {
    schema_version: u32,
}
