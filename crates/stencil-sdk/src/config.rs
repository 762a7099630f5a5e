use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stencil_diff::ReportConfig;
use stencil_merge::MergeConfig;
use stencil_types::HashAlgorithm;

use crate::error::{SdkError, SdkResult};

/// Configuration for an update cycle.
///
/// Every field has a default, so a TOML file only needs the keys it
/// changes:
///
/// ```toml
/// manifest_path = ".stencil/manifest.json"
/// dry_run = false
/// assume_undetected = false
///
/// [merge]
/// similarity_threshold = 0.85
///
/// [report]
/// inline_line_limit = 150
/// diff_timeout_ms = 2000
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    pub merge: MergeConfig,
    pub report: ReportConfig,
    /// Manifest location, relative to the project root.
    pub manifest_path: PathBuf,
    /// Algorithm for local hashes. Must match the fingerprint database.
    pub algorithm: HashAlgorithm,
    /// Compute and report everything, write nothing.
    pub dry_run: bool,
    /// Bootstrap a project without a manifest as an unknown release when
    /// no fingerprint database is available. Every file then counts as
    /// customized and merges without a base. Off by default: a missing
    /// database is an error.
    pub assume_undetected: bool,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            merge: MergeConfig::default(),
            report: ReportConfig::default(),
            manifest_path: PathBuf::from(".stencil/manifest.json"),
            algorithm: HashAlgorithm::Sha256,
            dry_run: false,
            assume_undetected: false,
        }
    }
}

impl UpdaterConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_toml_file(path: &Path) -> SdkResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| SdkError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reject values the merge and report stages cannot work with.
    pub fn validate(&self) -> SdkResult<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.merge.similarity_threshold) {
            return Err(SdkError::Config(format!(
                "merge.similarity_threshold must be within 0..=1, got {}",
                self.merge.similarity_threshold
            )));
        }
        if !unit.contains(&self.merge.heading_weight) {
            return Err(SdkError::Config(format!(
                "merge.heading_weight must be within 0..=1, got {}",
                self.merge.heading_weight
            )));
        }
        if self.report.diff_timeout_ms == 0 {
            return Err(SdkError::Config("report.diff_timeout_ms must be positive".into()));
        }
        if self.report.report_suffix.is_empty() {
            return Err(SdkError::Config("report.report_suffix must not be empty".into()));
        }
        if self.manifest_path.as_os_str().is_empty() {
            return Err(SdkError::Config("manifest_path must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = UpdaterConfig::default();
        assert_eq!(c.manifest_path, PathBuf::from(".stencil/manifest.json"));
        assert_eq!(c.algorithm, HashAlgorithm::Sha256);
        assert!(!c.dry_run);
        assert!(!c.assume_undetected);
        assert_eq!(c.report.inline_line_limit, 100);
        assert_eq!(c.merge.similarity_threshold, 0.80);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = UpdaterConfig::from_toml_str(
            "dry_run = true\nalgorithm = \"blake3\"\n\n[report]\ninline_line_limit = 150\n",
        )
        .unwrap();
        assert!(c.dry_run);
        assert_eq!(c.algorithm, HashAlgorithm::Blake3);
        assert_eq!(c.report.inline_line_limit, 150);
        assert_eq!(c.report.context_lines, 3);
        assert_eq!(c.merge, MergeConfig::default());
    }

    #[test]
    fn undetected_bootstrap_is_opt_in() {
        let c = UpdaterConfig::from_toml_str("assume_undetected = true\n").unwrap();
        assert!(c.assume_undetected);
        assert!(!c.dry_run);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let err = UpdaterConfig::from_toml_str("[merge]\nsimilarity_threshold = 1.5\n").unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
    }

    #[test]
    fn zero_diff_timeout_is_rejected() {
        let err = UpdaterConfig::from_toml_str("[report]\ndiff_timeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
        let c = UpdaterConfig::from_toml_str("[report]\ndiff_timeout_ms = 500\n").unwrap();
        assert_eq!(c.report.diff_timeout_ms, 500);
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(matches!(
            UpdaterConfig::from_toml_str("dry_run = "),
            Err(SdkError::Config(_))
        ));
    }

    #[test]
    fn reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stencil.toml");
        std::fs::write(&path, "manifest_path = \"state/manifest.json\"\n").unwrap();
        let c = UpdaterConfig::from_toml_file(&path).unwrap();
        assert_eq!(c.manifest_path, PathBuf::from("state/manifest.json"));

        let missing = UpdaterConfig::from_toml_file(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(SdkError::Io { .. })));
    }
}
