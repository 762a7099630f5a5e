//! What an update cycle did, file by file.

use std::path::PathBuf;

use serde::Serialize;
use stencil_fingerprint::VersionMatch;
use stencil_index::CycleSummary;
use stencil_types::{ReleaseVersion, UpstreamVersion};

use crate::error::{SdkError, SdkResult};

/// Whether a file's data survived the cycle untouched, was rewritten, or
/// needs the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Preserved,
    Modified,
    NeedsAttention,
}

/// The decision applied to one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    /// New upstream file written.
    Added,
    /// Tracked file deleted locally, written again.
    Restored,
    /// Uncustomized file replaced with the new release.
    Updated,
    Unchanged,
    /// Uncustomized file upstream no longer ships, deleted.
    Removed,
    /// Customized file upstream no longer ships, kept as a custom file.
    Orphaned,
    /// Both sides changed and the merge was clean.
    Merged,
    /// Merged, with conflict blocks left in the file.
    Conflict,
    /// File left as is; a side report lists the differences.
    Reported,
    /// File still holds unresolved conflict markers; not touched.
    Skipped,
}

impl FileAction {
    pub fn status(&self) -> FileStatus {
        match self {
            Self::Unchanged | Self::Orphaned => FileStatus::Preserved,
            Self::Added | Self::Restored | Self::Updated | Self::Removed | Self::Merged => {
                FileStatus::Modified
            }
            Self::Conflict | Self::Reported | Self::Skipped => FileStatus::NeedsAttention,
        }
    }
}

/// Outcome for one path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: String,
    pub action: FileAction,
    pub status: FileStatus,
    /// Conflict blocks left in the file.
    pub conflicts: usize,
    /// Side report written for the file, relative to the project root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
    /// Fallback tiers taken while resolving, most preferred first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl FileReport {
    pub fn new(path: impl Into<String>, action: FileAction) -> Self {
        Self {
            path: path.into(),
            action,
            status: action.status(),
            conflicts: 0,
            report_path: None,
            notes: Vec::new(),
        }
    }
}

/// Result of [`Updater::update`](crate::Updater::update).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UpdateReport {
    /// Release the project was on before the cycle.
    pub from: UpstreamVersion,
    pub to: ReleaseVersion,
    /// Detection result when this cycle created the manifest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection: Option<VersionMatch>,
    /// `true` if nothing was written.
    pub dry_run: bool,
    pub files: Vec<FileReport>,
    pub summary: CycleSummary,
}

impl UpdateReport {
    /// Number of files with the given status.
    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }

    /// Files the user has to look at.
    pub fn needs_attention(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::NeedsAttention)
    }

    /// Returns `true` if no file needs attention.
    pub fn is_clean(&self) -> bool {
        self.needs_attention().next().is_none()
    }

    /// Look up the outcome for `path`.
    pub fn file(&self, path: &str) -> Option<&FileReport> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn to_json(&self) -> SdkResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SdkError::Serialization(e.to_string()))
    }
}
