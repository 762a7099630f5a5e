//! Choosing and producing a conflict artifact for one file.
//!
//! [`ConflictResolver::resolve_file`] is a chain of fallible tiers:
//!
//! 1. structural merge (markdown only), which fails with a [`ParseError`];
//! 2. the line-section diff report (large files only), which fails with a
//!    [`DiffError`];
//! 3. inline markers over the whole file, which cannot fail.
//!
//! Every tier that was skipped because it failed is recorded as a
//! [`Fallback`] so callers can tell the user why they got what they got.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use stencil_merge::{render_conflict_block, MergeConfig, MergeOutput, ParseError, StructuralMerger};
use tracing::{debug, warn};

use crate::config::ReportConfig;
use crate::error::{DiffError, DiffResult};
use crate::report::ConflictReport;
use crate::sections::line_sections;

/// Why a preferred tier was skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fallback {
    #[error("structural merge failed: {0}")]
    Parse(ParseError),
    #[error("diff report failed: {0}")]
    Diff(DiffError),
}

/// What the resolver produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolutionArtifact {
    /// Structural merge result; its text replaces the file. May still
    /// contain conflict blocks.
    Merged(MergeOutput),
    /// The whole file wrapped in one conflict block; replaces the file.
    InlineMarkers { text: String },
    /// A side report; the file itself is left as it is.
    DiffReport {
        report_path: PathBuf,
        report: ConflictReport,
    },
}

impl ResolutionArtifact {
    /// Text to write over the conflicted file, if this artifact replaces it.
    pub fn replacement_text(&self) -> Option<&str> {
        match self {
            Self::Merged(output) => Some(&output.merged_text),
            Self::InlineMarkers { text } => Some(text),
            Self::DiffReport { .. } => None,
        }
    }

    /// Returns `true` if the user has to look at the result.
    pub fn needs_attention(&self) -> bool {
        match self {
            Self::Merged(output) => !output.is_clean(),
            Self::InlineMarkers { .. } | Self::DiffReport { .. } => true,
        }
    }
}

/// An artifact plus the tiers that failed on the way to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub artifact: ResolutionArtifact,
    pub fallbacks: Vec<Fallback>,
}

/// Markdown files are merged structurally; everything else is not.
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "md" | "markdown" | "mdx"))
}

fn strip_final_newline(text: &str) -> &str {
    text.strip_suffix('\n').unwrap_or(text)
}

/// Picks inline markers or a diff report by file size.
#[derive(Clone, Debug, Default)]
pub struct ConflictReporter {
    config: ReportConfig,
}

impl ConflictReporter {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Where the diff report for `path` is written.
    pub fn report_path(&self, path: &Path) -> PathBuf {
        let mut name = OsString::from(path.as_os_str());
        name.push(&self.config.report_suffix);
        PathBuf::from(name)
    }

    /// Inline markers when `current` has at most `inline_line_limit` lines,
    /// a diff report otherwise. A failed diff degrades to inline markers.
    pub fn resolve(
        &self,
        path: &Path,
        current: &str,
        base: Option<&str>,
        incoming: &str,
        base_label: &str,
        incoming_label: &str,
    ) -> Resolution {
        let lines = current.lines().count();
        let mut fallbacks = Vec::new();

        if lines > self.config.inline_line_limit {
            match self.diff_report(path, current, base.is_some(), incoming, base_label, incoming_label) {
                Ok(report) => {
                    debug!(path = %path.display(), lines, sections = report.section_count(), "writing diff report");
                    return Resolution {
                        artifact: ResolutionArtifact::DiffReport {
                            report_path: self.report_path(path),
                            report,
                        },
                        fallbacks,
                    };
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "diff report failed, using inline markers");
                    fallbacks.push(Fallback::Diff(e));
                }
            }
        }

        debug!(path = %path.display(), lines, "writing inline markers");
        Resolution {
            artifact: ResolutionArtifact::InlineMarkers {
                text: inline_markers(current, base, incoming, base_label, incoming_label),
            },
            fallbacks,
        }
    }

    /// Compute the line-section report for a large file.
    pub fn diff_report(
        &self,
        path: &Path,
        current: &str,
        base_known: bool,
        incoming: &str,
        base_label: &str,
        incoming_label: &str,
    ) -> DiffResult<ConflictReport> {
        let diff = line_sections(current, incoming, &self.config)?;
        Ok(ConflictReport {
            path: path.display().to_string(),
            base_label: base_label.to_string(),
            incoming_label: incoming_label.to_string(),
            base_known,
            diff,
        })
    }
}

/// Wrap whole files in one conflict block.
///
/// The result ends with a newline when `current` did.
pub fn inline_markers(
    current: &str,
    base: Option<&str>,
    incoming: &str,
    base_label: &str,
    incoming_label: &str,
) -> String {
    let mut text = render_conflict_block(
        strip_final_newline(current),
        base.map(strip_final_newline),
        strip_final_newline(incoming),
        base_label,
        incoming_label,
    );
    if current.ends_with('\n') {
        text.push('\n');
    }
    text
}

/// Structural merge first, size-adaptive reporting after.
#[derive(Clone, Debug, Default)]
pub struct ConflictResolver {
    merger: StructuralMerger,
    reporter: ConflictReporter,
}

impl ConflictResolver {
    pub fn new(merge: MergeConfig, report: ReportConfig) -> Self {
        Self {
            merger: StructuralMerger::new(merge),
            reporter: ConflictReporter::new(report),
        }
    }

    pub fn reporter(&self) -> &ConflictReporter {
        &self.reporter
    }

    /// Resolve one file changed on both sides. Never fails.
    pub fn resolve_file(
        &self,
        path: &Path,
        current: &str,
        base: Option<&str>,
        incoming: &str,
        base_label: &str,
        incoming_label: &str,
    ) -> Resolution {
        if !is_markdown(path) {
            return self
                .reporter
                .resolve(path, current, base, incoming, base_label, incoming_label);
        }
        match self
            .merger
            .merge(base, current, incoming, base_label, incoming_label)
        {
            Ok(output) => {
                debug!(path = %path.display(), conflicts = output.conflict_count, "structural merge");
                Resolution {
                    artifact: ResolutionArtifact::Merged(output),
                    fallbacks: Vec::new(),
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "structural merge failed, falling back");
                let mut resolution =
                    self.reporter
                        .resolve(path, current, base, incoming, base_label, incoming_label);
                resolution.fallbacks.insert(0, Fallback::Parse(e));
                resolution
            }
        }
    }
}
