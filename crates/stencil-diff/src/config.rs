use serde::{Deserialize, Serialize};

/// Tuning for conflict reporting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Files with at most this many lines get inline markers.
    pub inline_line_limit: usize,
    /// Context lines added around each changed section.
    pub context_lines: usize,
    /// Larger inputs are not diffed at all.
    pub max_diff_lines: usize,
    /// Wall-clock budget for one diff, in milliseconds. A diff that runs
    /// out of time is abandoned and the caller falls back to inline markers.
    pub diff_timeout_ms: u64,
    /// Appended to the file path to name the report.
    pub report_suffix: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            inline_line_limit: 100,
            context_lines: 3,
            max_diff_lines: 200_000,
            diff_timeout_ms: 2_000,
            report_suffix: ".conflict-report.md".to_string(),
        }
    }
}
