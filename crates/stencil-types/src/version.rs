use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identifier of an upstream release, e.g. `v0.0.72`.
///
/// Ordering compares dot/dash separated components, numerically where both
/// components are numbers and lexically otherwise, after dropping a leading
/// `v`. `v0.0.9 < v0.0.10`. Identical component lists fall back to the raw
/// string so that ordering stays consistent with equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReleaseVersion(String);

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Component<'a> {
    Number(u64),
    Text(&'a str),
}

impl ReleaseVersion {
    /// Create a release version, rejecting empty identifiers.
    pub fn new(raw: impl Into<String>) -> Result<Self, TypeError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TypeError::EmptyVersion);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The identifier exactly as published upstream.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn components(&self) -> Vec<Component<'_>> {
        let body = self
            .0
            .strip_prefix('v')
            .or_else(|| self.0.strip_prefix('V'))
            .unwrap_or(&self.0);
        body.split(['.', '-', '+'])
            .filter(|part| !part.is_empty())
            .map(|part| match part.parse::<u64>() {
                Ok(n) => Component::Number(n),
                Err(_) => Component::Text(part),
            })
            .collect()
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components()
            .cmp(&other.components())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ReleaseVersion {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ReleaseVersion {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReleaseVersion> for String {
    fn from(version: ReleaseVersion) -> Self {
        version.0
    }
}

/// The upstream release a project is installed from, if it could be
/// determined.
///
/// `Unknown` is the loss-averse sentinel for installs whose version could
/// not be detected: every tracked file is then treated as customized.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamVersion {
    Known(ReleaseVersion),
    Unknown,
}

impl UpstreamVersion {
    /// The release, when known.
    pub fn known(&self) -> Option<&ReleaseVersion> {
        match self {
            Self::Known(v) => Some(v),
            Self::Unknown => None,
        }
    }

    /// Returns `true` for the undetected-install sentinel.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Human-readable label used in conflict markers and reports.
    pub fn label(&self) -> String {
        match self {
            Self::Known(v) => v.to_string(),
            Self::Unknown => "unknown version".to_string(),
        }
    }
}

impl fmt::Display for UpstreamVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<ReleaseVersion> for UpstreamVersion {
    fn from(version: ReleaseVersion) -> Self {
        Self::Known(version)
    }
}
