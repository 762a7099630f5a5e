//! Tracked file records.

use serde::{Deserialize, Serialize};
use stencil_types::{NormalizedHash, ReleaseVersion};
use tracing::trace;

/// Hash of a tracked file as upstream shipped it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginalHash {
    Known(NormalizedHash),
    /// The release the file came from could not be determined.
    Unknown,
}

impl OriginalHash {
    pub fn known(&self) -> Option<&NormalizedHash> {
        match self {
            Self::Known(h) => Some(h),
            Self::Unknown => None,
        }
    }
}

impl From<NormalizedHash> for OriginalHash {
    fn from(hash: NormalizedHash) -> Self {
        Self::Known(hash)
    }
}

/// Whether a file with `current` content counts as customized.
///
/// Without a known original every file is customized: guessing otherwise
/// could overwrite an edit.
pub fn classify(path: &str, original: &OriginalHash, current: &NormalizedHash) -> bool {
    let customized = match original {
        OriginalHash::Known(original) => !stencil_hash::equal(original, current),
        OriginalHash::Unknown => true,
    };
    trace!(path, customized, "classified");
    customized
}

/// A file whose lifecycle is governed by upstream.
///
/// Customization is not stored; derive it from the current content with
/// [`TrackedFile::is_customized`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    /// Path relative to the project root, `/`-separated.
    pub path: String,
    pub original_hash: OriginalHash,
    /// Release whose copy of the file hashes to `original_hash`. Moves
    /// only when the original hash does; a file skipped in a cycle keeps
    /// the release it was last based on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_version: Option<ReleaseVersion>,
    pub is_official: bool,
}

impl TrackedFile {
    /// An official file installed with a known hash.
    pub fn new(path: impl Into<String>, original: NormalizedHash) -> Self {
        Self {
            path: path.into(),
            original_hash: OriginalHash::Known(original),
            base_version: None,
            is_official: true,
        }
    }

    /// Record the release the original hash belongs to.
    pub fn with_base(mut self, version: ReleaseVersion) -> Self {
        self.base_version = Some(version);
        self
    }

    /// An official file whose original content is unknown.
    pub fn unknown(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            original_hash: OriginalHash::Unknown,
            base_version: None,
            is_official: true,
        }
    }

    /// Customized relative to the original. A file that no longer exists
    /// is not customized; it is simply gone.
    pub fn is_customized(&self, current: Option<&NormalizedHash>) -> bool {
        current.is_some_and(|h| classify(&self.path, &self.original_hash, h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stencil_hash::ContentHasher;

    #[test]
    fn unchanged_file_is_not_customized() {
        let h = ContentHasher::SHA256.hash_text("body\n");
        let file = TrackedFile::new("a.md", h.clone());
        assert!(!file.is_customized(Some(&h)));
    }

    #[test]
    fn line_ending_changes_are_not_customization() {
        let hasher = ContentHasher::SHA256;
        let file = TrackedFile::new("a.md", hasher.hash_text("one\ntwo\n"));
        assert!(!file.is_customized(Some(&hasher.hash_text("one\r\ntwo  \r\n"))));
        assert!(file.is_customized(Some(&hasher.hash_text("one\n  two\n"))));
    }

    #[test]
    fn unknown_original_is_always_customized() {
        let file = TrackedFile::unknown("a.md");
        let h = ContentHasher::SHA256.hash_text("anything");
        assert!(file.is_customized(Some(&h)));
        assert!(classify("a.md", &OriginalHash::Unknown, &h));
    }

    #[test]
    fn missing_file_is_not_customized() {
        let file = TrackedFile::unknown("a.md");
        assert!(!file.is_customized(None));
    }

    #[test]
    fn serialized_shape() {
        let h = ContentHasher::SHA256.hash_text("test");
        let json = serde_json::to_value(TrackedFile::new("a.md", h.clone())).unwrap();
        assert_eq!(json["original_hash"]["known"], h.to_string());
        let json = serde_json::to_value(TrackedFile::unknown("b.md")).unwrap();
        assert_eq!(json["original_hash"], "unknown");
        assert!(json.get("base_version").is_none());
    }

    #[test]
    fn base_release_is_recorded_and_optional_on_load() {
        let h = ContentHasher::SHA256.hash_text("test");
        let v1 = ReleaseVersion::new("v1.0.0").unwrap();
        let file = TrackedFile::new("a.md", h).with_base(v1.clone());
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["base_version"], "v1.0.0");
        let back: TrackedFile = serde_json::from_value(json).unwrap();
        assert_eq!(back.base_version, Some(v1));

        let legacy = r#"{"path":"b.md","original_hash":"unknown","is_official":true}"#;
        let old: TrackedFile = serde_json::from_str(legacy).unwrap();
        assert_eq!(old.base_version, None);
    }
}
