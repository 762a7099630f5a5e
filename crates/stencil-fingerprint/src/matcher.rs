//! Release detection from local file hashes.
//!
//! [`detect_version`] is a pure function over two hash maps; it performs no
//! I/O and never fails. An inconclusive result is a defined outcome
//! ([`VersionMatch::is_detected`] returns `false`), not an error.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use stencil_types::{NormalizedHash, ReleaseVersion, UpstreamVersion};
use tracing::debug;

use crate::database::FingerprintDatabase;

/// How strongly the local files agree with the chosen release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Confidence {
    /// Less than 70% of compared paths match.
    Low,
    /// 70% to 94% of compared paths match.
    Medium,
    /// 95% or more of compared paths match.
    High,
}

impl Confidence {
    /// Confidence tier for `matched` out of `total` compared paths.
    pub fn from_counts(matched: usize, total: usize) -> Self {
        if total == 0 {
            return Self::Low;
        }
        // Integer percent comparisons keep the 95/70 boundaries exact.
        let scaled = matched * 100;
        if scaled >= total * 95 {
            Self::High
        } else if scaled >= total * 70 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Outcome of release detection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMatch {
    /// The inferred release, or `Unknown` when nothing matched.
    pub version: UpstreamVersion,
    /// Confidence tier of the match.
    pub confidence: Confidence,
    /// Tracked paths present locally whose hash differs from the release.
    pub customized_paths: BTreeSet<String>,
    /// Paths recorded for the release that do not exist locally.
    pub missing_paths: BTreeSet<String>,
    /// Number of compared paths that matched.
    pub matched: usize,
    /// Number of compared paths.
    pub total: usize,
    /// Whether the signature fast path decided the match.
    pub fast_path: bool,
}

impl VersionMatch {
    fn undetected(current: &BTreeMap<String, NormalizedHash>, db: &FingerprintDatabase) -> Self {
        Self {
            version: UpstreamVersion::Unknown,
            confidence: Confidence::Low,
            customized_paths: db
                .tracked_paths
                .iter()
                .filter(|p| current.contains_key(p.as_str()))
                .cloned()
                .collect(),
            missing_paths: BTreeSet::new(),
            matched: 0,
            total: db.tracked_paths.len(),
            fast_path: false,
        }
    }

    /// Returns `true` if a release was identified.
    pub fn is_detected(&self) -> bool {
        !self.version.is_unknown()
    }

    /// Fraction of compared paths that matched, in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.matched as f64 / self.total as f64
        }
    }

    /// Whether `path` must be treated as customized.
    ///
    /// Everything is customized when no release was detected.
    pub fn is_customized(&self, path: &str) -> bool {
        !self.is_detected() || self.customized_paths.contains(path)
    }
}

/// Infer the installed release from the current hashes of tracked files.
///
/// 1. If every signature path matches exactly one release, that release is
///    returned with [`Confidence::High`] and no customized paths.
/// 2. Otherwise every release is scored by the fraction of its recorded
///    tracked paths that match; the best fraction wins and ties go to the
///    most recent release.
/// 3. If no release matches a single path the result is undetected.
pub fn detect_version(
    current: &BTreeMap<String, NormalizedHash>,
    db: &FingerprintDatabase,
) -> VersionMatch {
    if let Some(version) = signature_match(current, db) {
        debug!(version = %version, "release detected from signature files");
        let total = db.signature_paths.len();
        return VersionMatch {
            version: UpstreamVersion::Known(version.clone()),
            confidence: Confidence::High,
            customized_paths: BTreeSet::new(),
            missing_paths: BTreeSet::new(),
            matched: total,
            total,
            fast_path: true,
        };
    }

    let mut best: Option<(&ReleaseVersion, usize, usize)> = None;
    for (version, recorded) in &db.versions {
        let (matched, total) = score(current, recorded, db);
        if total == 0 {
            continue;
        }
        let better = match best {
            None => true,
            // Cross-multiplied comparison of matched/total fractions.
            // Versions iterate oldest first, so `>=` lets the newer win ties.
            Some((_, best_matched, best_total)) => {
                (matched * best_total).cmp(&(best_matched * total)) != Ordering::Less
            }
        };
        if better {
            best = Some((version, matched, total));
        }
    }

    let Some((version, matched, total)) = best.filter(|(_, matched, _)| *matched > 0) else {
        debug!(compared = current.len(), "no release matched any tracked file");
        return VersionMatch::undetected(current, db);
    };

    let recorded = &db.versions[version];
    let mut customized_paths = BTreeSet::new();
    let mut missing_paths = BTreeSet::new();
    for path in tracked_for(recorded, db) {
        match current.get(path) {
            Some(hash) if hash.matches(&recorded[path]) => {}
            Some(_) => {
                customized_paths.insert(path.to_string());
            }
            None => {
                missing_paths.insert(path.to_string());
            }
        }
    }

    let confidence = Confidence::from_counts(matched, total);
    debug!(
        version = %version,
        matched,
        total,
        ?confidence,
        customized = customized_paths.len(),
        "release detected by full comparison"
    );
    VersionMatch {
        version: UpstreamVersion::Known(version.clone()),
        confidence,
        customized_paths,
        missing_paths,
        matched,
        total,
        fast_path: false,
    }
}

/// The single release whose signature hashes all match, if there is one.
fn signature_match<'a>(
    current: &BTreeMap<String, NormalizedHash>,
    db: &'a FingerprintDatabase,
) -> Option<&'a ReleaseVersion> {
    if db.signature_paths.is_empty() {
        return None;
    }
    let mut candidates = db.versions.iter().filter(|(_, recorded)| {
        db.signature_paths.iter().all(|path| {
            match (current.get(path), recorded.get(path)) {
                (Some(local), Some(release)) => local.matches(release),
                _ => false,
            }
        })
    });
    let first = candidates.next()?;
    // Signature files unchanged between releases cannot tell them apart.
    if candidates.next().is_some() {
        return None;
    }
    Some(first.0)
}

fn tracked_for<'a>(
    recorded: &'a BTreeMap<String, NormalizedHash>,
    db: &'a FingerprintDatabase,
) -> impl Iterator<Item = &'a str> {
    db.tracked_paths
        .iter()
        .map(String::as_str)
        .filter(move |p| recorded.contains_key(*p))
}

fn score(
    current: &BTreeMap<String, NormalizedHash>,
    recorded: &BTreeMap<String, NormalizedHash>,
    db: &FingerprintDatabase,
) -> (usize, usize) {
    let mut matched = 0;
    let mut total = 0;
    for path in tracked_for(recorded, db) {
        total += 1;
        if current
            .get(path)
            .is_some_and(|local| local.matches(&recorded[path]))
        {
            matched += 1;
        }
    }
    (matched, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stencil_hash::ContentHasher;
    use stencil_types::HashAlgorithm;

    const TRACKED: [&str; 12] = [
        "commands/analyze.md",
        "commands/checklist.md",
        "commands/clarify.md",
        "commands/constitution.md",
        "commands/implement.md",
        "commands/plan.md",
        "commands/specify.md",
        "commands/tasks.md",
        "templates/plan-template.md",
        "templates/checklist-template.md",
        "templates/tasks-template.md",
        "scripts/common.sh",
    ];

    fn v(s: &str) -> ReleaseVersion {
        ReleaseVersion::new(s).unwrap()
    }

    fn h(text: &str) -> NormalizedHash {
        ContentHasher::SHA256.hash_text(text)
    }

    fn release_hashes(tag: &str) -> BTreeMap<String, NormalizedHash> {
        TRACKED
            .iter()
            .map(|p| (p.to_string(), h(&format!("{p} @ {tag}"))))
            .collect()
    }

    /// Three releases; v0.0.2 only changes plan.md relative to v0.0.1 and
    /// v0.0.3 changes every file.
    fn database() -> FingerprintDatabase {
        let mut db = FingerprintDatabase::new(
            HashAlgorithm::Sha256,
            vec![
                "commands/plan.md".into(),
                "commands/tasks.md".into(),
                "templates/checklist-template.md".into(),
            ],
            TRACKED.iter().map(|p| p.to_string()).collect(),
        );
        let r1 = release_hashes("1");
        let mut r2 = r1.clone();
        r2.insert("commands/plan.md".into(), h("commands/plan.md @ 2"));
        db.record_release(v("v0.0.1"), &r1);
        db.record_release(v("v0.0.2"), &r2);
        db.record_release(v("v0.0.3"), &release_hashes("3"));
        db
    }

    #[test]
    fn confidence_thresholds() {
        assert_eq!(Confidence::from_counts(12, 12), Confidence::High);
        assert_eq!(Confidence::from_counts(19, 20), Confidence::High);
        assert_eq!(Confidence::from_counts(18, 20), Confidence::Medium);
        assert_eq!(Confidence::from_counts(7, 10), Confidence::Medium);
        assert_eq!(Confidence::from_counts(69, 100), Confidence::Low);
        assert_eq!(Confidence::from_counts(0, 0), Confidence::Low);
    }

    #[test]
    fn exact_install_takes_fast_path() {
        let db = database();
        let found = detect_version(&release_hashes("3"), &db);
        assert!(found.fast_path);
        assert_eq!(found.version, UpstreamVersion::Known(v("v0.0.3")));
        assert_eq!(found.confidence, Confidence::High);
        assert!(found.customized_paths.is_empty());
    }

    #[test]
    fn shared_signatures_fall_back_to_full_comparison() {
        // v0.0.1 and v0.0.2 share tasks.md and checklist-template.md; plan.md
        // is customized, so no single release owns all three signatures.
        let db = database();
        let mut current = release_hashes("1");
        current.insert("commands/plan.md".into(), h("my own plan"));

        let found = detect_version(&current, &db);
        assert!(!found.fast_path);
        // 11/12 on both v0.0.1 and v0.0.2: the newer release wins the tie.
        assert_eq!(found.version, UpstreamVersion::Known(v("v0.0.2")));
        assert_eq!(found.matched, 11);
        assert_eq!(found.total, 12);
        assert_eq!(found.confidence, Confidence::Medium);
        assert_eq!(
            found.customized_paths,
            BTreeSet::from(["commands/plan.md".to_string()])
        );
    }

    #[test]
    fn customized_signature_uses_full_comparison() {
        let db = database();
        let mut current = release_hashes("3");
        current.insert("commands/tasks.md".into(), h("edited tasks"));

        let found = detect_version(&current, &db);
        assert!(!found.fast_path);
        assert_eq!(found.version, UpstreamVersion::Known(v("v0.0.3")));
        assert_eq!(found.matched, 11);
        assert!(found.is_customized("commands/tasks.md"));
        assert!(!found.is_customized("commands/plan.md"));
    }

    #[test]
    fn missing_files_are_reported_separately() {
        let db = database();
        let mut current = release_hashes("3");
        current.remove("scripts/common.sh");
        current.insert("commands/tasks.md".into(), h("edited"));

        let found = detect_version(&current, &db);
        assert!(found.missing_paths.contains("scripts/common.sh"));
        assert!(!found.customized_paths.contains("scripts/common.sh"));
        assert_eq!(found.matched, 10);
    }

    #[test]
    fn heavy_customization_is_low_confidence() {
        let db = database();
        let mut current = release_hashes("3");
        for path in TRACKED.iter().skip(3) {
            current.insert(path.to_string(), h("mine"));
        }
        let found = detect_version(&current, &db);
        assert_eq!(found.version, UpstreamVersion::Known(v("v0.0.3")));
        assert_eq!(found.matched, 3);
        assert_eq!(found.confidence, Confidence::Low);
        assert_eq!(found.customized_paths.len(), 9);
    }

    #[test]
    fn nothing_matching_is_undetected() {
        let db = database();
        let current: BTreeMap<_, _> = TRACKED
            .iter()
            .take(4)
            .map(|p| (p.to_string(), h("unrelated")))
            .collect();

        let found = detect_version(&current, &db);
        assert!(!found.is_detected());
        assert_eq!(found.version, UpstreamVersion::Unknown);
        assert_eq!(found.confidence, Confidence::Low);
        assert_eq!(found.customized_paths.len(), 4);
        assert!(found.is_customized("commands/plan.md"));
        assert!(found.is_customized("anything/else.md"));
    }

    #[test]
    fn empty_project_is_undetected() {
        let found = detect_version(&BTreeMap::new(), &database());
        assert!(!found.is_detected());
        assert!(found.customized_paths.is_empty());
    }
}
