//! One update cycle, end to end.
//!
//! 1. Load the manifest, or bootstrap it from release detection.
//! 2. Hash the target release and the local files.
//! 3. Reconcile, then apply each decision: write, delete, keep, or hand
//!    the file to the conflict resolver.
//! 4. Commit the cycle to the manifest and save it in one atomic replace.
//!
//! A dry run goes through every step and writes nothing.

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use stencil_diff::{ConflictResolver, ResolutionArtifact};
use stencil_fingerprint::{detect_version, Confidence, FingerprintDatabase, HashCache, VersionMatch};
use stencil_hash::ContentHasher;
use stencil_index::{reconcile, AppliedCycle, Manifest, MergeBase, ReconcilePlan};
use stencil_merge::has_conflict_markers;
use stencil_types::{NormalizedHash, ReleaseVersion, UpstreamVersion};
use tracing::{debug, info, warn};

use crate::cache::ListingCache;
use crate::config::UpdaterConfig;
use crate::error::{ProviderError, SdkError, SdkResult};
use crate::provider::UpstreamProvider;
use crate::report::{FileAction, FileReport, UpdateReport};

/// Drives update cycles for one project root.
pub struct Updater<P: UpstreamProvider> {
    root: PathBuf,
    config: UpdaterConfig,
    provider: P,
    database: Option<FingerprintDatabase>,
    resolver: ConflictResolver,
    listings: ListingCache,
}

/// Release content of one cycle.
struct Incoming {
    texts: BTreeMap<String, String>,
    hashes: BTreeMap<String, NormalizedHash>,
}

impl<P: UpstreamProvider> Updater<P> {
    pub fn new(root: impl Into<PathBuf>, config: UpdaterConfig, provider: P) -> Self {
        let resolver = ConflictResolver::new(config.merge.clone(), config.report.clone());
        Self {
            root: root.into(),
            config,
            provider,
            database: None,
            resolver,
            listings: ListingCache::new(),
        }
    }

    /// Use `database` to detect the installed release on first run.
    /// Without one, a project without a manifest fails with
    /// [`SdkError::NoDatabase`] unless `assume_undetected` is set.
    pub fn with_database(mut self, database: FingerprintDatabase) -> Self {
        self.database = Some(database);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Drop cached release listings, e.g. after the provider changed.
    pub fn invalidate_listings(&mut self) {
        self.listings.clear();
    }

    /// Absolute location of the manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(&self.config.manifest_path)
    }

    /// The saved manifest, if the project has one.
    pub fn load_manifest(&self) -> SdkResult<Option<Manifest>> {
        Ok(Manifest::load_if_exists(&self.manifest_path())?)
    }

    fn hasher(&self) -> ContentHasher {
        ContentHasher::new(self.config.algorithm)
    }

    // -----------------------------------------------------------------------
    // Detection
    // -----------------------------------------------------------------------

    /// Identify the release the project's files match.
    pub fn detect(&self) -> SdkResult<VersionMatch> {
        let db = self.database.as_ref().ok_or(SdkError::NoDatabase)?;
        let mut cache = HashCache::new(&self.root, self.hasher());
        self.detect_with(db, &mut cache)
    }

    fn detect_with(&self, db: &FingerprintDatabase, cache: &mut HashCache) -> SdkResult<VersionMatch> {
        if db.algorithm != self.config.algorithm {
            return Err(SdkError::Config(format!(
                "fingerprint database uses {} but local hashing uses {}",
                db.algorithm, self.config.algorithm
            )));
        }
        let tree = cache.snapshot(db.tracked_paths.iter().map(String::as_str))?;
        let detected = detect_version(&tree.hashes, db);
        info!(
            version = %detected.version,
            confidence = ?detected.confidence,
            matched = detected.matched,
            total = detected.total,
            customized = detected.customized_paths.len(),
            "detected installed release"
        );
        Ok(detected)
    }

    /// Hashes of every file `version` ships: the database record, completed
    /// from the provider when it still has the release.
    fn release_hashes(&mut self, version: &ReleaseVersion) -> SdkResult<BTreeMap<String, NormalizedHash>> {
        let mut hashes = self
            .database
            .as_ref()
            .and_then(|db| db.release(version))
            .cloned()
            .unwrap_or_default();
        let listing = match self.listings.list(&self.provider, version) {
            Ok(listing) => listing.clone(),
            Err(ProviderError::VersionNotFound(_)) => {
                debug!(version = %version, "detected release not available upstream");
                return Ok(hashes);
            }
            Err(e) => return Err(e.into()),
        };
        let hasher = self.hasher();
        for path in listing {
            if hashes.contains_key(&path) {
                continue;
            }
            if let Some(text) = self.provider.get(version, &path)? {
                hashes.insert(path, hasher.hash_text(&text));
            }
        }
        Ok(hashes)
    }

    /// First-run manifest: every local file the release ships becomes
    /// tracked, with a known original hash only if detection succeeded.
    /// Without a database this is an error unless the configuration opts
    /// into an undetected bootstrap.
    fn bootstrap(
        &mut self,
        listing: &BTreeSet<String>,
        cache: &mut HashCache,
    ) -> SdkResult<(Manifest, VersionMatch)> {
        let mut detected = match &self.database {
            Some(db) => self.detect_with(db, cache)?,
            None if !self.config.assume_undetected => return Err(SdkError::NoDatabase),
            None => {
                warn!("no fingerprint database, bootstrapping as undetected; every file merges without a base");
                VersionMatch {
                    version: UpstreamVersion::Unknown,
                    confidence: Confidence::Low,
                    customized_paths: BTreeSet::new(),
                    missing_paths: BTreeSet::new(),
                    matched: 0,
                    total: 0,
                    fast_path: false,
                }
            }
        };
        let release_hashes = match detected.version.known().cloned() {
            Some(version) => self.release_hashes(&version)?,
            None => BTreeMap::new(),
        };

        let mut official = listing.clone();
        official.extend(release_hashes.keys().cloned());
        let local = cache.snapshot(official.iter().map(String::as_str))?.hashes;
        if !detected.is_detected() {
            detected.customized_paths = local.keys().cloned().collect();
        }

        let manifest = Manifest::bootstrap(&detected, &release_hashes, &official, &local);
        Ok((manifest, detected))
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    /// Update the project to the provider's most recent release.
    pub fn update_to_latest(&mut self) -> SdkResult<UpdateReport> {
        let target = self
            .provider
            .latest()?
            .ok_or_else(|| ProviderError::VersionNotFound("no releases available".into()))?;
        self.update(&target)
    }

    /// Compute the cycle for `target` without writing anything.
    pub fn preview(&mut self, target: &ReleaseVersion) -> SdkResult<UpdateReport> {
        self.run(target, true)
    }

    /// Run one cycle to `target`. Honors `dry_run` from the configuration.
    pub fn update(&mut self, target: &ReleaseVersion) -> SdkResult<UpdateReport> {
        let dry_run = self.config.dry_run;
        self.run(target, dry_run)
    }

    fn run(&mut self, target: &ReleaseVersion, dry_run: bool) -> SdkResult<UpdateReport> {
        let manifest_path = self.manifest_path();
        let mut cache = HashCache::new(&self.root, self.hasher());
        let listing = self.listings.list(&self.provider, target)?.clone();

        let (mut manifest, detection) = match Manifest::load_if_exists(&manifest_path)? {
            Some(manifest) => (manifest, None),
            None => {
                let (manifest, detected) = self.bootstrap(&listing, &mut cache)?;
                (manifest, Some(detected))
            }
        };
        let from = manifest.upstream_version.clone();
        info!(from = %from, to = %target, dry_run, "starting update cycle");

        let incoming = self.fetch(target, &listing)?;
        let candidates: BTreeSet<&str> = listing
            .iter()
            .chain(manifest.tracked_files().keys())
            .chain(manifest.custom_files())
            .map(String::as_str)
            .collect();
        let current = cache.snapshot(candidates)?.hashes;
        let plan = reconcile(&manifest, &incoming.hashes, &current);

        let mut applied = AppliedCycle::default();
        let files = self.apply(&plan, &manifest, &incoming, &current, target, dry_run, &mut applied)?;

        let same_release = from.known() == Some(target);
        if plan.is_noop() && same_release && detection.is_none() {
            debug!("nothing to do, manifest left as is");
        } else {
            manifest.commit_cycle(target.clone(), &applied)?;
            if !dry_run {
                manifest.save(&manifest_path)?;
            }
        }

        let report = UpdateReport {
            from,
            to: target.clone(),
            detection,
            dry_run,
            files,
            summary: applied.summary,
        };
        info!(
            to = %target,
            added = report.summary.added,
            updated = report.summary.updated,
            removed = report.summary.removed,
            merged = report.summary.merged,
            conflicts = report.summary.conflicts,
            orphaned = report.summary.orphaned,
            "update cycle finished"
        );
        Ok(report)
    }

    fn fetch(&self, target: &ReleaseVersion, listing: &BTreeSet<String>) -> SdkResult<Incoming> {
        let hasher = self.hasher();
        let mut incoming = Incoming {
            texts: BTreeMap::new(),
            hashes: BTreeMap::new(),
        };
        for path in listing {
            match self.provider.get(target, path)? {
                Some(text) => {
                    incoming.hashes.insert(path.clone(), hasher.hash_text(&text));
                    incoming.texts.insert(path.clone(), text);
                }
                None => warn!(path = %path, version = %target, "listed file has no content"),
            }
        }
        Ok(incoming)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply(
        &self,
        plan: &ReconcilePlan,
        manifest: &Manifest,
        incoming: &Incoming,
        current: &BTreeMap<String, NormalizedHash>,
        target: &ReleaseVersion,
        dry_run: bool,
        applied: &mut AppliedCycle,
    ) -> SdkResult<Vec<FileReport>> {
        let mut files = Vec::new();

        for path in &plan.to_add {
            let (Some(text), Some(hash)) = (incoming.texts.get(path), incoming.hashes.get(path)) else {
                continue;
            };
            let action = if manifest.tracked(path).is_some() {
                FileAction::Restored
            } else {
                FileAction::Added
            };
            self.write(Path::new(path), text, dry_run)?;
            applied.refreshed.insert(path.clone(), hash.clone());
            applied.summary.added += 1;
            debug!(path = %path, ?action, "wrote upstream file");
            files.push(FileReport::new(path, action));
        }

        for path in &plan.to_update {
            let (Some(text), Some(hash)) = (incoming.texts.get(path), incoming.hashes.get(path)) else {
                continue;
            };
            // Normalized-equal content is only re-recorded, never rewritten.
            let same = current.get(path).is_some_and(|c| stencil_hash::equal(c, hash));
            if !same {
                self.write(Path::new(path), text, dry_run)?;
            }
            applied.refreshed.insert(path.clone(), hash.clone());
            applied.summary.updated += 1;
            debug!(path = %path, rewritten = !same, "updated file");
            files.push(FileReport::new(path, FileAction::Updated));
        }

        for path in &plan.unchanged {
            files.push(FileReport::new(path, FileAction::Unchanged));
        }

        for path in &plan.to_remove {
            if current.contains_key(path) {
                self.remove(Path::new(path), dry_run)?;
            }
            applied.removed.insert(path.clone());
            applied.summary.removed += 1;
            debug!(path = %path, "removed file upstream dropped");
            files.push(FileReport::new(path, FileAction::Removed));
        }

        for path in &plan.to_preserve_as_custom {
            applied.orphaned.insert(path.clone());
            applied.summary.orphaned += 1;
            info!(path = %path, "upstream dropped a customized file, keeping it as custom");
            files.push(FileReport::new(path, FileAction::Orphaned));
        }

        for (path, base) in &plan.to_merge {
            if let Some(report) = self.merge_one(path, *base, manifest, incoming, target, dry_run, applied)? {
                files.push(report);
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    #[allow(clippy::too_many_arguments)]
    fn merge_one(
        &self,
        path: &str,
        base: MergeBase,
        manifest: &Manifest,
        incoming: &Incoming,
        target: &ReleaseVersion,
        dry_run: bool,
        applied: &mut AppliedCycle,
    ) -> SdkResult<Option<FileReport>> {
        let (Some(incoming_text), Some(incoming_hash)) = (incoming.texts.get(path), incoming.hashes.get(path)) else {
            return Ok(None);
        };
        let full = self.root.join(path);
        let current_text = match std::fs::read_to_string(&full) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                warn!(path = %path, "local file is not UTF-8, leaving it alone");
                let mut report = FileReport::new(path, FileAction::Skipped);
                report.notes.push("local file is not valid UTF-8".into());
                applied.summary.conflicts += 1;
                return Ok(Some(report));
            }
            Err(source) => return Err(SdkError::Io { path: full, source }),
        };

        if has_conflict_markers(&current_text) {
            warn!(path = %path, "unresolved conflict markers, not merging again");
            let mut report = FileReport::new(path, FileAction::Skipped);
            report.notes.push("file still contains conflict markers from an earlier update".into());
            applied.summary.conflicts += 1;
            return Ok(Some(report));
        }

        let base = match base {
            MergeBase::Release => self.merge_base(path, manifest),
            MergeBase::Missing => None,
        };
        let base_label = match &base {
            Some((version, _)) => version.to_string(),
            None => manifest.upstream_version.label(),
        };

        let resolution = self.resolver.resolve_file(
            Path::new(path),
            &current_text,
            base.as_ref().map(|(_, text)| text.as_str()),
            incoming_text,
            &base_label,
            target.as_str(),
        );

        let (action, conflicts, report_path) = match &resolution.artifact {
            ResolutionArtifact::Merged(output) => {
                self.write(Path::new(path), &output.merged_text, dry_run)?;
                let action = if output.is_clean() {
                    FileAction::Merged
                } else {
                    FileAction::Conflict
                };
                (action, output.conflict_count, None)
            }
            ResolutionArtifact::InlineMarkers { text } => {
                self.write(Path::new(path), text, dry_run)?;
                (FileAction::Conflict, 1, None)
            }
            ResolutionArtifact::DiffReport { report_path, report } => {
                self.write(report_path, &report.render(), dry_run)?;
                (FileAction::Reported, report.section_count(), Some(report_path.clone()))
            }
        };

        // The file is now based on the target release, whatever is left
        // for the user to resolve.
        applied.refreshed.insert(path.to_string(), incoming_hash.clone());
        if action == FileAction::Merged {
            applied.summary.merged += 1;
        } else {
            applied.summary.conflicts += 1;
        }
        debug!(path = %path, ?action, conflicts, fallbacks = resolution.fallbacks.len(), "resolved file");

        let mut report = FileReport::new(path, action);
        report.conflicts = conflicts;
        report.report_path = report_path;
        report.notes = resolution.fallbacks.iter().map(ToString::to_string).collect();
        Ok(Some(report))
    }

    // -----------------------------------------------------------------------
    // File system
    // -----------------------------------------------------------------------

    /// The file as shipped by the release its original hash came from.
    ///
    /// `None` when that copy is unavailable or no longer hashes to the
    /// recorded original; the merge then runs without a base.
    fn merge_base(&self, path: &str, manifest: &Manifest) -> Option<(ReleaseVersion, String)> {
        let tracked = manifest.tracked(path)?;
        let original = tracked.original_hash.known()?;
        let version = tracked
            .base_version
            .as_ref()
            .or_else(|| manifest.upstream_version.known())?;
        let text = match self.provider.get(version, path) {
            Ok(Some(text)) => text,
            Ok(None) => {
                warn!(path = %path, version = %version, "base release does not ship the file, merging without base");
                return None;
            }
            Err(e) => {
                warn!(path = %path, version = %version, error = %e, "base release unavailable, merging without base");
                return None;
            }
        };
        if !stencil_hash::equal(&self.hasher().hash_text(&text), original) {
            warn!(path = %path, version = %version, "base copy differs from the recorded original, merging without base");
            return None;
        }
        Some((version.clone(), text))
    }

    fn write(&self, rel: &Path, text: &str, dry_run: bool) -> SdkResult<()> {
        if dry_run {
            return Ok(());
        }
        let full = self.root.join(rel);
        let io_err = |source: std::io::Error| SdkError::Io {
            path: full.clone(),
            source,
        };
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(&full, text).map_err(io_err)
    }

    fn remove(&self, rel: &Path, dry_run: bool) -> SdkResult<()> {
        if dry_run {
            return Ok(());
        }
        let full = self.root.join(rel);
        match std::fs::remove_file(&full) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SdkError::Io { path: full, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryProvider;
    use crate::report::FileStatus;
    use stencil_index::TrackedFile;
    use stencil_types::HashAlgorithm;

    fn v(s: &str) -> ReleaseVersion {
        ReleaseVersion::new(s).unwrap()
    }

    fn h(s: &str) -> NormalizedHash {
        ContentHasher::SHA256.hash_text(s)
    }

    fn put(root: &Path, rel: &str, text: &str) {
        let full = root.join(rel);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, text).unwrap();
    }

    fn read(root: &Path, rel: &str) -> String {
        std::fs::read_to_string(root.join(rel)).unwrap()
    }

    fn undetected() -> UpdaterConfig {
        UpdaterConfig {
            assume_undetected: true,
            ..UpdaterConfig::default()
        }
    }

    const B_V1: &str = "# B\n\nIntro.\n\n## One\n\nbase one\n\n## Two\n\nbase two\n";
    const B_LOCAL: &str = "# B\n\nIntro.\n\n## One\n\nlocal one\n\n## Two\n\nbase two\n";
    const B_V2: &str = "# B\n\nIntro.\n\n## One\n\nbase one\n\n## Two\n\nupstream two\n";

    fn two_releases() -> InMemoryProvider {
        let (v1, v2) = (v("v1"), v("v2"));
        InMemoryProvider::new()
            .with_file(&v1, "a.md", "A1\n")
            .with_file(&v1, "b.md", B_V1)
            .with_file(&v1, "c.md", "C\n")
            .with_file(&v1, "d.md", "D\n")
            .with_file(&v2, "a.md", "A2\n")
            .with_file(&v2, "b.md", B_V2)
            .with_file(&v2, "e.md", "E\n")
    }

    fn database() -> FingerprintDatabase {
        let tracked: Vec<String> = ["a.md", "b.md", "c.md", "d.md"].map(String::from).to_vec();
        let mut db = FingerprintDatabase::new(HashAlgorithm::Sha256, vec!["a.md".into()], tracked);
        db.record_release(
            v("v1"),
            &BTreeMap::from([
                ("a.md".to_string(), h("A1\n")),
                ("b.md".to_string(), h(B_V1)),
                ("c.md".to_string(), h("C\n")),
                ("d.md".to_string(), h("D\n")),
            ]),
        );
        db.record_release(
            v("v2"),
            &BTreeMap::from([("a.md".to_string(), h("A2\n")), ("b.md".to_string(), h(B_V2))]),
        );
        db
    }

    #[test]
    fn detected_install_is_updated_file_by_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        put(root, "a.md", "A1\n");
        put(root, "b.md", B_LOCAL);
        put(root, "c.md", "C\n");
        put(root, "d.md", "D edited\n");
        put(root, "notes.md", "mine\n");

        let mut updater =
            Updater::new(root, UpdaterConfig::default(), two_releases()).with_database(database());
        let report = updater.update(&v("v2")).unwrap();

        let detection = report.detection.as_ref().unwrap();
        assert_eq!(detection.version, UpstreamVersion::Known(v("v1")));
        assert_eq!(report.from, UpstreamVersion::Known(v("v1")));

        assert_eq!(report.file("a.md").unwrap().action, FileAction::Updated);
        assert_eq!(read(root, "a.md"), "A2\n");

        assert_eq!(report.file("b.md").unwrap().action, FileAction::Merged);
        let merged = read(root, "b.md");
        assert!(merged.contains("local one"));
        assert!(merged.contains("upstream two"));
        assert!(!has_conflict_markers(&merged));

        assert_eq!(report.file("c.md").unwrap().action, FileAction::Removed);
        assert!(!root.join("c.md").exists());

        assert_eq!(report.file("d.md").unwrap().action, FileAction::Orphaned);
        assert_eq!(read(root, "d.md"), "D edited\n");

        assert_eq!(report.file("e.md").unwrap().action, FileAction::Added);
        assert_eq!(read(root, "e.md"), "E\n");

        assert!(report.file("notes.md").is_none());
        assert_eq!(read(root, "notes.md"), "mine\n");
        assert!(report.is_clean());

        let manifest = updater.load_manifest().unwrap().unwrap();
        assert_eq!(manifest.upstream_version, UpstreamVersion::Known(v("v2")));
        assert!(manifest.is_custom("d.md"));
        assert!(manifest.tracked("c.md").is_none());
        assert_eq!(manifest.history().len(), 2);
        assert_eq!(report.summary.merged, 1);
        assert_eq!(report.summary.orphaned, 1);
    }

    #[test]
    fn undetected_install_surfaces_conflicts_without_base() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        put(root, "plan.md", "# Plan\n\nIntro\n\n## Steps\n\nmine\n");
        let provider = InMemoryProvider::new()
            .with_file(&v("v1"), "plan.md", "# Plan\n\nIntro\n\n## Steps\n\ntheirs\n")
            .with_file(&v("v1"), "new.md", "new\n");

        let mut updater = Updater::new(root, undetected(), provider);
        let report = updater.update(&v("v1")).unwrap();

        assert_eq!(report.from, UpstreamVersion::Unknown);
        let plan = report.file("plan.md").unwrap();
        assert_eq!(plan.action, FileAction::Conflict);
        assert_eq!(plan.status, FileStatus::NeedsAttention);
        let text = read(root, "plan.md");
        assert!(text.contains("<<<<<<<"));
        assert!(text.contains("(no base version)"));
        assert!(text.contains("mine"));
        assert!(text.contains("theirs"));
        assert_eq!(report.file("new.md").unwrap().action, FileAction::Added);

        let manifest = updater.load_manifest().unwrap().unwrap();
        assert_eq!(
            manifest.tracked("plan.md").unwrap().original_hash.known(),
            Some(&h("# Plan\n\nIntro\n\n## Steps\n\ntheirs\n"))
        );
    }

    #[test]
    fn unresolved_markers_are_not_merged_again() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        put(root, "plan.md", "# Plan\n\nmine\n");
        let mut provider = InMemoryProvider::new().with_file(&v("v1"), "plan.md", "# Plan\n\ntheirs\n");
        provider.insert(v("v2"), "plan.md", "# Plan\n\ntheirs again\n");

        let mut updater = Updater::new(root, undetected(), provider);
        updater.update(&v("v1")).unwrap();
        let first = read(root, "plan.md");
        assert!(has_conflict_markers(&first));

        let report = updater.update(&v("v2")).unwrap();
        let plan = report.file("plan.md").unwrap();
        assert_eq!(plan.action, FileAction::Skipped);
        assert!(!plan.notes.is_empty());
        assert_eq!(read(root, "plan.md"), first);
    }

    #[test]
    fn large_text_file_gets_a_side_report() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let local: String = (1..=150).map(|i| format!("setting_{i} = {i}\n")).collect();
        let upstream = local.replace("setting_70 = 70\n", "setting_70 = 700\n");
        put(root, "config.txt", &local);
        let provider = InMemoryProvider::new().with_file(&v("v1"), "config.txt", &upstream);

        let mut updater = Updater::new(root, undetected(), provider);
        let report = updater.update(&v("v1")).unwrap();

        let file = report.file("config.txt").unwrap();
        assert_eq!(file.action, FileAction::Reported);
        assert_eq!(file.conflicts, 1);
        let report_path = file.report_path.clone().unwrap();
        assert_eq!(report_path, PathBuf::from("config.txt.conflict-report.md"));
        assert_eq!(read(root, "config.txt"), local);
        let rendered = read(root, "config.txt.conflict-report.md");
        assert!(rendered.contains("setting_70 = 700"));
        assert!(rendered.contains("## Unchanged ranges"));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        put(root, "plan.md", "# Plan\n\nmine\n");
        let provider = InMemoryProvider::new()
            .with_file(&v("v1"), "plan.md", "# Plan\n\ntheirs\n")
            .with_file(&v("v1"), "new.md", "new\n");
        let config = UpdaterConfig {
            dry_run: true,
            ..undetected()
        };

        let mut updater = Updater::new(root, config, provider);
        let report = updater.update(&v("v1")).unwrap();
        assert!(report.dry_run);
        assert_eq!(report.file("new.md").unwrap().action, FileAction::Added);
        assert!(!root.join("new.md").exists());
        assert_eq!(read(root, "plan.md"), "# Plan\n\nmine\n");
        assert!(updater.load_manifest().unwrap().is_none());
    }

    #[test]
    fn repeated_cycle_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let provider = InMemoryProvider::new().with_file(&v("v1"), "a.md", "A\n");
        let mut updater = Updater::new(root, undetected(), provider);

        updater.update(&v("v1")).unwrap();
        let report = updater.update(&v("v1")).unwrap();
        assert_eq!(report.file("a.md").unwrap().action, FileAction::Unchanged);
        assert_eq!(report.count(FileStatus::Preserved), 1);
        let manifest = updater.load_manifest().unwrap().unwrap();
        assert_eq!(manifest.history().len(), 2);
    }

    #[test]
    fn custom_file_claimed_by_upstream_is_adopted_through_merge() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        put(root, "notes.md", "# Notes\n\nmine\n");
        let mut manifest = Manifest::new(UpstreamVersion::Known(v("v1")));
        manifest.add_custom("notes.md").unwrap();
        manifest
            .save(&root.join(".stencil/manifest.json"))
            .unwrap();

        let provider = InMemoryProvider::new().with_file(&v("v2"), "notes.md", "# Notes\n\ntheirs\n");
        let mut updater = Updater::new(root, UpdaterConfig::default(), provider);
        let report = updater.update(&v("v2")).unwrap();

        assert_eq!(report.file("notes.md").unwrap().action, FileAction::Conflict);
        let manifest = updater.load_manifest().unwrap().unwrap();
        assert!(!manifest.is_custom("notes.md"));
        assert!(manifest.tracked("notes.md").is_some());
    }

    #[test]
    fn first_run_without_database_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        put(root, "plan.md", "# Plan\n\nmine\n");
        let provider = InMemoryProvider::new()
            .with_file(&v("v1"), "plan.md", "# Plan\n\ntheirs\n")
            .with_file(&v("v1"), "new.md", "new\n");

        let mut updater = Updater::new(root, UpdaterConfig::default(), provider);
        assert!(matches!(updater.update(&v("v1")), Err(SdkError::NoDatabase)));
        assert!(matches!(updater.preview(&v("v1")), Err(SdkError::NoDatabase)));
        assert!(updater.load_manifest().unwrap().is_none());
        assert!(!root.join("new.md").exists());
        assert_eq!(read(root, "plan.md"), "# Plan\n\nmine\n");
    }

    #[test]
    fn skipped_file_keeps_the_release_it_was_based_on() {
        const V1: &str = "# Plan\n\nIntro\n\n## Steps\n\nbase steps\n\n## Other\n\nA\n";
        const V2: &str = "# Plan\n\nIntro\n\n## Steps\n\nbase steps\n\n## Other\n\nB upstream fix\n";
        const MINE: &str = "# Plan\n\nIntro\n\n## Steps\n\nmine\n\n## Other\n\nA\n";

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        put(root, "plan.md", MINE);
        let provider = InMemoryProvider::new()
            .with_file(&v("v1"), "plan.md", V1)
            .with_file(&v("v2"), "plan.md", V2)
            .with_file(&v("v3"), "plan.md", V2);
        let mut updater = Updater::new(root, undetected(), provider);

        updater.update(&v("v1")).unwrap();
        assert!(has_conflict_markers(&read(root, "plan.md")));

        let report = updater.update(&v("v2")).unwrap();
        assert_eq!(report.file("plan.md").unwrap().action, FileAction::Skipped);
        let manifest = updater.load_manifest().unwrap().unwrap();
        assert_eq!(manifest.upstream_version, UpstreamVersion::Known(v("v2")));
        let tracked = manifest.tracked("plan.md").unwrap();
        assert_eq!(tracked.base_version, Some(v("v1")));
        assert_eq!(tracked.original_hash.known(), Some(&h(V1)));

        // The user settles the v1 conflict by hand.
        put(root, "plan.md", MINE);
        let report = updater.update(&v("v3")).unwrap();
        let file = report.file("plan.md").unwrap();
        assert_eq!(file.action, FileAction::Merged);
        let text = read(root, "plan.md");
        assert!(text.contains("mine"));
        assert!(text.contains("B upstream fix"), "upstream v2 change lost:\n{text}");

        let tracked = updater.load_manifest().unwrap().unwrap().tracked("plan.md").cloned().unwrap();
        assert_eq!(tracked.base_version, Some(v("v3")));
    }

    #[test]
    fn base_copy_that_no_longer_matches_is_not_trusted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        put(root, "plan.md", "# Plan\n\nmine\n");
        let mut manifest = Manifest::new(UpstreamVersion::Known(v("v1")));
        manifest
            .track(TrackedFile::new("plan.md", h("# Plan\n\nas installed\n")).with_base(v("v1")))
            .unwrap();
        manifest.save(&root.join(".stencil/manifest.json")).unwrap();

        // Upstream republished v1 with different content.
        let provider = InMemoryProvider::new()
            .with_file(&v("v1"), "plan.md", "# Plan\n\nrepublished\n")
            .with_file(&v("v2"), "plan.md", "# Plan\n\ntheirs\n");
        let mut updater = Updater::new(root, UpdaterConfig::default(), provider);
        let report = updater.update(&v("v2")).unwrap();

        assert_eq!(report.file("plan.md").unwrap().action, FileAction::Conflict);
        let text = read(root, "plan.md");
        assert!(text.contains("(no base version)"));
        assert!(text.contains("mine"));
        assert!(text.contains("theirs"));
    }

    #[test]
    fn detect_needs_a_database() {
        let dir = tempfile::tempdir().unwrap();
        let updater = Updater::new(dir.path(), UpdaterConfig::default(), InMemoryProvider::new());
        assert!(matches!(updater.detect(), Err(SdkError::NoDatabase)));

        let config = UpdaterConfig {
            algorithm: HashAlgorithm::Blake3,
            ..UpdaterConfig::default()
        };
        let updater = Updater::new(dir.path(), config, InMemoryProvider::new()).with_database(database());
        assert!(matches!(updater.detect(), Err(SdkError::Config(_))));
    }

    #[test]
    fn latest_release_is_the_default_target() {
        let dir = tempfile::tempdir().unwrap();
        let mut updater = Updater::new(dir.path(), undetected(), two_releases());
        let report = updater.update_to_latest().unwrap();
        assert_eq!(report.to, v("v2"));
        assert_eq!(read(dir.path(), "e.md"), "E\n");

        let mut empty = Updater::new(dir.path(), UpdaterConfig::default(), InMemoryProvider::new());
        assert!(matches!(
            empty.update_to_latest(),
            Err(SdkError::Provider(ProviderError::VersionNotFound(_)))
        ));
    }
}
