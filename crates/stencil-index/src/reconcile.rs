//! Per-cycle reconciliation of the manifest against a new upstream release.
//!
//! | upstream | local state                     | decision              |
//! |----------|---------------------------------|-----------------------|
//! | ships    | not present, not tracked        | add                   |
//! | ships    | tracked, deleted locally        | add (restore)         |
//! | ships    | tracked, not customized         | update / unchanged    |
//! | ships    | tracked, customized             | merge / unchanged     |
//! | ships    | present but untracked or custom | merge without a base  |
//! | dropped  | tracked, not customized         | remove                |
//! | dropped  | tracked, customized             | preserve as custom    |
//! | -        | custom, never shipped           | untouched             |
//!
//! A customized file is left alone when upstream did not change it.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use stencil_types::NormalizedHash;
use tracing::debug;

use crate::entry::{classify, OriginalHash};
use crate::manifest::Manifest;

/// Where the base of a three-way merge comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeBase {
    /// The file as shipped by the release its original hash came from:
    /// the file's own base release, or the manifest's release for records
    /// written before base releases were kept.
    Release,
    /// No common ancestor is known.
    Missing,
}

/// Decisions for one cycle. Every path appears in at most one set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    pub to_add: BTreeSet<String>,
    pub to_update: BTreeSet<String>,
    pub to_remove: BTreeSet<String>,
    pub to_preserve_as_custom: BTreeSet<String>,
    pub to_merge: BTreeMap<String, MergeBase>,
    pub unchanged: BTreeSet<String>,
}

impl ReconcilePlan {
    /// Returns `true` if the cycle writes nothing.
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty()
            && self.to_update.is_empty()
            && self.to_remove.is_empty()
            && self.to_preserve_as_custom.is_empty()
            && self.to_merge.is_empty()
    }

    /// Number of paths with a decision, unchanged ones included.
    pub fn total(&self) -> usize {
        self.to_add.len()
            + self.to_update.len()
            + self.to_remove.len()
            + self.to_preserve_as_custom.len()
            + self.to_merge.len()
            + self.unchanged.len()
    }
}

/// Decide what a cycle does with every tracked and every upstream path.
///
/// `upstream` maps each path the new release ships to its hash; `current`
/// maps local paths to their hashes (a missing key means the file does not
/// exist). Custom files upstream does not ship never appear in the plan.
pub fn reconcile(
    manifest: &Manifest,
    upstream: &BTreeMap<String, NormalizedHash>,
    current: &BTreeMap<String, NormalizedHash>,
) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    for (path, incoming) in upstream {
        let local = current.get(path);
        let tracked = manifest.tracked(path).filter(|f| f.is_official);
        match (tracked, local) {
            (_, None) => {
                plan.to_add.insert(path.clone());
            }
            (Some(file), Some(local)) => {
                let customized = classify(path, &file.original_hash, local);
                let upstream_changed = match &file.original_hash {
                    OriginalHash::Known(original) => !stencil_hash::equal(original, incoming),
                    OriginalHash::Unknown => true,
                };
                if stencil_hash::equal(local, incoming) {
                    // Already identical to upstream; refresh the record.
                    if file.original_hash.known() == Some(incoming) {
                        plan.unchanged.insert(path.clone());
                    } else {
                        plan.to_update.insert(path.clone());
                    }
                } else if !upstream_changed {
                    plan.unchanged.insert(path.clone());
                } else if !customized {
                    plan.to_update.insert(path.clone());
                } else {
                    let has_release =
                        file.base_version.is_some() || !manifest.upstream_version.is_unknown();
                    let base = match file.original_hash {
                        OriginalHash::Known(_) if has_release => MergeBase::Release,
                        _ => MergeBase::Missing,
                    };
                    plan.to_merge.insert(path.clone(), base);
                }
            }
            (None, Some(local)) => {
                // A custom or stray local file now claimed by upstream.
                if stencil_hash::equal(local, incoming) {
                    plan.to_update.insert(path.clone());
                } else {
                    plan.to_merge.insert(path.clone(), MergeBase::Missing);
                }
            }
        }
    }

    for (path, file) in manifest.tracked_files() {
        if upstream.contains_key(path) {
            continue;
        }
        if file.is_customized(current.get(path)) {
            plan.to_preserve_as_custom.insert(path.clone());
        } else {
            plan.to_remove.insert(path.clone());
        }
    }

    debug!(
        add = plan.to_add.len(),
        update = plan.to_update.len(),
        remove = plan.to_remove.len(),
        preserve = plan.to_preserve_as_custom.len(),
        merge = plan.to_merge.len(),
        unchanged = plan.unchanged.len(),
        "reconciled"
    );
    plan
}
