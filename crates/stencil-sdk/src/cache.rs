//! Caller-owned memo of release listings.
//!
//! Listing a release can mean walking a directory tree or asking a remote
//! service, and one cycle needs the same listing several times. Entries
//! live until the caller drops them with [`ListingCache::invalidate`] or
//! [`ListingCache::clear`]; nothing expires on its own.

use std::collections::{BTreeSet, HashMap};

use stencil_types::ReleaseVersion;
use tracing::debug;

use crate::error::ProviderResult;
use crate::provider::{check_relative, UpstreamProvider};

/// Memoized `list` results, keyed by release.
#[derive(Debug, Default)]
pub struct ListingCache {
    entries: HashMap<ReleaseVersion, BTreeSet<String>>,
}

impl ListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listing of `version`, asking `provider` on first use.
    ///
    /// Listings containing a path that escapes the project root are
    /// rejected and not cached.
    pub fn list(
        &mut self,
        provider: &dyn UpstreamProvider,
        version: &ReleaseVersion,
    ) -> ProviderResult<&BTreeSet<String>> {
        if !self.entries.contains_key(version) {
            let listing = provider.list(version)?;
            for path in &listing {
                check_relative(path)?;
            }
            debug!(version = %version, files = listing.len(), "cached release listing");
            self.entries.insert(version.clone(), listing);
        }
        Ok(&self.entries[version])
    }

    /// Returns `true` if `version` is cached.
    pub fn contains(&self, version: &ReleaseVersion) -> bool {
        self.entries.contains_key(version)
    }

    /// Forget one release, e.g. after it was re-extracted.
    pub fn invalidate(&mut self, version: &ReleaseVersion) {
        self.entries.remove(version);
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::InMemoryProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        inner: InMemoryProvider,
        lists: AtomicUsize,
    }

    impl UpstreamProvider for Counting {
        fn get(&self, version: &ReleaseVersion, path: &str) -> ProviderResult<Option<String>> {
            self.inner.get(version, path)
        }

        fn list(&self, version: &ReleaseVersion) -> ProviderResult<BTreeSet<String>> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            self.inner.list(version)
        }

        fn versions(&self) -> ProviderResult<Vec<ReleaseVersion>> {
            self.inner.versions()
        }
    }

    fn v(s: &str) -> ReleaseVersion {
        ReleaseVersion::new(s).unwrap()
    }

    #[test]
    fn listings_are_memoized_until_invalidated() {
        let provider = Counting {
            inner: InMemoryProvider::new().with_file(&v("v1"), "a.md", "A"),
            lists: AtomicUsize::new(0),
        };
        let mut cache = ListingCache::new();

        assert_eq!(cache.list(&provider, &v("v1")).unwrap().len(), 1);
        assert_eq!(cache.list(&provider, &v("v1")).unwrap().len(), 1);
        assert_eq!(provider.lists.load(Ordering::SeqCst), 1);
        assert!(cache.contains(&v("v1")));

        cache.invalidate(&v("v1"));
        assert!(cache.is_empty());
        cache.list(&provider, &v("v1")).unwrap();
        assert_eq!(provider.lists.load(Ordering::SeqCst), 2);

        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn errors_are_not_cached() {
        let provider = InMemoryProvider::new();
        let mut cache = ListingCache::new();
        assert!(matches!(
            cache.list(&provider, &v("v9")),
            Err(ProviderError::VersionNotFound(_))
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn escaping_listing_is_rejected() {
        let provider = InMemoryProvider::new().with_file(&v("v1"), "../outside.md", "x");
        let mut cache = ListingCache::new();
        assert!(matches!(
            cache.list(&provider, &v("v1")),
            Err(ProviderError::InvalidPath(_))
        ));
        assert!(!cache.contains(&v("v1")));
    }
}
