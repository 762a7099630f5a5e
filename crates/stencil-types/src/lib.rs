//! Foundation types for Stencil.
//!
//! Every other Stencil crate depends on `stencil-types`. It holds the
//! identifiers shared between the hasher, the fingerprint matcher and the
//! tracked-file manifest.
//!
//! # Key Types
//!
//! - [`NormalizedHash`] -- Algorithm-tagged digest of a file's canonical text
//! - [`HashAlgorithm`] -- The digest algorithm behind a [`NormalizedHash`]
//! - [`ReleaseVersion`] -- An upstream release identifier with numeric ordering
//! - [`UpstreamVersion`] -- A known release or the undetected-install sentinel

pub mod error;
pub mod hash;
pub mod version;

pub use error::TypeError;
pub use hash::{HashAlgorithm, NormalizedHash};
pub use version::{ReleaseVersion, UpstreamVersion};
