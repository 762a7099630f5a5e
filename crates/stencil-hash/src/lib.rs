//! Content normalization and hashing for Stencil.
//!
//! A file counts as customized when the hash of its canonical text differs
//! from the hash recorded for the release it was installed from. The
//! canonical form erases the noise editors and platforms introduce (line
//! endings, byte-order marks, trailing whitespace) so that only real edits
//! change the hash.
//!
//! # Key Types
//!
//! - [`ContentHasher`] -- Normalizes and hashes bytes, text, files and trees
//! - [`TreeHashes`] -- Result of hashing a set of relative paths under a root
//! - [`HashError`] -- Read failures, always carrying the offending path

pub mod error;
pub mod hasher;
pub mod normalize;

pub use error::{HashError, HashResult};
pub use hasher::{equal, ContentHasher, TreeHashes};
pub use normalize::{normalize, normalize_bytes};
