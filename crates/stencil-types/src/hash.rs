use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Digest algorithm used to fingerprint canonical file content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-256, the algorithm every fingerprint database is published with.
    #[default]
    Sha256,
    /// BLAKE3, for local caches where speed matters more than interchange.
    Blake3,
}

impl HashAlgorithm {
    /// The tag rendered in front of the digest.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA256",
            Self::Blake3 => "BLAKE3",
        }
    }

    /// Digest size in bytes.
    pub fn digest_len(&self) -> usize {
        32
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for HashAlgorithm {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "").as_str() {
            "SHA256" => Ok(Self::Sha256),
            "BLAKE3" => Ok(Self::Blake3),
            other => Err(TypeError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Algorithm-tagged digest of a file's canonicalized content.
///
/// The digest is kept as upper-case hex, so two hashes rendered with
/// different letter case compare equal. The textual form is
/// `ALGORITHM:HEXDIGITS`, e.g. `SHA256:9F86D081...`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NormalizedHash {
    algorithm: HashAlgorithm,
    digest: String,
}

impl NormalizedHash {
    /// Build a hash from raw digest bytes.
    pub fn from_digest(algorithm: HashAlgorithm, digest: &[u8]) -> Self {
        Self {
            algorithm,
            digest: hex::encode_upper(digest),
        }
    }

    /// Build a hash from a hex digest, validating length and characters.
    pub fn from_hex(algorithm: HashAlgorithm, hex_digest: &str) -> Result<Self, TypeError> {
        let bytes =
            hex::decode(hex_digest.trim()).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != algorithm.digest_len() {
            return Err(TypeError::InvalidLength {
                algorithm: algorithm.tag().to_string(),
                expected: algorithm.digest_len(),
                actual: bytes.len(),
            });
        }
        Ok(Self::from_digest(algorithm, &bytes))
    }

    /// The algorithm that produced this digest.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Upper-case hex digest without the algorithm tag.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Short digest prefix for log lines.
    pub fn short(&self) -> &str {
        &self.digest[..12.min(self.digest.len())]
    }

    /// Case-insensitive comparison against another hash.
    ///
    /// Hashes from different algorithms never match.
    pub fn matches(&self, other: &NormalizedHash) -> bool {
        self.algorithm == other.algorithm && self.digest.eq_ignore_ascii_case(&other.digest)
    }
}

impl fmt::Debug for NormalizedHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NormalizedHash({}:{})", self.algorithm, self.short())
    }
}

impl fmt::Display for NormalizedHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.digest)
    }
}

impl FromStr for NormalizedHash {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (algo, digest) = s
            .split_once(':')
            .ok_or_else(|| TypeError::MalformedHash(s.to_string()))?;
        Self::from_hex(algo.parse()?, digest)
    }
}

impl TryFrom<String> for NormalizedHash {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NormalizedHash> for String {
    fn from(hash: NormalizedHash) -> Self {
        hash.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    #[test]
    fn display_is_tagged_upper_hex() {
        let hash = NormalizedHash::from_hex(HashAlgorithm::Sha256, DIGEST).unwrap();
        assert_eq!(hash.to_string(), format!("SHA256:{}", DIGEST.to_uppercase()));
    }

    #[test]
    fn parse_is_case_insensitive() {
        let lower: NormalizedHash = format!("sha256:{DIGEST}").parse().unwrap();
        let upper: NormalizedHash = format!("SHA256:{}", DIGEST.to_uppercase()).parse().unwrap();
        assert_eq!(lower, upper);
        assert!(lower.matches(&upper));
    }

    #[test]
    fn different_algorithms_never_match() {
        let a = NormalizedHash::from_hex(HashAlgorithm::Sha256, DIGEST).unwrap();
        let b = NormalizedHash::from_hex(HashAlgorithm::Blake3, DIGEST).unwrap();
        assert!(!a.matches(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!(matches!(
            "nocolon".parse::<NormalizedHash>(),
            Err(TypeError::MalformedHash(_))
        ));
        assert!(matches!(
            "MD5:abcd".parse::<NormalizedHash>(),
            Err(TypeError::UnknownAlgorithm(_))
        ));
        assert!(matches!(
            "SHA256:zz".parse::<NormalizedHash>(),
            Err(TypeError::InvalidHex(_))
        ));
        assert!(matches!(
            "SHA256:abcd".parse::<NormalizedHash>(),
            Err(TypeError::InvalidLength { expected: 32, actual: 2, .. })
        ));
    }

    #[test]
    fn serde_uses_string_form() {
        let hash = NormalizedHash::from_hex(HashAlgorithm::Sha256, DIGEST).unwrap();
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"SHA256:{}\"", DIGEST.to_uppercase()));
        let parsed: NormalizedHash = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, hash);
    }

    #[test]
    fn serde_rejects_garbage() {
        let result: Result<NormalizedHash, _> = serde_json::from_str("\"SHA256:nothex\"");
        assert!(result.is_err());
    }
}
