//! Content-addressed cache keys
//!
//! A key is derived from the source URL of an artifact, never from its
//! contents, so a request can find its cached file before downloading.
//! Same URL = same key.

use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Number of digest bytes kept in a key (128 bits)
const KEY_BYTES: usize = 16;

/// Length of a key rendered as hex
pub const KEY_HEX_LEN: usize = KEY_BYTES * 2;

/// Cache key of a stylesheet or font file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a source identifier (a URL)
    pub fn for_source(source: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        let result = hasher.finalize();

        Self(hex::encode(&result[..KEY_BYTES]))
    }

    /// Parse a key rendered by `Display`, rejecting anything that could
    /// escape the cache directory
    pub fn parse(s: &str) -> Option<Self> {
        if s.len() != KEY_HEX_LEN {
            return None;
        }
        if !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return None;
        }
        Some(Self(s.to_string()))
    }

    /// The key as a hex string (also the cache file name)
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CacheKey {
    type Err = crate::error::GfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| crate::error::GfoError::FontNotFound(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_deterministic() {
        let a = CacheKey::for_source("https://fonts.gstatic.com/s/roboto/v30/a.woff2");
        let b = CacheKey::for_source("https://fonts.gstatic.com/s/roboto/v30/a.woff2");

        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), KEY_HEX_LEN);
    }

    #[test]
    fn key_differs_per_source() {
        let a = CacheKey::for_source("https://fonts.gstatic.com/s/roboto/v30/a.woff2");
        let b = CacheKey::for_source("https://fonts.gstatic.com/s/roboto/v30/b.woff2");

        assert_ne!(a, b);
    }

    #[test]
    fn key_empty_source() {
        let key = CacheKey::for_source("");
        // First 16 bytes of SHA-256("")
        assert_eq!(key.as_str(), "e3b0c44298fc1c149afbf4c8996fb924");
    }

    #[test]
    fn parse_roundtrip() {
        let key = CacheKey::for_source("https://fonts.googleapis.com/css?family=Roboto");
        assert_eq!(CacheKey::parse(&key.to_string()), Some(key));
    }

    #[test]
    fn parse_rejects_traversal_and_garbage() {
        assert!(CacheKey::parse("../../etc/passwd").is_none());
        assert!(CacheKey::parse("").is_none());
        assert!(CacheKey::parse("E3B0C44298FC1C149AFBF4C8996FB924").is_none());
        assert!(CacheKey::parse("e3b0c44298fc1c149afbf4c8996fb92").is_none());
        assert!(CacheKey::parse("zzb0c44298fc1c149afbf4c8996fb924").is_none());
    }

    #[test]
    fn from_str_maps_to_not_found() {
        let err = "nope".parse::<CacheKey>().unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
