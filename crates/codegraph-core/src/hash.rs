//! Content hashing used exclusively as a cache-key discriminator.
//!
//! MD5 is used for speed and wide availability, never for anything
//! security-sensitive — it only needs to detect "this file changed since
//! the cache entry was written."

use md5::{Digest, Md5};

/// Hex-encoded MD5 digest of `content`.
#[must_use]
pub fn content_hash(content: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_content_same_hash() {
        assert_eq!(content_hash("fn main() {}"), content_hash("fn main() {}"));
    }

    #[test]
    fn different_content_different_hash() {
        assert_ne!(content_hash("a"), content_hash("b"));
    }

    #[test]
    fn hash_is_32_hex_chars() {
        assert_eq!(content_hash("x").len(), 32);
    }
}
