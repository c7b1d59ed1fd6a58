//! Content hashing used as the change-detection signal.

use sha2::{Digest, Sha256};

/// SHA-256 of `text`, as lowercase hex.
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        let hash = hash_text("hello world");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn stable_and_sensitive() {
        assert_eq!(hash_text("Weekly claims"), hash_text("Weekly claims"));
        assert_ne!(hash_text("Weekly claims"), hash_text("Weekly claims."));
        assert_ne!(hash_text("404"), hash_text("403"));
    }
}
