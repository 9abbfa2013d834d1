//! Local key-value storage and the remote document store abstraction.
//!
//! The chat transcript, the anonymous user id and the registration flag all
//! live in a [`KeyValueStore`]. Profiles and the news feed live in a
//! [`DocumentStore`], addressed by `(collection, id)`.

mod memory;
mod file;
pub mod document;

pub use memory::MemoryStore;
pub use file::FileStore;
pub use document::{DocumentStore, FileDocumentStore, MemoryDocumentStore};

use crate::error::Result;

/// Device-local persistent string storage. No transactions.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Map a storage key to a safe file stem.
///
/// ASCII letters, digits, `_` and `-` pass through. Every other byte is
/// written as `%XX`, so distinct keys always map to distinct stems and
/// [`unsanitize_key`] recovers the original.
pub(crate) fn sanitize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// Inverse of [`sanitize_key`]. `None` for stems it could not have produced.
pub(crate) fn unsanitize_key(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_key_keeps_safe_chars() {
        assert_eq!(sanitize_key("ofppt_chat_history"), "ofppt_chat_history");
        assert_eq!(sanitize_key("a-b"), "a-b");
    }

    #[test]
    fn test_sanitize_key_escapes_path_separators() {
        assert_eq!(sanitize_key("../etc/passwd"), "%2E%2E%2Fetc%2Fpasswd");
        assert_eq!(sanitize_key("users/42"), "users%2F42");
        assert_eq!(sanitize_key("100%"), "100%25");
    }

    #[test]
    fn test_similar_keys_do_not_collide() {
        assert_ne!(sanitize_key("users/42"), sanitize_key("users_42"));
        assert_ne!(sanitize_key("a.b"), sanitize_key("a_b"));
        assert_ne!(sanitize_key("%2F"), sanitize_key("/"));
    }

    #[test]
    fn test_unsanitize_recovers_key() {
        for key in ["users/42", "users_42", "élève 1", "a.b%c", ""] {
            assert_eq!(unsanitize_key(&sanitize_key(key)).as_deref(), Some(key));
        }
        assert_eq!(unsanitize_key("bad%2"), None);
        assert_eq!(unsanitize_key("bad%zz"), None);
    }
}
