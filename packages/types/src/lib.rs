//! Shared primitives for the Bloom backend crates.
//!
//! Deliberately thin: error/result aliases, JSON value re-exports and
//! collision-resistant ID generation. Anything domain-specific lives in the
//! consuming crates.

pub use anyhow::{Error, Result, anyhow, bail};
pub use serde_json::{Value, json};

/// Generates a new collision-resistant, URL-safe identifier.
///
/// All primary keys in the system are cuid2 strings; they sort roughly by
/// creation time and are safe to expose in URLs and event payloads.
pub fn create_id() -> String {
    cuid2::create_id()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_id_is_url_safe() {
        let id = create_id();
        assert!(!id.is_empty());
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_create_id_unique_across_calls() {
        let a = create_id();
        let b = create_id();
        assert_ne!(a, b);
    }
}
