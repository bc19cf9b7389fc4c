//! Identifier mint (C1)
//!
//! Produces opaque, prefixed identifiers from the URL-safe base64 alphabet
//! `[A-Za-z0-9_-]` and hashes API keys with SHA-256. IDs are not meant to be
//! parsed for structure beyond their prefix; the prefix exists purely so a log
//! line or error message tells a reader what kind of thing they're looking at.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

fn random_url_safe(chars: usize) -> String {
    // base64 yields 4 chars per 3 bytes; over-allocate then truncate so the
    // output length is exact regardless of padding behavior.
    let byte_len = chars.div_ceil(4) * 3;
    let mut bytes = vec![0u8; byte_len];
    rand::thread_rng().fill_bytes(&mut bytes);
    let encoded = URL_SAFE_NO_PAD.encode(bytes);
    encoded.chars().take(chars).collect()
}

/// Mint a new `agent-` prefixed identifier.
pub fn new_agent_id() -> String {
    format!("agent-{}", random_url_safe(12))
}

/// Mint a new `policy-` prefixed identifier.
pub fn new_policy_id() -> String {
    format!("policy-{}", random_url_safe(12))
}

/// Mint a new `rule-` prefixed identifier.
pub fn new_rule_id() -> String {
    format!("rule-{}", random_url_safe(12))
}

/// Mint a new `mnd-` prefixed mandate identifier.
pub fn new_mandate_id() -> String {
    format!("mnd-{}", random_url_safe(12))
}

/// Mint a new `sk-` prefixed API key. Returned to the caller exactly once;
/// only [`hash_api_key`]'s output is ever persisted.
pub fn new_api_key() -> String {
    format!("sk-{}", random_url_safe(32))
}

/// Hash an API key to its storage form: 64 lowercase hex characters.
pub fn hash_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_the_right_prefix_and_length() {
        assert!(new_agent_id().starts_with("agent-"));
        assert_eq!(new_agent_id().len(), "agent-".len() + 12);
        assert!(new_policy_id().starts_with("policy-"));
        assert!(new_rule_id().starts_with("rule-"));
        assert!(new_mandate_id().starts_with("mnd-"));
        let key = new_api_key();
        assert!(key.starts_with("sk-"));
        assert_eq!(key.len(), "sk-".len() + 32);
    }

    #[test]
    fn ids_use_only_the_url_safe_alphabet() {
        let id = new_mandate_id();
        let body = id.strip_prefix("mnd-").unwrap();
        assert!(body
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    }

    #[test]
    fn ids_are_not_trivially_repeated() {
        let a = new_agent_id();
        let b = new_agent_id();
        assert_ne!(a, b);
    }

    #[test]
    fn api_key_hash_is_deterministic_and_hex() {
        let h1 = hash_api_key("sk-abc123");
        let h2 = hash_api_key("sk-abc123");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert!(h1.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn api_key_hash_differs_for_different_keys() {
        assert_ne!(hash_api_key("sk-one"), hash_api_key("sk-two"));
    }
}
