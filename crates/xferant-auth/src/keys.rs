//! API key generation.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use xferant_core::Scope;
use xferant_core::defaults::{API_KEY_PREFIX, API_KEY_RANDOM_LEN, API_SECRET_LEN};

/// A freshly issued key. `secret` is shown once and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedKey {
    pub id: String,
    pub key: String,
    pub secret: String,
    pub scope: Scope,
    pub expires_at: DateTime<Utc>,
}

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generate a public key identifier (`xf_` followed by random characters).
pub fn generate_key() -> String {
    format!("{API_KEY_PREFIX}{}", random_alphanumeric(API_KEY_RANDOM_LEN))
}

/// Generate a key secret.
pub fn generate_secret() -> String {
    random_alphanumeric(API_SECRET_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_shape() {
        let key = generate_key();
        assert!(key.starts_with("xf_"));
        assert_eq!(key.len(), 3 + API_KEY_RANDOM_LEN);
        assert!(key[3..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn secrets_differ() {
        let a = generate_secret();
        let b = generate_secret();
        assert_eq!(a.len(), API_SECRET_LEN);
        assert_ne!(a, b);
    }
}
