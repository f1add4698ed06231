//! Secret and password hashing.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::AuthError;

/// Bcrypt cost used for account passwords.
pub const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

/// Compute SHA-256 and return it as a lowercase hex string.
///
/// API key secrets are stored in this form.
///
/// # Example
/// ```
/// use xferant_auth::sha256_hex;
///
/// let hash = sha256_hex("secret");
/// assert_eq!(hash.len(), 64);
/// ```
#[inline]
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether `secret` hashes to `stored_hash`, compared in constant time.
#[inline]
pub fn secret_matches(secret: &str, stored_hash: &str) -> bool {
    let computed = sha256_hex(secret);
    computed
        .as_bytes()
        .ct_eq(stored_hash.to_ascii_lowercase().as_bytes())
        .into()
}

/// Hash a password with bcrypt on the blocking pool.
pub async fn hash_password(password: &str) -> Result<String, AuthError> {
    hash_password_with_cost(password, BCRYPT_COST).await
}

pub async fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost).map_err(AuthError::hash))
        .await
        .map_err(AuthError::hash)?
}

/// Check a password against a bcrypt hash on the blocking pool.
pub async fn verify_password_hash(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).map_err(AuthError::hash))
        .await
        .map_err(AuthError::hash)?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        // Known test vector
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let hash = sha256_hex("password");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_secret_matches() {
        let hash = sha256_hex("test123");
        assert!(secret_matches("test123", &hash));
        assert!(secret_matches("test123", &hash.to_ascii_uppercase()));
        assert!(!secret_matches("wrong", &hash));
        assert!(!secret_matches("test123", ""));
        assert!(!secret_matches("test123", &hash[..63]));
    }

    #[tokio::test]
    async fn test_password_round_trip() {
        let hash = hash_password_with_cost("hunter22", 4).await.unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password_hash("hunter22", &hash).await.unwrap());
        assert!(!verify_password_hash("hunter23", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash() {
        let err = verify_password_hash("x", "not-a-bcrypt-hash")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Hash(_)));
    }
}
