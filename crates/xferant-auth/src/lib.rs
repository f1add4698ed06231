//! Credential verification for xferant.
//!
//! This crate verifies API keys (SHA-256 hashed secrets, compared in
//! constant time) and account passwords (bcrypt), and issues new keys.
//!
//! # Example
//!
//! ```
//! use xferant_auth::{secret_matches, sha256_hex};
//!
//! let stored = sha256_hex("my_secret");
//! assert!(secret_matches("my_secret", &stored));
//! assert!(!secret_matches("guess", &stored));
//! ```

mod error;
mod hash;
mod keys;
mod traits;
mod verifier;

#[cfg(test)]
mod tests;

pub use error::AuthError;
pub use hash::{
    BCRYPT_COST, hash_password, hash_password_with_cost, secret_matches, sha256_hex,
    verify_password_hash,
};
pub use keys::{IssuedKey, generate_key, generate_secret};
pub use traits::CredentialStore;
pub use verifier::Verifier;
