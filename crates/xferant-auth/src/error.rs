//! Authentication error types.

use xferant_core::ErrorKind;
use xferant_store::StoreError;

/// Authentication error.
///
/// The five credential variants are distinct internally; callers exposing
/// them should go through [`ErrorKind::public_kind`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown key or wrong secret.
    #[error("invalid API key")]
    InvalidKey,

    #[error("API key expired")]
    ExpiredKey,

    /// Key deactivated or revoked.
    #[error("API key revoked")]
    Revoked,

    /// Unknown account or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account suspended")]
    AccountSuspended,

    /// Password hashing failed or a stored hash is malformed.
    #[error("hash error: {0}")]
    Hash(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Create a hash error from any error type.
    #[inline]
    pub fn hash<E: std::fmt::Display>(err: E) -> Self {
        Self::Hash(err.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidKey => ErrorKind::InvalidKey,
            Self::ExpiredKey => ErrorKind::ExpiredKey,
            Self::Revoked => ErrorKind::Revoked,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::AccountSuspended => ErrorKind::AccountSuspended,
            Self::Hash(_) => ErrorKind::Internal,
            Self::Store(err) => err.kind(),
        }
    }
}
