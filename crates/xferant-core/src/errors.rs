//! Error taxonomy shared by every crate.
//!
//! Each crate keeps its own `thiserror` enum and exposes a `kind()` method
//! returning one of these variants, so the API layer can translate failures
//! into status codes without matching on crate-specific types.

use std::fmt;

/// Classification of a failure surfaced by a core operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input; the caller can fix it and retry.
    Validation,
    /// Uniqueness violation; the caller can choose a different value.
    Conflict,
    /// Referenced entity is absent.
    NotFound,
    /// Storage unreachable. Fatal at startup, retryable by the caller later.
    Connection,
    /// API key matched but its expiration passed.
    ExpiredKey,
    /// API key matched but is no longer active.
    Revoked,
    /// Unknown API key or wrong secret.
    InvalidKey,
    /// Wrong account password or unknown account.
    InvalidCredentials,
    /// Account is not active.
    AccountSuspended,
    /// Server selection found nothing. Expected, not a fault.
    NoAvailableServer,
    /// Anything else (driver errors, corrupted rows).
    Internal,
}

impl ErrorKind {
    /// Whether this kind belongs to the authentication domain.
    pub fn is_auth_failure(self) -> bool {
        matches!(
            self,
            Self::ExpiredKey
                | Self::Revoked
                | Self::InvalidKey
                | Self::InvalidCredentials
                | Self::AccountSuspended
        )
    }

    /// The kind that may be shown outside the service.
    ///
    /// Authentication failures collapse into [`PublicKind::Unauthorized`] so
    /// responses never reveal whether a key was unknown, the secret was
    /// wrong, or the key was revoked.
    pub fn public_kind(self) -> PublicKind {
        match self {
            Self::Validation => PublicKind::BadRequest,
            Self::Conflict => PublicKind::Conflict,
            Self::NotFound => PublicKind::NotFound,
            Self::NoAvailableServer => PublicKind::Unavailable,
            Self::Connection | Self::Internal => PublicKind::Internal,
            Self::ExpiredKey
            | Self::Revoked
            | Self::InvalidKey
            | Self::InvalidCredentials
            | Self::AccountSuspended => PublicKind::Unauthorized,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::Connection => "connection",
            Self::ExpiredKey => "expired_key",
            Self::Revoked => "revoked",
            Self::InvalidKey => "invalid_key",
            Self::InvalidCredentials => "invalid_credentials",
            Self::AccountSuspended => "account_suspended",
            Self::NoAvailableServer => "no_available_server",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Externally visible error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PublicKind {
    BadRequest,
    Unauthorized,
    NotFound,
    Conflict,
    Unavailable,
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_are_indistinguishable_publicly() {
        let auth = [
            ErrorKind::ExpiredKey,
            ErrorKind::Revoked,
            ErrorKind::InvalidKey,
            ErrorKind::InvalidCredentials,
            ErrorKind::AccountSuspended,
        ];
        for kind in auth {
            assert!(kind.is_auth_failure());
            assert_eq!(kind.public_kind(), PublicKind::Unauthorized);
        }
    }

    #[test]
    fn no_available_server_is_not_internal() {
        assert_eq!(
            ErrorKind::NoAvailableServer.public_kind(),
            PublicKind::Unavailable
        );
        assert!(!ErrorKind::NoAvailableServer.is_auth_failure());
    }
}
