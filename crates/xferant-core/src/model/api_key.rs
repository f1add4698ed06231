use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Lifecycle;
use crate::defaults::{MAX_API_KEY_LEN, SECRET_HASH_LEN};
use crate::validate::{self, FieldError, Validate, string_enum};

string_enum! {
    /// Permission class granted by an API key. Ordered: admin ⊃ write ⊃ read.
    Scope ("scope") {
        Read => "read",
        Write => "write",
        Admin => "admin",
    }
}

impl Scope {
    fn rank(self) -> u8 {
        match self {
            Self::Read => 0,
            Self::Write => 1,
            Self::Admin => 2,
        }
    }

    /// Whether a key with this scope may perform an operation needing `required`.
    pub fn allows(self, required: Scope) -> bool {
        self.rank() >= required.rank()
    }
}

/// A stored API key. The secret itself is never kept, only its hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: String,
    pub name: String,
    /// Public identifier presented with every request. Immutable.
    pub key: String,
    #[serde(skip_serializing, default)]
    pub secret_hash: String,
    pub scope: Scope,
    pub state: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// A key is usable iff it is active and not yet expired.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.state.is_active() && now < self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApiKey {
    pub name: String,
    pub key: String,
    /// Hex SHA-256 of the secret.
    pub secret_hash: String,
    pub scope: Scope,
    pub expires_at: DateTime<Utc>,
}

impl Validate for NewApiKey {
    fn validate(&self) -> Result<(), FieldError> {
        validate::non_empty("name", &self.name)?;
        validate::non_empty("key", &self.key)?;
        if self.key.len() > MAX_API_KEY_LEN || self.key.chars().any(char::is_whitespace) {
            return Err(FieldError::new(
                "key",
                format!("must be at most {MAX_API_KEY_LEN} characters without whitespace"),
            ));
        }
        if self.secret_hash.len() != SECRET_HASH_LEN
            || !self.secret_hash.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(FieldError::new("secret_hash", "must be a hex SHA-256 digest"));
        }
        Ok(())
    }
}

/// Changes to a key. `key` and the secret are immutable; state moves through
/// revoke/deactivate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiKeyPatch {
    pub name: Option<String>,
    pub scope: Option<Scope>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Validate for ApiKeyPatch {
    fn validate(&self) -> Result<(), FieldError> {
        if let Some(name) = &self.name {
            validate::non_empty("name", name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiKeyFilter {
    pub scope: Option<Scope>,
    pub state: Option<Lifecycle>,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn new_key() -> NewApiKey {
        NewApiKey {
            name: "billing".into(),
            key: "xf_abc".into(),
            secret_hash: "a".repeat(64),
            scope: Scope::Write,
            expires_at: Utc::now() + Duration::days(30),
        }
    }

    #[test]
    fn scope_ordering() {
        assert!(Scope::Admin.allows(Scope::Read));
        assert!(Scope::Admin.allows(Scope::Admin));
        assert!(Scope::Write.allows(Scope::Read));
        assert!(!Scope::Write.allows(Scope::Admin));
        assert!(!Scope::Read.allows(Scope::Write));
    }

    #[test]
    fn new_key_validation() {
        new_key().validate().unwrap();

        let mut k = new_key();
        k.secret_hash = "plaintext-secret".into();
        assert_eq!(k.validate().unwrap_err().field, "secret_hash");

        let mut k = new_key();
        k.key = "has space".into();
        assert_eq!(k.validate().unwrap_err().field, "key");

        let mut k = new_key();
        k.name = String::new();
        assert_eq!(k.validate().unwrap_err().field, "name");
    }

    #[test]
    fn usability_needs_active_and_unexpired() {
        let now = Utc::now();
        let mut key = ApiKey {
            id: "k1".into(),
            name: "n".into(),
            key: "xf_1".into(),
            secret_hash: "a".repeat(64),
            scope: Scope::Read,
            state: Lifecycle::Active,
            created_at: now,
            expires_at: now + Duration::hours(1),
            last_used_at: None,
        };
        assert!(key.is_usable_at(now));
        assert!(!key.is_usable_at(now + Duration::hours(1)));

        key.state = Lifecycle::Revoked;
        assert!(!key.is_usable_at(now));
    }
}
