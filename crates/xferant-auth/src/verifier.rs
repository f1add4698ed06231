//! Credential verification.

use std::hint::black_box;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use xferant_core::{NewApiKey, NewUser, Scope, User, UserStatus};

use crate::error::AuthError;
use crate::hash::{BCRYPT_COST, hash_password_with_cost, secret_matches, sha256_hex, verify_password_hash};
use crate::keys::{IssuedKey, generate_key, generate_secret};
use crate::traits::CredentialStore;

/// Compared against when the key is unknown, so lookups for missing keys
/// cost the same as for wrong secrets.
const DUMMY_SECRET_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Hashed once per verifier and checked when the user is unknown.
const DUMMY_PASSWORD: &str = "xferant-unknown-user";

/// Verifies API keys and account passwords against a [`CredentialStore`].
///
/// # Example
///
/// ```ignore
/// use xferant_auth::Verifier;
///
/// let verifier = Verifier::new(store.clone());
/// let issued = verifier.issue_api_key("billing", Scope::Write, TimeDelta::days(90)).await?;
/// let scope = verifier.verify_api_key(&issued.key, &issued.secret).await?;
/// ```
pub struct Verifier<S> {
    store: Arc<S>,
    bcrypt_cost: u32,
    dummy_password_hash: Arc<OnceCell<String>>,
}

impl<S> Clone for Verifier<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            bcrypt_cost: self.bcrypt_cost,
            dummy_password_hash: Arc::clone(&self.dummy_password_hash),
        }
    }
}

impl<S: CredentialStore + 'static> Verifier<S> {
    pub fn new(store: S) -> Self {
        Self::from_arc(Arc::new(store))
    }

    pub fn from_arc(store: Arc<S>) -> Self {
        Self {
            store,
            bcrypt_cost: BCRYPT_COST,
            dummy_password_hash: Arc::default(),
        }
    }

    /// Override the bcrypt cost used for new password hashes.
    pub fn bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self.dummy_password_hash = Arc::default();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Verify a key/secret pair and return the key's scope.
    ///
    /// On success the key's last use is recorded in the background; a
    /// failure there is logged and does not affect the result.
    pub async fn verify_api_key(&self, key: &str, secret: &str) -> Result<Scope, AuthError> {
        self.verify_api_key_at(key, secret, Utc::now()).await
    }

    pub async fn verify_api_key_at(
        &self,
        key: &str,
        secret: &str,
        now: DateTime<Utc>,
    ) -> Result<Scope, AuthError> {
        let Some(api_key) = self.store.find_api_key(key).await? else {
            black_box(secret_matches(secret, DUMMY_SECRET_HASH));
            debug!("unknown API key");
            return Err(AuthError::InvalidKey);
        };

        // Only holders of the secret learn anything about the key's state.
        if !secret_matches(secret, &api_key.secret_hash) {
            debug!(key_id = %api_key.id, "API key secret mismatch");
            return Err(AuthError::InvalidKey);
        }
        if !api_key.state.is_active() {
            return Err(AuthError::Revoked);
        }
        if now >= api_key.expires_at {
            return Err(AuthError::ExpiredKey);
        }

        let store = Arc::clone(&self.store);
        let id = api_key.id;
        tokio::spawn(async move {
            if let Err(e) = store.touch_api_key(&id, now).await {
                warn!(key_id = %id, error = %e, "failed to record API key use");
            }
        });
        Ok(api_key.scope)
    }

    /// Verify an account password.
    ///
    /// The account status is checked before the password: a suspended or
    /// expired account fails with [`AuthError::AccountSuspended`] whatever
    /// password was supplied. An unknown user still costs one bcrypt check.
    pub async fn verify_password(&self, user_id: &str, password: &str) -> Result<User, AuthError> {
        self.verify_password_at(user_id, password, Utc::now()).await
    }

    pub async fn verify_password_at(
        &self,
        user_id: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<User, AuthError> {
        let Some(user) = self.store.find_user(user_id).await? else {
            let dummy = self.dummy_password_hash().await?;
            black_box(verify_password_hash(password, dummy).await?);
            debug!("unknown user");
            return Err(AuthError::InvalidCredentials);
        };
        if user.effective_status(now) != UserStatus::Active {
            return Err(AuthError::AccountSuspended);
        }
        if !verify_password_hash(password, &user.password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    }

    /// Issue a new API key valid for `ttl`.
    ///
    /// Only the secret's hash is stored; the returned [`IssuedKey`] is the
    /// only place the plaintext secret appears.
    pub async fn issue_api_key(
        &self,
        name: &str,
        scope: Scope,
        ttl: TimeDelta,
    ) -> Result<IssuedKey, AuthError> {
        self.issue_api_key_at(name, scope, ttl, Utc::now()).await
    }

    pub async fn issue_api_key_at(
        &self,
        name: &str,
        scope: Scope,
        ttl: TimeDelta,
        now: DateTime<Utc>,
    ) -> Result<IssuedKey, AuthError> {
        let key = generate_key();
        let secret = generate_secret();
        let expires_at = now + ttl;
        let id = self
            .store
            .create_api_key(NewApiKey {
                name: name.to_string(),
                key: key.clone(),
                secret_hash: sha256_hex(&secret),
                scope,
                expires_at,
            })
            .await?;
        info!(key_id = %id, name, scope = %scope, "API key issued");
        Ok(IssuedKey {
            id,
            key,
            secret,
            scope,
            expires_at,
        })
    }

    /// Build a [`NewUser`] with a bcrypt hash of `password`.
    pub async fn new_user(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<NewUser, AuthError> {
        let hash = hash_password_with_cost(password, self.bcrypt_cost).await?;
        Ok(NewUser::new(email, username, hash))
    }

    /// Create an account with the default quota. Returns the user id.
    pub async fn register_user(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<String, AuthError> {
        let new = self.new_user(email, username, password).await?;
        Ok(self.store.create_user(new).await?)
    }

    async fn dummy_password_hash(&self) -> Result<&str, AuthError> {
        self.dummy_password_hash
            .get_or_try_init(|| hash_password_with_cost(DUMMY_PASSWORD, self.bcrypt_cost))
            .await
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use xferant_store::{Store, StoreConfig};

    use super::*;

    #[tokio::test]
    async fn unknown_user_is_checked_against_dummy_hash() {
        let config = StoreConfig::new("sqlite::memory:").max_open(1).max_idle(1);
        let store = Store::initialize(&config).await.unwrap();
        let verifier = Verifier::new(store).bcrypt_cost(4);
        assert!(verifier.dummy_password_hash.get().is_none());

        let err = verifier.verify_password("missing", "pw").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        // Same cost as real hashes, computed once and shared by clones.
        let dummy = verifier.dummy_password_hash.get().unwrap().clone();
        assert!(dummy.starts_with("$2b$04$"));
        let clone = verifier.clone();
        assert!(clone.verify_password("missing", "other").await.is_err());
        assert_eq!(clone.dummy_password_hash.get(), Some(&dummy));
    }
}
