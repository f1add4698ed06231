//! Credential storage trait.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use xferant_core::{ApiKey, NewApiKey, NewUser, User};
use xferant_store::{Store, StoreError};

/// Storage the verifier reads credentials from.
///
/// Implementations must be thread-safe (`Send + Sync`) as they may be
/// called concurrently from multiple requests.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a key by its public identifier.
    async fn find_api_key(&self, key: &str) -> Result<Option<ApiKey>, StoreError>;

    /// Record a successful use of a key.
    async fn touch_api_key(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn create_api_key(&self, new: NewApiKey) -> Result<String, StoreError>;

    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn create_user(&self, new: NewUser) -> Result<String, StoreError>;
}

#[async_trait]
impl CredentialStore for Store {
    async fn find_api_key(&self, key: &str) -> Result<Option<ApiKey>, StoreError> {
        self.find_api_key_by_key(key).await
    }

    async fn touch_api_key(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        Store::touch_api_key(self, id, at).await
    }

    async fn create_api_key(&self, new: NewApiKey) -> Result<String, StoreError> {
        self.create::<ApiKey>(new).await
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.find::<User>(id).await
    }

    async fn create_user(&self, new: NewUser) -> Result<String, StoreError> {
        self.create::<User>(new).await
    }
}

/// Blanket implementation for `Arc<S>` where `S: CredentialStore`.
#[async_trait]
impl<S: CredentialStore + ?Sized> CredentialStore for Arc<S> {
    #[inline]
    async fn find_api_key(&self, key: &str) -> Result<Option<ApiKey>, StoreError> {
        (**self).find_api_key(key).await
    }

    #[inline]
    async fn touch_api_key(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        (**self).touch_api_key(id, at).await
    }

    #[inline]
    async fn create_api_key(&self, new: NewApiKey) -> Result<String, StoreError> {
        (**self).create_api_key(new).await
    }

    #[inline]
    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        (**self).find_user(id).await
    }

    #[inline]
    async fn create_user(&self, new: NewUser) -> Result<String, StoreError> {
        (**self).create_user(new).await
    }
}
