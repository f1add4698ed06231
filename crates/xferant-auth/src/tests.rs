//! Tests for credential verification against a SQLite store.

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use xferant_core::errors::PublicKind;
use xferant_core::{ApiKey, ErrorKind, NewUser, Scope, UserStatus};
use xferant_store::{Store, StoreConfig};

use crate::{AuthError, Verifier, hash_password_with_cost, sha256_hex};

async fn setup() -> Verifier<Store> {
    let config = StoreConfig::new("sqlite::memory:").max_open(1).max_idle(1);
    let store = Store::initialize(&config).await.expect("Failed to connect");
    Verifier::new(store).bcrypt_cost(4)
}

// ---------------------------------------------------------------------------
// API keys
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_issue_and_verify() {
    let verifier = setup().await;
    let issued = verifier
        .issue_api_key("billing", Scope::Write, TimeDelta::days(30))
        .await
        .unwrap();
    assert!(issued.key.starts_with("xf_"));

    let scope = verifier
        .verify_api_key(&issued.key, &issued.secret)
        .await
        .unwrap();
    assert_eq!(scope, Scope::Write);

    // Only the hash is persisted.
    let stored: ApiKey = verifier.store().get(&issued.id).await.unwrap();
    assert_eq!(stored.secret_hash, sha256_hex(&issued.secret));
    assert_ne!(stored.secret_hash, issued.secret);
}

#[tokio::test]
async fn test_successful_verify_records_last_use() {
    let verifier = setup().await;
    let issued = verifier
        .issue_api_key("ops", Scope::Read, TimeDelta::days(1))
        .await
        .unwrap();
    verifier
        .verify_api_key(&issued.key, &issued.secret)
        .await
        .unwrap();

    let mut last_used = None;
    for _ in 0..50 {
        let key: ApiKey = verifier.store().get(&issued.id).await.unwrap();
        if key.last_used_at.is_some() {
            last_used = key.last_used_at;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(last_used.is_some());
}

#[tokio::test]
async fn test_unknown_key_and_wrong_secret_look_alike() {
    let verifier = setup().await;
    let issued = verifier
        .issue_api_key("billing", Scope::Admin, TimeDelta::days(30))
        .await
        .unwrap();

    let wrong = verifier
        .verify_api_key(&issued.key, "not-the-secret")
        .await
        .unwrap_err();
    let unknown = verifier
        .verify_api_key("xf_doesnotexist", &issued.secret)
        .await
        .unwrap_err();
    assert!(matches!(wrong, AuthError::InvalidKey));
    assert!(matches!(unknown, AuthError::InvalidKey));
    assert_eq!(wrong.to_string(), unknown.to_string());
    assert_eq!(wrong.kind().public_kind(), PublicKind::Unauthorized);

    let key: ApiKey = verifier.store().get(&issued.id).await.unwrap();
    assert_eq!(key.last_used_at, None);
}

#[tokio::test]
async fn test_revoked_and_deactivated_keys_fail() {
    let verifier = setup().await;
    let revoked = verifier
        .issue_api_key("a", Scope::Read, TimeDelta::days(30))
        .await
        .unwrap();
    let deactivated = verifier
        .issue_api_key("b", Scope::Read, TimeDelta::days(30))
        .await
        .unwrap();
    verifier.store().revoke_api_key(&revoked.id).await.unwrap();
    verifier
        .store()
        .deactivate_api_key(&deactivated.id)
        .await
        .unwrap();

    for issued in [&revoked, &deactivated] {
        let err = verifier
            .verify_api_key(&issued.key, &issued.secret)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Revoked);
    }

    // A wrong secret reveals nothing about the state.
    let err = verifier
        .verify_api_key(&revoked.key, "guess")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidKey);
}

#[tokio::test]
async fn test_expired_key_fails() {
    let verifier = setup().await;
    let now = Utc::now();
    let issued = verifier
        .issue_api_key_at("short", Scope::Read, TimeDelta::hours(1), now)
        .await
        .unwrap();

    let scope = verifier
        .verify_api_key_at(&issued.key, &issued.secret, now + TimeDelta::minutes(59))
        .await
        .unwrap();
    assert_eq!(scope, Scope::Read);

    let err = verifier
        .verify_api_key_at(&issued.key, &issued.secret, issued.expires_at)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExpiredKey);
}

#[tokio::test]
async fn test_issue_requires_positive_ttl() {
    let verifier = setup().await;
    let err = verifier
        .issue_api_key("never", Scope::Read, TimeDelta::zero())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Store(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

// ---------------------------------------------------------------------------
// Passwords
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_register_and_verify_password() {
    let verifier = setup().await;
    let id = verifier
        .register_user("alice@example.com", "alice", "correct horse")
        .await
        .unwrap();

    let user = verifier
        .verify_password(&id, "correct horse")
        .await
        .unwrap();
    assert_eq!(user.email, "alice@example.com");
    assert_ne!(user.password_hash, "correct horse");

    let err = verifier
        .verify_password(&id, "battery staple")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);

    let err = verifier
        .verify_password("missing", "correct horse")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCredentials);
}

#[tokio::test]
async fn test_suspended_account_checked_before_password() {
    let verifier = setup().await;
    let hash = hash_password_with_cost("pw", 4).await.unwrap();
    let id = verifier
        .store()
        .create::<xferant_core::User>(
            NewUser::new("s@example.com", "s", hash).status(UserStatus::Suspended),
        )
        .await
        .unwrap();

    for password in ["pw", "wrong"] {
        let err = verifier.verify_password(&id, password).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccountSuspended);
    }
}

#[tokio::test]
async fn test_time_expired_account_is_refused() {
    let verifier = setup().await;
    let now = Utc::now();
    let hash = hash_password_with_cost("pw", 4).await.unwrap();
    let id = verifier
        .store()
        .create::<xferant_core::User>(
            NewUser::new("t@example.com", "t", hash).expires_at(now + TimeDelta::days(1)),
        )
        .await
        .unwrap();

    verifier.verify_password_at(&id, "pw", now).await.unwrap();
    let err = verifier
        .verify_password_at(&id, "pw", now + TimeDelta::days(2))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccountSuspended);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let verifier = setup().await;
    verifier
        .register_user("dup@example.com", "a", "pw")
        .await
        .unwrap();
    let err = verifier
        .register_user("dup@example.com", "b", "pw")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}
