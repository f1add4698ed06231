use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults::DEFAULT_TRAFFIC_LIMIT_BYTES;
use crate::validate::{self, FieldError, Validate, string_enum};

string_enum! {
    /// Account status.
    UserStatus ("status") {
        Active => "active",
        Suspended => "suspended",
        /// Quota exhausted or expiration passed.
        Expired => "expired",
    }
}

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub status: UserStatus,
    /// Quota in bytes (0 = unlimited).
    pub traffic_limit: i64,
    /// Bytes consumed since the last reset.
    pub traffic_used: i64,
    /// Account expiration (`None` = never).
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether consumption reached a non-zero quota.
    #[inline]
    pub fn is_over_quota(&self) -> bool {
        self.traffic_limit > 0 && self.traffic_used >= self.traffic_limit
    }

    /// Whether the account expiration has passed at `now`.
    #[inline]
    pub fn is_time_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Status as readers should see it at `now`.
    ///
    /// An account still stored as `active` is reported `expired` once its
    /// expiration passed or its quota is exhausted, even before a sweep or a
    /// usage report persisted the transition.
    pub fn effective_status(&self, now: DateTime<Utc>) -> UserStatus {
        match self.status {
            UserStatus::Active if self.is_time_expired(now) || self.is_over_quota() => {
                UserStatus::Expired
            }
            status => status,
        }
    }

    /// Bytes left before the quota is reached (`None` = unlimited).
    pub fn remaining_traffic(&self) -> Option<i64> {
        (self.traffic_limit > 0).then(|| (self.traffic_limit - self.traffic_used).max(0))
    }
}

/// Input for creating a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub status: UserStatus,
    pub traffic_limit: i64,
    pub traffic_used: i64,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewUser {
    /// An active user with the default 1 GiB quota and no expiration.
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            password_hash: password_hash.into(),
            status: UserStatus::Active,
            traffic_limit: DEFAULT_TRAFFIC_LIMIT_BYTES,
            traffic_used: 0,
            expires_at: None,
        }
    }

    pub fn traffic_limit(mut self, bytes: i64) -> Self {
        self.traffic_limit = bytes;
        self
    }

    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    pub fn status(mut self, status: UserStatus) -> Self {
        self.status = status;
        self
    }
}

impl Validate for NewUser {
    fn validate(&self) -> Result<(), FieldError> {
        validate::email("email", &self.email)?;
        validate::non_empty("username", &self.username)?;
        validate::non_empty("password_hash", &self.password_hash)?;
        validate::non_negative("traffic_limit", self.traffic_limit)?;
        validate::non_negative("traffic_used", self.traffic_used)?;
        Ok(())
    }
}

/// Changes to a user. Email is immutable and usage only moves through
/// traffic accounting, so neither appears here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub status: Option<UserStatus>,
    pub traffic_limit: Option<i64>,
    /// `Some(None)` clears the expiration.
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl Validate for UserPatch {
    fn validate(&self) -> Result<(), FieldError> {
        if let Some(username) = &self.username {
            validate::non_empty("username", username)?;
        }
        if let Some(hash) = &self.password_hash {
            validate::non_empty("password_hash", hash)?;
        }
        if let Some(limit) = self.traffic_limit {
            validate::non_negative("traffic_limit", limit)?;
        }
        Ok(())
    }
}

/// Criteria for listing users. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub status: Option<UserStatus>,
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn user(limit: i64, used: i64) -> User {
        let now = Utc::now();
        User {
            id: "u1".into(),
            email: "a@example.com".into(),
            username: "alice".into(),
            password_hash: "hash".into(),
            status: UserStatus::Active,
            traffic_limit: limit,
            traffic_used: used,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn new_user_defaults() {
        let u = NewUser::new("a@example.com", "alice", "hash");
        assert_eq!(u.status, UserStatus::Active);
        assert_eq!(u.traffic_limit, 1_073_741_824);
        assert_eq!(u.traffic_used, 0);
        u.validate().unwrap();
    }

    #[test]
    fn new_user_rejects_bad_fields() {
        let base = NewUser::new("a@example.com", "alice", "hash");

        let mut u = base.clone();
        u.username = "  ".into();
        assert_eq!(u.validate().unwrap_err().field, "username");

        let u = base.clone().traffic_limit(-1);
        assert_eq!(u.validate().unwrap_err().field, "traffic_limit");

        let mut u = base.clone();
        u.traffic_used = -5;
        assert_eq!(u.validate().unwrap_err().field, "traffic_used");

        let mut u = base;
        u.email = "not-an-email".into();
        assert_eq!(u.validate().unwrap_err().field, "email");
    }

    #[test]
    fn quota_zero_is_unlimited() {
        let u = user(0, 10_000_000);
        assert!(!u.is_over_quota());
        assert_eq!(u.remaining_traffic(), None);
        assert_eq!(u.effective_status(Utc::now()), UserStatus::Active);
    }

    #[test]
    fn effective_status_reflects_quota_and_time() {
        let now = Utc::now();
        assert_eq!(user(100, 100).effective_status(now), UserStatus::Expired);
        assert_eq!(user(100, 99).effective_status(now), UserStatus::Active);

        let mut u = user(0, 0);
        u.expires_at = Some(now - Duration::seconds(1));
        assert_eq!(u.effective_status(now), UserStatus::Expired);

        u.status = UserStatus::Suspended;
        assert_eq!(u.effective_status(now), UserStatus::Suspended);
    }

    #[test]
    fn patch_validation() {
        assert!(UserPatch::default().is_empty());
        let patch = UserPatch {
            traffic_limit: Some(-1),
            ..Default::default()
        };
        assert_eq!(patch.validate().unwrap_err().field, "traffic_limit");
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let json = serde_json::to_string(&user(0, 0)).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(json.contains("\"status\":\"active\""));
    }
}
