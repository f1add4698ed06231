use async_trait::async_trait;
use sqlx::AnyConnection;
use sqlx::any::AnyRow;
use tracing::info;
use xferant_core::{NewUser, User, UserFilter, UserPatch, UserStatus, VpnConfig};

use crate::dialect::DatabaseType;
use crate::error::StoreError;
use crate::record::{Condition, Param, Record, RowReader, now_micros, to_micros};
use crate::store::Store;

/// Flip an active user to expired when the quota is exhausted or the
/// expiration passed. Returns whether the row changed.
pub(crate) async fn apply_expiry(
    conn: &mut AnyConnection,
    db: DatabaseType,
    id: &str,
    now: i64,
) -> Result<bool, StoreError> {
    let sql = db.rewrite(
        "UPDATE users SET status = 'expired', updated_at = ? \
         WHERE id = ? AND status = 'active' \
         AND ((traffic_limit > 0 AND traffic_used >= traffic_limit) \
              OR (expires_at IS NOT NULL AND expires_at <= ?))",
    );
    let result = sqlx::query(&sql)
        .bind(now)
        .bind(id)
        .bind(now)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[async_trait]
impl Record for User {
    const ENTITY: &'static str = "user";
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "email",
        "username",
        "password_hash",
        "status",
        "traffic_limit",
        "traffic_used",
        "expires_at",
        "created_at",
        "updated_at",
    ];
    const UNIQUE: &'static [&'static str] = &["email"];
    const SORTABLE: &'static [&'static str] = &[
        "created_at",
        "updated_at",
        "email",
        "username",
        "traffic_used",
        "expires_at",
    ];
    const TOUCH: Option<&'static str> = Some("updated_at");

    type New = NewUser;
    type Patch = UserPatch;
    type Filter = UserFilter;

    fn from_row(row: &AnyRow) -> Result<Self, StoreError> {
        let r = RowReader::new(row, Self::TABLE);
        Ok(Self {
            id: r.text("id")?,
            email: r.text("email")?,
            username: r.text("username")?,
            password_hash: r.text("password_hash")?,
            status: r.parse("status")?,
            traffic_limit: r.int("traffic_limit")?,
            traffic_used: r.int("traffic_used")?,
            expires_at: r.opt_time("expires_at")?,
            created_at: r.time("created_at")?,
            updated_at: r.time("updated_at")?,
        })
    }

    fn insert_values(new: &NewUser, now: i64) -> Vec<(&'static str, Param)> {
        let over_quota = new.traffic_limit > 0 && new.traffic_used >= new.traffic_limit;
        let time_expired = new.expires_at.is_some_and(|at| to_micros(at) <= now);
        let status = match new.status {
            UserStatus::Active if over_quota || time_expired => UserStatus::Expired,
            status => status,
        };
        vec![
            ("email", new.email.as_str().into()),
            ("username", new.username.as_str().into()),
            ("password_hash", new.password_hash.as_str().into()),
            ("status", status.as_str().into()),
            ("traffic_limit", new.traffic_limit.into()),
            ("traffic_used", new.traffic_used.into()),
            ("expires_at", new.expires_at.into()),
            ("created_at", now.into()),
            ("updated_at", now.into()),
        ]
    }

    fn assignments(patch: &UserPatch, _now: i64) -> Vec<(&'static str, Param)> {
        let mut sets: Vec<(&'static str, Param)> = Vec::new();
        if let Some(v) = &patch.username {
            sets.push(("username", v.as_str().into()));
        }
        if let Some(v) = &patch.password_hash {
            sets.push(("password_hash", v.as_str().into()));
        }
        if let Some(v) = patch.status {
            sets.push(("status", v.as_str().into()));
        }
        if let Some(v) = patch.traffic_limit {
            sets.push(("traffic_limit", v.into()));
        }
        if let Some(v) = patch.expires_at {
            sets.push(("expires_at", v.into()));
        }
        sets
    }

    fn conditions(filter: &UserFilter) -> Vec<Condition> {
        let mut conds = Vec::new();
        if let Some(status) = filter.status {
            conds.push(Condition::Eq("status", status.as_str().into()));
        }
        if let Some(email) = &filter.email {
            conds.push(Condition::Eq("email", email.as_str().into()));
        }
        conds
    }

    async fn after_update(
        conn: &mut AnyConnection,
        db: DatabaseType,
        id: &str,
        now: i64,
    ) -> Result<(), StoreError> {
        if apply_expiry(conn, db, id, now).await? {
            info!(user_id = %id, "user expired after update");
        }
        Ok(())
    }
}

impl Store {
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.find_by::<User>("email", email).await
    }

    /// Delete a user. Its configs are deactivated, never deleted, in the
    /// same transaction; payments are kept for accounting.
    pub async fn delete_user(&self, id: &str) -> Result<(), StoreError> {
        let db = self.database_type();
        let id = id.to_string();
        let now = now_micros();
        self.with_transaction(move |tx| {
            Box::pin(async move {
                let configs = db.rewrite(
                    "UPDATE vpn_configs SET state = 'deactivated', updated_at = ? \
                     WHERE user_id = ? AND state = 'active'",
                );
                let deactivated = sqlx::query(&configs)
                    .bind(now)
                    .bind(id.as_str())
                    .execute(&mut **tx)
                    .await?
                    .rows_affected();

                let delete = db.rewrite("DELETE FROM users WHERE id = ?");
                let result = sqlx::query(&delete)
                    .bind(id.as_str())
                    .execute(&mut **tx)
                    .await?;
                if result.rows_affected() == 0 {
                    return Err(StoreError::not_found(User::ENTITY, id));
                }
                info!(user_id = %id, configs = deactivated, "user deleted");
                Ok(())
            })
        })
        .await
    }

    /// Configs owned by a user, oldest first.
    pub async fn user_configs(&self, user_id: &str) -> Result<Vec<VpnConfig>, StoreError> {
        let filter = xferant_core::VpnConfigFilter {
            user_id: Some(user_id.to_string()),
            ..Default::default()
        };
        self.query::<VpnConfig>(&filter, Default::default())?
            .all()
            .await
    }
}
