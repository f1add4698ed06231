use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::AnyConnection;
use sqlx::any::AnyRow;
use xferant_core::{ApiKey, ApiKeyFilter, ApiKeyPatch, FieldError, Lifecycle, NewApiKey};

use crate::dialect::DatabaseType;
use crate::error::StoreError;
use crate::record::{Condition, Param, Record, RowReader, to_micros};
use crate::store::Store;

#[async_trait]
impl Record for ApiKey {
    const ENTITY: &'static str = "api_key";
    const TABLE: &'static str = "api_keys";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "key",
        "secret_hash",
        "scope",
        "state",
        "created_at",
        "expires_at",
        "last_used_at",
    ];
    const UNIQUE: &'static [&'static str] = &["key"];
    const SORTABLE: &'static [&'static str] = &["created_at", "expires_at", "last_used_at", "name"];

    type New = NewApiKey;
    type Patch = ApiKeyPatch;
    type Filter = ApiKeyFilter;

    fn from_row(row: &AnyRow) -> Result<Self, StoreError> {
        let r = RowReader::new(row, Self::TABLE);
        Ok(Self {
            id: r.text("id")?,
            name: r.text("name")?,
            key: r.text("key")?,
            secret_hash: r.text("secret_hash")?,
            scope: r.parse("scope")?,
            state: r.parse("state")?,
            created_at: r.time("created_at")?,
            expires_at: r.time("expires_at")?,
            last_used_at: r.opt_time("last_used_at")?,
        })
    }

    fn insert_values(new: &NewApiKey, now: i64) -> Vec<(&'static str, Param)> {
        vec![
            ("name", new.name.as_str().into()),
            ("key", new.key.as_str().into()),
            ("secret_hash", new.secret_hash.to_ascii_lowercase().into()),
            ("scope", new.scope.as_str().into()),
            ("state", Lifecycle::Active.as_str().into()),
            ("created_at", now.into()),
            ("expires_at", new.expires_at.into()),
            ("last_used_at", Param::NullableInt(None)),
        ]
    }

    fn assignments(patch: &ApiKeyPatch, _now: i64) -> Vec<(&'static str, Param)> {
        let mut sets: Vec<(&'static str, Param)> = Vec::new();
        if let Some(v) = &patch.name {
            sets.push(("name", v.as_str().into()));
        }
        if let Some(v) = patch.scope {
            sets.push(("scope", v.as_str().into()));
        }
        if let Some(v) = patch.expires_at {
            sets.push(("expires_at", v.into()));
        }
        sets
    }

    fn conditions(filter: &ApiKeyFilter) -> Vec<Condition> {
        let mut conds = Vec::new();
        if let Some(scope) = filter.scope {
            conds.push(Condition::Eq("scope", scope.as_str().into()));
        }
        if let Some(state) = filter.state {
            conds.push(Condition::Eq("state", state.as_str().into()));
        }
        conds
    }

    /// A key must expire after it is created.
    async fn before_insert(
        _conn: &mut AnyConnection,
        _db: DatabaseType,
        new: &NewApiKey,
        now: i64,
    ) -> Result<(), StoreError> {
        if to_micros(new.expires_at) <= now {
            return Err(FieldError::new("expires_at", "must be in the future").into());
        }
        Ok(())
    }
}

impl Store {
    /// Look up a key by its public identifier.
    pub async fn find_api_key_by_key(&self, key: &str) -> Result<Option<ApiKey>, StoreError> {
        self.find_by::<ApiKey>("key", key).await
    }

    pub async fn revoke_api_key(&self, id: &str) -> Result<(), StoreError> {
        self.transition_state(ApiKey::TABLE, ApiKey::ENTITY, id, Lifecycle::Revoked)
            .await
    }

    pub async fn deactivate_api_key(&self, id: &str) -> Result<(), StoreError> {
        self.transition_state(ApiKey::TABLE, ApiKey::ENTITY, id, Lifecycle::Deactivated)
            .await
    }

    /// Record a successful use of a key.
    pub async fn touch_api_key(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        let sql = self.sql("UPDATE api_keys SET last_used_at = ? WHERE id = ?");
        let result = sqlx::query(&sql)
            .bind(to_micros(at))
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(ApiKey::ENTITY, id));
        }
        Ok(())
    }
}
