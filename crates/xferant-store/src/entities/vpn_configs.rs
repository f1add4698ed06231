use async_trait::async_trait;
use sqlx::AnyConnection;
use sqlx::any::AnyRow;
use tracing::debug;
use xferant_core::{
    Lifecycle, NewVpnConfig, Protocol, VpnConfig, VpnConfigFilter, VpnConfigPatch,
};

use super::require_user;
use crate::dialect::DatabaseType;
use crate::error::StoreError;
use crate::record::{Condition, Param, Record, RowReader};
use crate::store::Store;

#[async_trait]
impl Record for VpnConfig {
    const ENTITY: &'static str = "vpn_config";
    const TABLE: &'static str = "vpn_configs";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "protocol",
        "payload",
        "state",
        "created_at",
        "updated_at",
    ];
    const UNIQUE: &'static [&'static str] = &["protocol"];
    const SORTABLE: &'static [&'static str] = &["created_at", "updated_at", "protocol"];
    const TOUCH: Option<&'static str> = Some("updated_at");

    type New = NewVpnConfig;
    type Patch = VpnConfigPatch;
    type Filter = VpnConfigFilter;

    fn from_row(row: &AnyRow) -> Result<Self, StoreError> {
        let r = RowReader::new(row, Self::TABLE);
        Ok(Self {
            id: r.text("id")?,
            user_id: r.text("user_id")?,
            protocol: r.parse("protocol")?,
            payload: r.text("payload")?,
            state: r.parse("state")?,
            created_at: r.time("created_at")?,
            updated_at: r.time("updated_at")?,
        })
    }

    fn insert_values(new: &NewVpnConfig, now: i64) -> Vec<(&'static str, Param)> {
        vec![
            ("user_id", new.user_id.as_str().into()),
            ("protocol", new.protocol.as_str().into()),
            ("payload", new.payload.as_str().into()),
            ("state", Lifecycle::Active.as_str().into()),
            ("created_at", now.into()),
            ("updated_at", now.into()),
        ]
    }

    fn assignments(patch: &VpnConfigPatch, _now: i64) -> Vec<(&'static str, Param)> {
        patch
            .payload
            .as_deref()
            .map(|payload| vec![("payload", payload.into())])
            .unwrap_or_default()
    }

    fn conditions(filter: &VpnConfigFilter) -> Vec<Condition> {
        let mut conds = Vec::new();
        if let Some(user_id) = &filter.user_id {
            conds.push(Condition::Eq("user_id", user_id.as_str().into()));
        }
        if let Some(protocol) = filter.protocol {
            conds.push(Condition::Eq("protocol", protocol.as_str().into()));
        }
        if let Some(state) = filter.state {
            conds.push(Condition::Eq("state", state.as_str().into()));
        }
        conds
    }

    /// The owner must exist, and a new config supersedes the active one for
    /// the same protocol.
    async fn before_insert(
        conn: &mut AnyConnection,
        db: DatabaseType,
        new: &NewVpnConfig,
        now: i64,
    ) -> Result<(), StoreError> {
        require_user(&mut *conn, db, &new.user_id).await?;
        let sql = db.rewrite(
            "UPDATE vpn_configs SET state = 'deactivated', updated_at = ? \
             WHERE user_id = ? AND protocol = ? AND state = 'active'",
        );
        let superseded = sqlx::query(&sql)
            .bind(now)
            .bind(new.user_id.as_str())
            .bind(new.protocol.as_str())
            .execute(conn)
            .await?
            .rows_affected();
        if superseded > 0 {
            debug!(user_id = %new.user_id, protocol = %new.protocol, "previous config deactivated");
        }
        Ok(())
    }
}

impl Store {
    /// The active config of a user for one protocol.
    pub async fn active_config(
        &self,
        user_id: &str,
        protocol: Protocol,
    ) -> Result<Option<VpnConfig>, StoreError> {
        let filter = VpnConfigFilter {
            user_id: Some(user_id.to_string()),
            protocol: Some(protocol),
            state: Some(Lifecycle::Active),
        };
        self.query::<VpnConfig>(&filter, Default::default())?
            .first()
            .await
    }

    pub async fn deactivate_config(&self, id: &str) -> Result<(), StoreError> {
        self.transition_state(
            VpnConfig::TABLE,
            VpnConfig::ENTITY,
            id,
            Lifecycle::Deactivated,
        )
        .await
    }

    pub async fn revoke_config(&self, id: &str) -> Result<(), StoreError> {
        self.transition_state(VpnConfig::TABLE, VpnConfig::ENTITY, id, Lifecycle::Revoked)
            .await
    }
}
