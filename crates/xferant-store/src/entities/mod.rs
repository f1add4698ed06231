//! [`Record`](crate::Record) implementations and entity-specific operations.

mod api_keys;
mod payments;
mod servers;
mod users;
mod vpn_configs;

use sqlx::{AnyConnection, Row};
use xferant_core::{FieldError, Lifecycle};

use crate::dialect::DatabaseType;
use crate::error::StoreError;
use crate::record::now_micros;
use crate::store::Store;

pub(crate) use users::apply_expiry;

/// Reject writes that reference a missing user.
pub(crate) async fn require_user(
    conn: &mut AnyConnection,
    db: DatabaseType,
    user_id: &str,
) -> Result<(), StoreError> {
    if crate::store::row_exists(conn, db, "users", user_id).await? {
        Ok(())
    } else {
        Err(StoreError::not_found("user", user_id))
    }
}

impl Store {
    /// Move a lifecycle-tracked row (`vpn_configs`, `api_keys`) to `next`.
    ///
    /// Repeating a transition is a no-op; a transition the lifecycle does not
    /// allow is a validation error.
    pub(crate) async fn transition_state(
        &self,
        table: &'static str,
        entity: &'static str,
        id: &str,
        next: Lifecycle,
    ) -> Result<(), StoreError> {
        let allowed_from: Vec<&'static str> = Lifecycle::ALL
            .iter()
            .filter(|from| from.can_transition_to(next))
            .map(|from| from.as_str())
            .collect();
        let placeholders = vec!["?"; allowed_from.len()].join(", ");
        let touch = if table == "vpn_configs" {
            ", updated_at = ?"
        } else {
            ""
        };
        let raw = format!(
            "UPDATE {table} SET state = ?{touch} WHERE id = ? AND state IN ({placeholders})"
        );
        let sql = self.sql(&raw);

        let mut query = sqlx::query(&sql).bind(next.as_str());
        if !touch.is_empty() {
            query = query.bind(now_micros());
        }
        query = query.bind(id);
        for from in &allowed_from {
            query = query.bind(*from);
        }
        let result = query.execute(self.pool()).await?;
        if result.rows_affected() > 0 {
            return Ok(());
        }

        let raw = format!("SELECT state FROM {table} WHERE id = ?");
        let sql = self.sql(&raw);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| StoreError::not_found(entity, id))?;
        let current: Lifecycle = row
            .try_get::<String, _>("state")?
            .parse()
            .map_err(|e: FieldError| StoreError::corrupted(table, e))?;
        if current == next {
            Ok(())
        } else {
            Err(FieldError::new("state", format!("cannot move from {current} to {next}")).into())
        }
    }
}
