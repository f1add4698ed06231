//! Per-user traffic accounting against quotas.
//!
//! Usage only grows through [`Store::record_usage`] and only shrinks through
//! an explicit reset. An active user whose usage reaches a non-zero limit is
//! switched to `expired` in the same transaction as the increment.

use chrono::{DateTime, Utc};
use sqlx::Row;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use xferant_config::ResetPolicy;
use xferant_core::{FieldError, UserStatus};

use crate::entities::apply_expiry;
use crate::error::StoreError;
use crate::record::{now_micros, to_micros};
use crate::store::{Store, row_exists};

/// Outcome of a usage report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageResult {
    /// Usage after the increment, in bytes.
    pub new_total: i64,
    /// Whether usage is at or above a non-zero limit.
    pub over_quota: bool,
    /// Stored status after the report.
    pub status: UserStatus,
}

impl Store {
    /// Add `delta_bytes` to a user's usage.
    ///
    /// The increment runs first so the row is write-locked before it is read
    /// back; concurrent reports therefore never lose updates. A delta that
    /// would push usage past `i64::MAX` is rejected and nothing is written.
    pub async fn record_usage(
        &self,
        user_id: &str,
        delta_bytes: i64,
    ) -> Result<UsageResult, StoreError> {
        if delta_bytes < 0 {
            return Err(FieldError::new("delta_bytes", "must be >= 0").into());
        }
        let db = self.database_type();
        let user_id = user_id.to_string();
        let now = now_micros();

        self.with_transaction(move |tx| {
            Box::pin(async move {
                let add = db.rewrite(
                    "UPDATE users SET traffic_used = traffic_used + ?, updated_at = ? \
                     WHERE id = ? AND traffic_used <= ?",
                );
                let result = sqlx::query(&add)
                    .bind(delta_bytes)
                    .bind(now)
                    .bind(user_id.as_str())
                    .bind(i64::MAX - delta_bytes)
                    .execute(&mut **tx)
                    .await?;
                if result.rows_affected() == 0 {
                    if row_exists(&mut **tx, db, "users", &user_id).await? {
                        return Err(FieldError::new("delta_bytes", "usage would overflow").into());
                    }
                    return Err(StoreError::not_found("user", user_id));
                }

                let expired = apply_expiry(&mut **tx, db, &user_id, now).await?;

                let read = db.rewrite(
                    "SELECT traffic_used, traffic_limit, status FROM users WHERE id = ?",
                );
                let row = sqlx::query(&read)
                    .bind(user_id.as_str())
                    .fetch_one(&mut **tx)
                    .await?;
                let new_total: i64 = row.try_get("traffic_used")?;
                let limit: i64 = row.try_get("traffic_limit")?;
                let status: UserStatus = row
                    .try_get::<String, _>("status")?
                    .parse()
                    .map_err(|e: FieldError| StoreError::corrupted("users", e))?;

                if expired {
                    info!(user_id = %user_id, used = new_total, limit, "user expired");
                }
                Ok(UsageResult {
                    new_total,
                    over_quota: limit > 0 && new_total >= limit,
                    status,
                })
            })
        })
        .await
    }

    /// Reset a user's usage to zero.
    ///
    /// An `expired` user becomes `active` again unless its expiration time
    /// has passed. Suspended users stay suspended.
    pub async fn reset_usage(&self, user_id: &str) -> Result<(), StoreError> {
        self.reset_usage_at(user_id, Utc::now()).await
    }

    pub async fn reset_usage_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        let now = to_micros(now);
        let sql = self.sql(
            "UPDATE users SET traffic_used = 0, \
             status = CASE WHEN status = 'expired' AND (expires_at IS NULL OR expires_at > ?) \
                      THEN 'active' ELSE status END, \
             updated_at = ? WHERE id = ?",
        );
        let result = sqlx::query(&sql)
            .bind(now)
            .bind(now)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("user", user_id));
        }
        debug!(user_id = %user_id, "usage reset");
        Ok(())
    }

    /// Reset every user's usage. Returns the number of users touched.
    pub async fn reset_all_usage(&self) -> Result<u64, StoreError> {
        self.reset_all_usage_at(Utc::now()).await
    }

    pub async fn reset_all_usage_at(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let now = to_micros(now);
        let sql = self.sql(
            "UPDATE users SET traffic_used = 0, \
             status = CASE WHEN status = 'expired' AND (expires_at IS NULL OR expires_at > ?) \
                      THEN 'active' ELSE status END, \
             updated_at = ?",
        );
        let result = sqlx::query(&sql)
            .bind(now)
            .bind(now)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }

    /// Expire active users whose expiration time passed at `now`.
    pub async fn expire_overdue_users(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let now = to_micros(now);
        let sql = self.sql(
            "UPDATE users SET status = 'expired', updated_at = ? \
             WHERE status = 'active' AND expires_at IS NOT NULL AND expires_at <= ?",
        );
        let expired = sqlx::query(&sql)
            .bind(now)
            .bind(now)
            .execute(self.pool())
            .await?
            .rows_affected();
        if expired > 0 {
            info!(count = expired, "expired overdue users");
        }
        Ok(expired)
    }
}

/// Spawn the background task driving a periodic reset policy.
///
/// Returns `None` for [`ResetPolicy::Manual`]. The task stops when `cancel`
/// fires.
pub fn spawn_reset_task(
    store: Store,
    policy: ResetPolicy,
    cancel: CancellationToken,
) -> Option<JoinHandle<()>> {
    let period = policy.interval()?;
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match store.reset_all_usage().await {
                        Ok(count) => info!(count, "periodic usage reset"),
                        Err(e) => warn!(error = %e, "periodic usage reset failed"),
                    }
                }
            }
        }
        debug!("usage reset task stopped");
    }))
}
