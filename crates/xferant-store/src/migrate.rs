//! Versioned schema migrations.
//!
//! Every migration is applied at most once and recorded in
//! `schema_migrations`. The DDL is shared by PostgreSQL and SQLite: integer
//! columns are `BIGINT`, timestamps are Unix microseconds, ids are text.

use sqlx::{AnyPool, Row};
use tracing::{debug, info};

use crate::dialect::DatabaseType;
use crate::error::StoreError;
use crate::record::now_micros;

/// A single schema change.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    statements: &'static [&'static str],
}

/// Outcome of [`migrate`](crate::Store::migrate).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub applied: Vec<i64>,
    pub skipped: Vec<i64>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

const CREATE_MIGRATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version BIGINT PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at BIGINT NOT NULL
)
"#;

pub(crate) const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        statements: &[
            r#"
CREATE TABLE users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    username TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'active',
    traffic_limit BIGINT NOT NULL DEFAULT 1073741824 CHECK (traffic_limit >= 0),
    traffic_used BIGINT NOT NULL DEFAULT 0 CHECK (traffic_used >= 0),
    expires_at BIGINT,
    created_at BIGINT NOT NULL,
    updated_at BIGINT NOT NULL,
    CONSTRAINT users_email_key UNIQUE (email)
)
"#,
            "CREATE INDEX idx_users_status ON users (status)",
        ],
    },
    Migration {
        version: 2,
        name: "create_vpn_configs",
        statements: &[
            r#"
CREATE TABLE vpn_configs (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    protocol TEXT NOT NULL,
    payload TEXT NOT NULL,
    state TEXT NOT NULL DEFAULT 'active',
    created_at BIGINT NOT NULL,
    updated_at BIGINT NOT NULL
)
"#,
            "CREATE INDEX idx_vpn_configs_user_id ON vpn_configs (user_id)",
            // At most one active config per (user, protocol).
            "CREATE UNIQUE INDEX uq_vpn_configs_active_protocol ON vpn_configs (user_id, protocol) WHERE state = 'active'",
        ],
    },
    Migration {
        version: 3,
        name: "create_api_keys",
        statements: &[r#"
CREATE TABLE api_keys (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    key TEXT NOT NULL,
    secret_hash TEXT NOT NULL,
    scope TEXT NOT NULL,
    state TEXT NOT NULL DEFAULT 'active',
    created_at BIGINT NOT NULL,
    expires_at BIGINT NOT NULL,
    last_used_at BIGINT,
    CONSTRAINT api_keys_key_key UNIQUE (key)
)
"#],
    },
    Migration {
        version: 4,
        name: "create_payments",
        statements: &[
            r#"
CREATE TABLE payments (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    amount BIGINT NOT NULL CHECK (amount > 0),
    currency TEXT NOT NULL DEFAULT 'RUB',
    status TEXT NOT NULL DEFAULT 'pending',
    external_payment_id TEXT,
    provider TEXT NOT NULL,
    created_at BIGINT NOT NULL,
    completed_at BIGINT,
    CONSTRAINT payments_external_payment_id_key UNIQUE (external_payment_id)
)
"#,
            "CREATE INDEX idx_payments_user_id ON payments (user_id)",
            "CREATE INDEX idx_payments_status ON payments (status)",
        ],
    },
    Migration {
        version: 5,
        name: "create_servers",
        statements: &[
            r#"
CREATE TABLE servers (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    hostname TEXT NOT NULL,
    ip_address TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'online',
    location TEXT NOT NULL,
    load_percent BIGINT NOT NULL DEFAULT 0 CHECK (load_percent BETWEEN 0 AND 100),
    last_update BIGINT NOT NULL,
    created_at BIGINT NOT NULL
)
"#,
            "CREATE INDEX idx_servers_status_location ON servers (status, location)",
        ],
    },
];

/// Latest schema version known to this build.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

pub(crate) async fn ensure_table(pool: &AnyPool) -> Result<(), StoreError> {
    sqlx::query(CREATE_MIGRATIONS_TABLE).execute(pool).await?;
    Ok(())
}

pub(crate) async fn applied_versions(pool: &AnyPool) -> Result<Vec<i64>, StoreError> {
    let rows = sqlx::query("SELECT version FROM schema_migrations ORDER BY version")
        .fetch_all(pool)
        .await?;
    rows.iter()
        .map(|row| row.try_get::<i64, _>("version").map_err(StoreError::from))
        .collect()
}

/// Apply every pending migration, each in its own transaction.
pub(crate) async fn run(
    pool: &AnyPool,
    db: DatabaseType,
    migrations: &[Migration],
) -> Result<MigrationReport, StoreError> {
    ensure_table(pool).await?;
    let applied = applied_versions(pool).await?;
    let mut report = MigrationReport::default();

    for migration in migrations {
        if applied.contains(&migration.version) {
            debug!(version = migration.version, name = migration.name, "migration already applied");
            report.skipped.push(migration.version);
            continue;
        }

        let fail = |source| StoreError::Migration {
            version: migration.version,
            name: migration.name,
            source,
        };

        let mut tx = pool.begin().await?;
        for statement in migration.statements {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(fail)?;
        }
        let record = db.rewrite(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
        );
        sqlx::query(&record)
            .bind(migration.version)
            .bind(migration.name)
            .bind(now_micros())
            .execute(&mut *tx)
            .await
            .map_err(fail)?;
        tx.commit().await.map_err(fail)?;

        info!(version = migration.version, name = migration.name, "migration applied");
        report.applied.push(migration.version);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_are_strictly_increasing() {
        let versions: Vec<i64> = MIGRATIONS.iter().map(|m| m.version).collect();
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(latest_version(), 5);
    }
}
