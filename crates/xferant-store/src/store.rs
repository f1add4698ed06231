//! The pooled store handle.

use std::borrow::Cow;

use futures_util::future::BoxFuture;
use sqlx::any::{Any, AnyPoolOptions};
use sqlx::{AnyConnection, AnyPool, Row, Transaction};
use tracing::{info, warn};
use uuid::Uuid;
use xferant_core::Validate;

use crate::config::StoreConfig;
use crate::dialect::DatabaseType;
use crate::error::StoreError;
use crate::migrate::{self, MIGRATIONS, MigrationReport};
use crate::query::Query;
use crate::record::{Order, Param, Record, now_micros};

/// Handle to the connection pool.
///
/// Cheap to clone; clones share the pool.
///
/// # Example
///
/// ```ignore
/// use xferant_store::{Store, StoreConfig};
/// use xferant_core::{NewUser, User};
///
/// let store = Store::initialize(&StoreConfig::new("sqlite::memory:").max_open(1)).await?;
/// let id = store.create::<User>(NewUser::new("a@example.com", "alice", hash)).await?;
/// let user: User = store.get(&id).await?;
/// ```
#[derive(Clone)]
pub struct Store {
    pool: AnyPool,
    db_type: DatabaseType,
}

impl Store {
    /// Establish the pool without touching the schema.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        // Install database drivers for the "any" pool
        sqlx::any::install_default_drivers();

        let db_type = DatabaseType::from_url(&config.database_url).ok_or_else(|| {
            let scheme = config.database_url.split(':').next().unwrap_or_default();
            StoreError::UnsupportedUrl(scheme.to_string())
        })?;

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_open)
            .min_connections(config.min_connections())
            .acquire_timeout(config.acquire_timeout)
            .max_lifetime(config.max_lifetime)
            .idle_timeout(config.idle_timeout)
            .connect(&config.database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!(
            db = ?db_type,
            max_open = config.max_open,
            max_idle = config.min_connections(),
            "database pool established"
        );
        Ok(Self { pool, db_type })
    }

    /// Establish the pool and bring the schema up to date.
    ///
    /// Idempotent: running it against an up-to-date database applies nothing.
    pub async fn initialize(config: &StoreConfig) -> Result<Self, StoreError> {
        let store = Self::connect(config).await?;
        store.migrate().await?;
        Ok(store)
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> Result<MigrationReport, StoreError> {
        let report = migrate::run(&self.pool, self.db_type, MIGRATIONS).await?;
        if report.is_noop() {
            info!(version = migrate::latest_version(), "schema up to date");
        }
        Ok(report)
    }

    /// Highest applied migration version (0 on an empty database).
    pub async fn schema_version(&self) -> Result<i64, StoreError> {
        migrate::ensure_table(&self.pool).await?;
        Ok(migrate::applied_versions(&self.pool)
            .await?
            .last()
            .copied()
            .unwrap_or(0))
    }

    /// Get the connection pool (for advanced usage).
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Get database type.
    pub fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    /// Rewrite a `?`-placeholder statement for this database.
    pub fn sql<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        self.db_type.rewrite(sql)
    }

    /// Close every connection. Pending acquisitions fail afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Run `f` inside a transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back when it returns `Err`. A
    /// transaction dropped mid-flight is rolled back by the driver.
    pub async fn with_transaction<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut Transaction<'static, Any>) -> BoxFuture<'c, Result<T, StoreError>>
            + Send,
    {
        let mut tx = self.pool.begin().await?;
        match f(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "transaction rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Validate and insert a new entity, returning its id.
    pub async fn create<E: Record>(&self, new: E::New) -> Result<String, StoreError> {
        new.validate()?;
        let now = now_micros();
        let id = Uuid::new_v4().to_string();
        let values = E::insert_values(&new, now);

        let columns: Vec<&str> = std::iter::once("id")
            .chain(values.iter().map(|(col, _)| *col))
            .collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let raw = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            E::TABLE,
            columns.join(", ")
        );
        let sql = self.sql(&raw).into_owned();
        let db = self.db_type;

        self.with_transaction(move |tx| {
            Box::pin(async move {
                E::before_insert(&mut **tx, db, &new, now).await?;
                let mut query = sqlx::query(&sql).bind(id.clone());
                for (_, value) in values {
                    query = value.bind(query);
                }
                query
                    .execute(&mut **tx)
                    .await
                    .map_err(|e| StoreError::from_write(e, E::ENTITY, E::UNIQUE))?;
                Ok(id)
            })
        })
        .await
    }

    /// Fetch an entity by id.
    pub async fn get<E: Record>(&self, id: &str) -> Result<E, StoreError> {
        self.find(id)
            .await?
            .ok_or_else(|| StoreError::not_found(E::ENTITY, id))
    }

    /// Fetch an entity by id, `None` when absent.
    pub async fn find<E: Record>(&self, id: &str) -> Result<Option<E>, StoreError> {
        self.find_by::<E>("id", id).await
    }

    pub(crate) async fn find_by<E: Record>(
        &self,
        column: &'static str,
        value: &str,
    ) -> Result<Option<E>, StoreError> {
        let raw = format!(
            "SELECT {} FROM {} WHERE {column} = ?",
            E::COLUMNS.join(", "),
            E::TABLE
        );
        let sql = self.sql(&raw);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| E::from_row(&row)).transpose()
    }

    /// Apply a patch. An empty patch only checks that the entity exists.
    pub async fn update<E: Record>(&self, id: &str, patch: E::Patch) -> Result<(), StoreError> {
        patch.validate()?;
        let now = now_micros();
        let mut sets = E::assignments(&patch, now);
        if sets.is_empty() {
            return self.get::<E>(id).await.map(|_| ());
        }
        if let Some(col) = E::TOUCH {
            sets.push((col, Param::Int(now)));
        }
        let guard = E::guard(&patch);

        let assignments: Vec<String> = sets.iter().map(|(col, _)| format!("{col} = ?")).collect();
        let mut raw = format!(
            "UPDATE {} SET {} WHERE id = ?",
            E::TABLE,
            assignments.join(", ")
        );
        if let Some(guard) = &guard {
            raw.push_str(&format!(" AND {} = ?", guard.column));
        }
        let sql = self.sql(&raw).into_owned();
        let id = id.to_string();
        let db = self.db_type;

        self.with_transaction(move |tx| {
            Box::pin(async move {
                let mut query = sqlx::query(&sql);
                for (_, value) in sets {
                    query = value.bind(query);
                }
                query = query.bind(id.clone());
                if let Some(guard) = &guard {
                    query = guard.value.clone().bind(query);
                }
                let result = query
                    .execute(&mut **tx)
                    .await
                    .map_err(|e| StoreError::from_write(e, E::ENTITY, E::UNIQUE))?;

                if result.rows_affected() == 0 {
                    let exists = row_exists(&mut **tx, db, E::TABLE, &id).await?;
                    return Err(match guard {
                        Some(guard) if exists => guard.violation.into(),
                        _ => StoreError::not_found(E::ENTITY, id),
                    });
                }

                E::after_update(&mut **tx, db, &id, now).await?;
                Ok(())
            })
        })
        .await
    }

    /// Build a lazy listing. Nothing runs until the query is iterated.
    pub fn query<E: Record>(&self, filter: &E::Filter, order: Order) -> Result<Query<E>, StoreError> {
        let order_by = order.sql::<E>()?;
        let (where_clause, params) = where_clause::<E>(filter);
        let raw = format!(
            "SELECT {} FROM {}{where_clause} ORDER BY {order_by}",
            E::COLUMNS.join(", "),
            E::TABLE
        );
        Ok(Query::new(
            self.pool.clone(),
            self.sql(&raw).into_owned(),
            params,
        ))
    }

    /// Count the entities matching `filter`.
    pub async fn count<E: Record>(&self, filter: &E::Filter) -> Result<i64, StoreError> {
        let (where_clause, params) = where_clause::<E>(filter);
        let raw = format!("SELECT COUNT(*) AS n FROM {}{where_clause}", E::TABLE);
        let sql = self.sql(&raw);
        let mut query = sqlx::query(&sql);
        for param in params {
            query = param.bind(query);
        }
        let row = query.fetch_one(&self.pool).await?;
        Ok(row.try_get::<i64, _>("n")?)
    }
}

fn where_clause<E: Record>(filter: &E::Filter) -> (String, Vec<Param>) {
    let conditions = E::conditions(filter);
    if conditions.is_empty() {
        return (String::new(), Vec::new());
    }
    let clause = conditions
        .iter()
        .map(|c| c.sql())
        .collect::<Vec<_>>()
        .join(" AND ");
    let params = conditions.into_iter().map(|c| c.into_param()).collect();
    (format!(" WHERE {clause}"), params)
}

pub(crate) async fn row_exists(
    conn: &mut AnyConnection,
    db: DatabaseType,
    table: &str,
    id: &str,
) -> Result<bool, StoreError> {
    let raw = format!("SELECT id FROM {table} WHERE id = ?");
    let sql = db.rewrite(&raw);
    let row = sqlx::query(&sql).bind(id).fetch_optional(conn).await?;
    Ok(row.is_some())
}

// Debug implementation (don't leak credentials)
impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("db_type", &self.db_type)
            .field("pool_size", &self.pool.size())
            .finish_non_exhaustive()
    }
}
