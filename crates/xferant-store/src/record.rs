//! Mapping between entities and table rows.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{AnyConnection, Row};
use sqlx::any::{Any, AnyArguments, AnyRow};
use xferant_core::{FieldError, Validate};

use crate::dialect::DatabaseType;
use crate::error::StoreError;

pub(crate) type SqlQuery<'q> = sqlx::query::Query<'q, Any, AnyArguments<'q>>;

/// A bind parameter. Only the types every backend decodes the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Text(String),
    NullableText(Option<String>),
    Int(i64),
    NullableInt(Option<i64>),
}

impl Param {
    pub(crate) fn bind<'q>(self, query: SqlQuery<'q>) -> SqlQuery<'q> {
        match self {
            Self::Text(v) => query.bind(v),
            Self::NullableText(v) => query.bind(v),
            Self::Int(v) => query.bind(v),
            Self::NullableInt(v) => query.bind(v),
        }
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Option<String>> for Param {
    fn from(v: Option<String>) -> Self {
        Self::NullableText(v)
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<DateTime<Utc>> for Param {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Int(to_micros(v))
    }
}

impl From<Option<DateTime<Utc>>> for Param {
    fn from(v: Option<DateTime<Utc>>) -> Self {
        Self::NullableInt(v.map(to_micros))
    }
}

// Timestamps are stored as microseconds since the Unix epoch.

pub(crate) fn to_micros(t: DateTime<Utc>) -> i64 {
    t.timestamp_micros()
}

pub(crate) fn now_micros() -> i64 {
    to_micros(Utc::now())
}

/// A filter predicate on one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Eq(&'static str, Param),
    AtLeast(&'static str, Param),
}

impl Condition {
    pub(crate) fn sql(&self) -> String {
        match self {
            Self::Eq(col, _) => format!("{col} = ?"),
            Self::AtLeast(col, _) => format!("{col} >= ?"),
        }
    }

    pub(crate) fn into_param(self) -> Param {
        match self {
            Self::Eq(_, p) | Self::AtLeast(_, p) => p,
        }
    }
}

/// Extra predicate an update only applies under. A row that exists but fails
/// the guard is reported as `violation`.
#[derive(Debug, Clone)]
pub struct Guard {
    pub column: &'static str,
    pub value: Param,
    pub violation: FieldError,
}

/// Sort order for queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

impl Default for Order {
    /// Creation time, oldest first.
    fn default() -> Self {
        Self::asc("created_at")
    }
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }

    pub(crate) fn sql<E: Record>(&self) -> Result<String, StoreError> {
        let column = E::SORTABLE
            .iter()
            .find(|c| **c == self.column)
            .ok_or_else(|| {
                FieldError::new("order", format!("cannot sort {} by '{}'", E::TABLE, self.column))
            })?;
        let dir = if self.descending { "DESC" } else { "ASC" };
        // Secondary key keeps pagination stable across equal values.
        Ok(format!("{column} {dir}, id ASC"))
    }
}

/// An entity persisted in its own table.
///
/// Implementations describe the table layout and the column values of
/// inputs, patches and filters; the [`Store`](crate::Store) builds the
/// statements. The hooks run inside the write transaction.
#[async_trait]
pub trait Record: Sized + Send + Unpin + 'static {
    /// Name used in errors.
    const ENTITY: &'static str;
    const TABLE: &'static str;
    /// Selected columns, `id` first.
    const COLUMNS: &'static [&'static str];
    /// Columns with a uniqueness constraint.
    const UNIQUE: &'static [&'static str] = &[];
    /// Columns accepted by [`Order`].
    const SORTABLE: &'static [&'static str];
    /// Column bumped on every update, if any.
    const TOUCH: Option<&'static str> = None;

    type New: Validate + Send + Sync + 'static;
    type Patch: Validate + Send + Sync + 'static;
    type Filter: Send + Sync;

    fn from_row(row: &AnyRow) -> Result<Self, StoreError>;

    /// Column values of a new row, `id` excluded.
    fn insert_values(new: &Self::New, now: i64) -> Vec<(&'static str, Param)>;

    /// Column assignments of a patch. Empty when the patch changes nothing.
    fn assignments(patch: &Self::Patch, now: i64) -> Vec<(&'static str, Param)>;

    fn conditions(filter: &Self::Filter) -> Vec<Condition>;

    fn guard(_patch: &Self::Patch) -> Option<Guard> {
        None
    }

    async fn before_insert(
        _conn: &mut AnyConnection,
        _db: DatabaseType,
        _new: &Self::New,
        _now: i64,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn after_update(
        _conn: &mut AnyConnection,
        _db: DatabaseType,
        _id: &str,
        _now: i64,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Typed column access that reports decoding failures as corrupted rows.
pub(crate) struct RowReader<'r> {
    row: &'r AnyRow,
    table: &'static str,
}

impl<'r> RowReader<'r> {
    pub(crate) fn new(row: &'r AnyRow, table: &'static str) -> Self {
        Self { row, table }
    }

    pub(crate) fn text(&self, col: &str) -> Result<String, StoreError> {
        self.row
            .try_get::<String, _>(col)
            .map_err(|e| StoreError::corrupted(self.table, format!("{col}: {e}")))
    }

    pub(crate) fn opt_text(&self, col: &str) -> Result<Option<String>, StoreError> {
        self.row
            .try_get::<Option<String>, _>(col)
            .map_err(|e| StoreError::corrupted(self.table, format!("{col}: {e}")))
    }

    pub(crate) fn int(&self, col: &str) -> Result<i64, StoreError> {
        self.row
            .try_get::<i64, _>(col)
            .map_err(|e| StoreError::corrupted(self.table, format!("{col}: {e}")))
    }

    pub(crate) fn opt_int(&self, col: &str) -> Result<Option<i64>, StoreError> {
        self.row
            .try_get::<Option<i64>, _>(col)
            .map_err(|e| StoreError::corrupted(self.table, format!("{col}: {e}")))
    }

    pub(crate) fn time(&self, col: &str) -> Result<DateTime<Utc>, StoreError> {
        let micros = self.int(col)?;
        DateTime::from_timestamp_micros(micros).ok_or_else(|| {
            StoreError::corrupted(self.table, format!("{col}: timestamp {micros} out of range"))
        })
    }

    pub(crate) fn opt_time(&self, col: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        match self.opt_int(col)? {
            None => Ok(None),
            Some(micros) => DateTime::from_timestamp_micros(micros)
                .map(Some)
                .ok_or_else(|| {
                    StoreError::corrupted(
                        self.table,
                        format!("{col}: timestamp {micros} out of range"),
                    )
                }),
        }
    }

    /// Parse a text column into a string-backed enum.
    pub(crate) fn parse<T>(&self, col: &str) -> Result<T, StoreError>
    where
        T: FromStr<Err = FieldError>,
    {
        self.text(col)?
            .parse()
            .map_err(|e: FieldError| StoreError::corrupted(self.table, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn micros_round_trip() {
        let t = DateTime::from_timestamp_micros(1_700_000_000_123_456).unwrap();
        assert_eq!(to_micros(t), 1_700_000_000_123_456);
        assert_eq!(
            Param::from(Some(t)),
            Param::NullableInt(Some(1_700_000_000_123_456))
        );
        assert_eq!(Param::from(None::<DateTime<Utc>>), Param::NullableInt(None));
    }

    #[test]
    fn condition_sql() {
        assert_eq!(Condition::Eq("status", "active".into()).sql(), "status = ?");
        assert_eq!(
            Condition::AtLeast("last_update", 5i64.into()).sql(),
            "last_update >= ?"
        );
    }
}
