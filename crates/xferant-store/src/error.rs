//! Store error types.

use xferant_core::{ErrorKind, FieldError};

/// Error returned by every store operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Input rejected before reaching the database.
    #[error("validation failed: {0}")]
    Validation(#[from] FieldError),

    /// A unique column already holds this value.
    #[error("{entity} with this {field} already exists")]
    Conflict {
        entity: &'static str,
        field: &'static str,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Database unreachable or pool exhausted.
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("unsupported database URL scheme: {0}")]
    UnsupportedUrl(String),

    #[error("migration {version} ({name}) failed: {source}")]
    Migration {
        version: i64,
        name: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// A stored row could not be decoded into its entity.
    #[error("corrupted {table} row: {reason}")]
    Corrupted { table: &'static str, reason: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn corrupted(table: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Corrupted {
            table,
            reason: reason.to_string(),
        }
    }

    /// Classify a write failure, turning unique violations into [`StoreError::Conflict`].
    ///
    /// The conflicting field is the first of `unique` named by the
    /// constraint or the driver message.
    pub(crate) fn from_write(
        err: sqlx::Error,
        entity: &'static str,
        unique: &'static [&'static str],
    ) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let message = db.message();
            let unique_violation = db.is_unique_violation()
                || message.contains("UNIQUE constraint failed")
                || message.contains("duplicate key value");
            if unique_violation {
                let constraint = db.constraint().unwrap_or_default();
                let field = unique
                    .iter()
                    .find(|f| constraint.contains(*f) || message.contains(&format!(".{f}")))
                    .or_else(|| unique.first())
                    .copied()
                    .unwrap_or("id");
                return Self::Conflict { entity, field };
            }
        }
        Self::from(err)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Connection(_) | Self::UnsupportedUrl(_) => ErrorKind::Connection,
            Self::Database(err) if is_connection_error(err) => ErrorKind::Connection,
            Self::Migration { .. } | Self::Corrupted { .. } | Self::Database(_) => {
                ErrorKind::Internal
            }
        }
    }
}

fn is_connection_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(
            StoreError::from(FieldError::new("email", "bad")).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            StoreError::Conflict {
                entity: "user",
                field: "email"
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            StoreError::not_found("user", "u1").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            StoreError::Database(sqlx::Error::PoolTimedOut).kind(),
            ErrorKind::Connection
        );
        assert_eq!(
            StoreError::Database(sqlx::Error::RowNotFound).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn messages() {
        assert_eq!(
            StoreError::not_found("server", "s9").to_string(),
            "server s9 not found"
        );
        assert_eq!(
            StoreError::Conflict {
                entity: "api_key",
                field: "key"
            }
            .to_string(),
            "api_key with this key already exists"
        );
    }
}
