//! SQL dialect detection and placeholder rewriting.
//!
//! Statements are written once with `?` placeholders and rewritten to the
//! numbered `$n` form for PostgreSQL.

use std::borrow::Cow;

/// Database type enum for query selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    /// PostgreSQL database.
    PostgreSQL,
    /// SQLite database.
    SQLite,
}

impl DatabaseType {
    /// Detect database type from URL.
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if url.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    /// Rewrite `?` placeholders for this dialect. Quoted literals are left alone.
    pub fn rewrite<'a>(self, sql: &'a str) -> Cow<'a, str> {
        match self {
            Self::SQLite => Cow::Borrowed(sql),
            Self::PostgreSQL => {
                let mut out = String::with_capacity(sql.len() + 8);
                let mut n = 0;
                let mut in_literal = false;
                for ch in sql.chars() {
                    match ch {
                        '\'' => {
                            in_literal = !in_literal;
                            out.push(ch);
                        }
                        '?' if !in_literal => {
                            n += 1;
                            out.push('$');
                            out.push_str(&n.to_string());
                        }
                        _ => out.push(ch),
                    }
                }
                Cow::Owned(out)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_supported_schemes() {
        assert_eq!(
            DatabaseType::from_url("postgres://localhost/db"),
            Some(DatabaseType::PostgreSQL)
        );
        assert_eq!(
            DatabaseType::from_url("postgresql://localhost/db"),
            Some(DatabaseType::PostgreSQL)
        );
        assert_eq!(
            DatabaseType::from_url("sqlite::memory:"),
            Some(DatabaseType::SQLite)
        );
        assert_eq!(DatabaseType::from_url("mysql://localhost/db"), None);
    }

    #[test]
    fn rewrites_placeholders_for_postgres() {
        let sql = "UPDATE users SET status = 'why?' WHERE id = ? AND status = ?";
        assert_eq!(DatabaseType::SQLite.rewrite(sql), sql);
        assert_eq!(
            DatabaseType::PostgreSQL.rewrite(sql),
            "UPDATE users SET status = 'why?' WHERE id = $1 AND status = $2"
        );
    }
}
