//! Error types for dbhandle-core

use std::time::Duration;

use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

/// Coarse classification of a [`DbError`].
///
/// Callers branch on this instead of matching every variant, e.g. to tell a
/// bad connection URI (`Connection`) apart from a bad table reference
/// (`Schema`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Connection,
    Schema,
    Query,
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("{var} is not set")]
    MissingConfig { var: &'static str },

    #[error("invalid value for {var}: {reason}")]
    InvalidConfig { var: &'static str, reason: String },

    #[error("invalid connection URI: {0}")]
    InvalidUrl(#[source] sqlx::Error),

    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("timed out after {0:?} connecting to database")]
    ConnectTimeout(Duration),

    #[error("invalid schema '{schema}': {reason}")]
    InvalidSchema { schema: &'static str, reason: String },

    #[error("table '{table}' is not part of schema '{schema}'")]
    UnknownTable {
        schema: &'static str,
        table: &'static str,
    },

    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: &'static str, column: String },

    #[error("column '{table}.{column}' expects {expected}, got {actual}")]
    TypeMismatch {
        table: &'static str,
        column: &'static str,
        expected: String,
        actual: &'static str,
    },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("database error: {0}")]
    Query(#[from] sqlx::Error),
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::MissingConfig { .. } | DbError::InvalidConfig { .. } => ErrorKind::Config,
            DbError::InvalidUrl(_) | DbError::Connect(_) | DbError::ConnectTimeout(_) => {
                ErrorKind::Connection
            }
            DbError::InvalidSchema { .. }
            | DbError::UnknownTable { .. }
            | DbError::UnknownColumn { .. }
            | DbError::TypeMismatch { .. } => ErrorKind::Schema,
            DbError::InvalidQuery(_) | DbError::Query(_) => ErrorKind::Query,
        }
    }

    pub fn is_connection(&self) -> bool {
        self.kind() == ErrorKind::Connection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_uri_is_connection_kind() {
        let err = DbError::InvalidUrl(sqlx::Error::Configuration("bad".into()));
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(err.is_connection());
    }

    #[test]
    fn missing_config_names_the_variable() {
        let err = DbError::MissingConfig {
            var: "NEXT_DATABASE_URL",
        };
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.to_string(), "NEXT_DATABASE_URL is not set");
    }

    #[test]
    fn unknown_column_is_schema_kind() {
        let err = DbError::UnknownColumn {
            table: "users",
            column: "nope".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert!(!err.is_connection());
    }
}
