//! Error types for the data-access layer
//!
//! Errors come in two tiers. Fatal errors (connection establishment, commit,
//! rollback) mean the owning `Database` can no longer be trusted. Everything
//! else is recoverable: the caller may inspect the carried SQL text and retry.

use super::database_types::DatabaseType;

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Error types for database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Connection could not be established (fatal)
    #[error("Connection to {driver} database failed: {message}")]
    ConnectionFailed { driver: DatabaseType, message: String },

    /// Commit failed, transactional state is undefined (fatal)
    #[error("Transaction commit failed: {0}")]
    CommitFailed(String),

    /// Rollback failed, transactional state is undefined (fatal)
    #[error("Transaction rollback failed: {0}")]
    RollbackFailed(String),

    /// Prepare, bind or execute failure for a given statement
    #[error("Error while preparing query « {sql} » ({message})")]
    Query { sql: String, message: String },

    /// A query expected to return at most one row returned more
    #[error("Specified SELECT query « {sql} » should return a unique row, but {count} rows found")]
    NotUnique { sql: String, count: usize },

    /// Transaction protocol misuse (nested begin, commit without begin)
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// A broker transaction was rolled back; carries the failure message only
    #[error("{0}")]
    TransactionAborted(String),

    /// Filter key used an operator nobody handles
    #[error("Unknown filter operator '{operator}' for column '{column}'")]
    UnknownFilterOperator { column: String, operator: String },

    /// Rejected identifier (environment variable name, charset)
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unsupported operation for the current dialect
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// SQLite error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// PostgreSQL error
    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    PostgresError(#[from] tokio_postgres::Error),

    /// MySQL error
    #[cfg(feature = "mysql")]
    #[error("MySQL error: {0}")]
    MysqlError(#[from] mysql_async::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl DatabaseError {
    /// Create a fatal connection failure for the given driver
    pub fn connection_failed(driver: DatabaseType, message: impl Into<String>) -> Self {
        DatabaseError::ConnectionFailed {
            driver,
            message: message.into(),
        }
    }

    /// Wrap an underlying failure with the SQL text that caused it
    pub fn query_failed(sql: impl Into<String>, message: impl Into<String>) -> Self {
        DatabaseError::Query {
            sql: sql.into(),
            message: message.into(),
        }
    }

    /// Create a new transaction protocol error
    pub fn transaction<S: Into<String>>(msg: S) -> Self {
        DatabaseError::Transaction(msg.into())
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        DatabaseError::Configuration(msg.into())
    }

    /// Create a new unsupported operation error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        DatabaseError::UnsupportedOperation(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        DatabaseError::Other(msg.into())
    }

    /// Whether the owning database instance should be considered unusable
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed { .. }
                | DatabaseError::CommitFailed(_)
                | DatabaseError::RollbackFailed(_)
        )
    }

    /// SQL text carried by the error, if any
    pub fn sql(&self) -> Option<&str> {
        match self {
            DatabaseError::Query { sql, .. } | DatabaseError::NotUnique { sql, .. } => Some(sql),
            _ => None,
        }
    }
}
