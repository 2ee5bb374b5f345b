//! Database type definitions
//!
//! The closed set of dialects the adapter factory dispatches over.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported database management systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum DatabaseType {
    /// SQLite database (file or in-memory)
    Sqlite,
    /// PostgreSQL database
    Postgres,
    /// MySQL/MariaDB database
    Mysql,
}

impl DatabaseType {
    /// Convert database type to string representation
    pub fn to_str(&self) -> &'static str {
        match self {
            DatabaseType::Sqlite => "sqlite",
            DatabaseType::Postgres => "postgres",
            DatabaseType::Mysql => "mysql",
        }
    }

    /// Port used when the configuration leaves it out. SQLite has none.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            DatabaseType::Sqlite => None,
            DatabaseType::Postgres => Some(5432),
            DatabaseType::Mysql => Some(3306),
        }
    }

    /// Whether this dialect talks to a server (host and database name required)
    pub fn is_networked(&self) -> bool {
        !matches!(self, DatabaseType::Sqlite)
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for DatabaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "sqlite2" | "sqlite3" => Ok(DatabaseType::Sqlite),
            "pgsql" | "postgres" | "postgresql" => Ok(DatabaseType::Postgres),
            "mysql" | "mariadb" => Ok(DatabaseType::Mysql),
            _ => Err(format!("Invalid database driver: '{}'", s)),
        }
    }
}

impl TryFrom<String> for DatabaseType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_ids() {
        assert_eq!("sqlite".parse::<DatabaseType>(), Ok(DatabaseType::Sqlite));
        assert_eq!("sqlite2".parse::<DatabaseType>(), Ok(DatabaseType::Sqlite));
        assert_eq!("pgsql".parse::<DatabaseType>(), Ok(DatabaseType::Postgres));
        assert_eq!("mysql".parse::<DatabaseType>(), Ok(DatabaseType::Mysql));
        assert_eq!("MariaDB".parse::<DatabaseType>(), Ok(DatabaseType::Mysql));
        assert!("oracle".parse::<DatabaseType>().is_err());
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(DatabaseType::Sqlite.default_port(), None);
        assert_eq!(DatabaseType::Postgres.default_port(), Some(5432));
        assert_eq!(DatabaseType::Mysql.default_port(), Some(3306));
    }

    #[test]
    fn test_display() {
        assert_eq!(DatabaseType::Postgres.to_string(), "postgres");
        assert!(!DatabaseType::Sqlite.is_networked());
        assert!(DatabaseType::Mysql.is_networked());
    }
}
