//! # Rust Database Broker
//!
//! A multi-DBMS data-access layer. One configuration selects a dialect
//! adapter; a [`Database`] facade owns a single live connection and executes
//! parametrized statements through it; [`Broker`]s built on top of a shared
//! `Database` provide cardinality-checked selects, pagination and scoped
//! transactions. A [`FilterParser`] turns untrusted request filters into
//! parametrized WHERE clauses restricted to allow-listed columns.
//!
//! ## Features
//!
//! - **Dialect Adapters**: DSN generation, pagination, session variables,
//!   placeholder syntax and schema inspection per database
//! - **Two-Tier Errors**: fatal connection/commit/rollback failures are
//!   distinguishable from recoverable query failures
//! - **Scoped Transactions**: commit on success, rollback on any failure
//! - **Injection-Safe Filters**: values always bound, columns allow-listed
//! - **Async Support**: async/await on Tokio, one connection per `Database`
//!
//! ## Supported Databases
//!
//! | Database | Cargo feature | Driver |
//! |----------|---------------|--------|
//! | SQLite | `sqlite` (default) | rusqlite, bundled |
//! | PostgreSQL | `postgres` | tokio-postgres |
//! | MySQL / MariaDB | `mysql` | mysql_async |
//!
//! Adapters for every dialect are always compiled; only opening a connection
//! needs the driver feature.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rust_database_broker::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let configuration = DatabaseConfiguration::from_toml_str(
//!         r#"
//!         [database]
//!         driver = "sqlite"
//!         database = "app.db"
//!         "#,
//!     )?;
//!     let database = Database::connect(configuration).await?;
//!     let broker = Broker::new(&database);
//!
//!     let user = broker
//!         .select_unique("SELECT * FROM users WHERE id = ?", &[42.into()])
//!         .await?;
//!     if let Some(user) = user {
//!         println!("{}", user.to_json());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Filtering from request parameters
//!
//! ```rust,no_run
//! use rust_database_broker::prelude::*;
//!
//! async fn search(broker: &Broker<'_>, filters: Vec<(String, String)>) -> Result<Vec<DatabaseRow>> {
//!     let clause = FilterParser::new(["name", "email"]).parse(filters)?;
//!     let style = broker.database().get_adapter().placeholder_style();
//!     let rendered = clause.render(style);
//!     let sql = format!("SELECT * FROM users {} ORDER BY name", rendered.where_sql());
//!     broker.select_all(&sql, &rendered.parameters).await
//! }
//! ```

/// Core data-access types and traits
pub mod core;

/// Dialect implementations
pub mod backends;

/// Prelude for convenient imports
///
/// ```rust
/// use rust_database_broker::prelude::*;
///
/// let port = DatabaseType::Postgres.default_port();
/// assert_eq!(port, Some(5432));
/// ```
pub mod prelude {
    pub use crate::core::{
        Broker, Connective, Database, DatabaseConfiguration, DatabaseError, DatabaseResult,
        DatabaseRow, DatabaseStatement, DatabaseType, DatabaseValue, FilterParser, Parameter,
        Result, WhereClause, WhereCondition,
    };
}

// Re-export at root level for convenience
pub use crate::core::{
    Broker, Database, DatabaseConfiguration, DatabaseError, DatabaseResult, DatabaseRow,
    DatabaseType, DatabaseValue, FilterParser, Parameter, Result,
};

pub use backends::build_adapter;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        use prelude::*;

        let db_type = DatabaseType::Mysql;
        assert_eq!(db_type.to_str(), "mysql");
        assert!(db_type.is_networked());

        let clause = WhereClause::new().or(WhereCondition::is_null("deleted_at"));
        assert_eq!(clause.len(), 1);
    }

    #[test]
    fn test_parameter_conversions() {
        use prelude::*;

        let val: Parameter = 42.into();
        assert_eq!(val, Parameter::Integer(42));

        let val: Parameter = 12.3.into();
        assert_eq!(val.as_text(), Some("12.3"));

        let val: Parameter = true.into();
        assert_eq!(val, Parameter::Boolean(true));
    }
}
