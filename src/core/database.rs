//! Database facade
//!
//! The single entry point for query execution and transaction control. A
//! `Database` owns exactly one dialect adapter and one live connector for its
//! whole lifetime.
//!
//! # Thread Safety
//!
//! `Database` is `Send + Sync` and may be shared by many brokers, but the
//! transaction flag is instance-wide: interleaving transactional work from
//! several tasks on one instance needs external synchronization.

use super::adapter::DatabaseAdapter;
use super::configuration::DatabaseConfiguration;
use super::connector::DatabaseConnector;
use super::database_types::DatabaseType;
use super::error::{DatabaseError, Result};
use super::parameter::Parameter;
use super::schema::SchemaInterrogator;
use super::statement::DatabaseStatement;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info};

/// Query and transaction facade over one connection
pub struct Database {
    adapter: Box<dyn DatabaseAdapter>,
    connector: Box<dyn DatabaseConnector>,
    in_transaction: AtomicBool,
}

impl Database {
    /// Build the adapter for `configuration` and open its connection
    ///
    /// # Errors
    ///
    /// Returns the fatal [`DatabaseError::ConnectionFailed`] when the
    /// connection cannot be established.
    pub async fn connect(configuration: DatabaseConfiguration) -> Result<Self> {
        let adapter = crate::backends::build_adapter(configuration);
        info!(driver = %adapter.database_type(), "opening database connection");
        let connector = adapter.build_connector().await?;
        Ok(Self::new(adapter, connector))
    }

    /// Assemble a facade from an adapter and an already opened connector
    pub fn new(adapter: Box<dyn DatabaseAdapter>, connector: Box<dyn DatabaseConnector>) -> Self {
        Self {
            adapter,
            connector,
            in_transaction: AtomicBool::new(false),
        }
    }

    /// Execute a parametrized statement
    ///
    /// Parameters bind positionally to the dialect's placeholders
    /// (`?` or `$n`). The returned statement is positioned before its first row.
    ///
    /// # Errors
    ///
    /// Prepare, bind and execute failures are reported as the recoverable
    /// [`DatabaseError::Query`] carrying `sql`.
    pub async fn query(&self, sql: &str, parameters: &[Parameter]) -> Result<DatabaseStatement> {
        debug!(sql, parameters = parameters.len(), "executing query");
        match self.connector.execute(sql, parameters).await {
            Ok(outcome) => Ok(DatabaseStatement::new(outcome)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => Err(DatabaseError::query_failed(sql, e.to_string())),
        }
    }

    /// Open a transaction
    ///
    /// Nested transactions are not supported: calling this while a
    /// transaction is active fails with [`DatabaseError::Transaction`].
    pub async fn begin_transaction(&self) -> Result<()> {
        if self.in_transaction.swap(true, Ordering::AcqRel) {
            return Err(DatabaseError::transaction(
                "Already in a transaction, nested transactions are not supported",
            ));
        }

        if let Err(e) = self.connector.begin_transaction().await {
            self.in_transaction.store(false, Ordering::Release);
            return Err(if e.is_fatal() {
                e
            } else {
                DatabaseError::transaction(e.to_string())
            });
        }

        debug!("transaction started");
        Ok(())
    }

    /// Commit the active transaction
    ///
    /// # Errors
    ///
    /// A failing commit is fatal ([`DatabaseError::CommitFailed`]); the
    /// transaction stays flagged as open so a rollback can still be attempted.
    pub async fn commit(&self) -> Result<()> {
        if !self.in_transaction.load(Ordering::Acquire) {
            return Err(DatabaseError::transaction("Not in a transaction"));
        }

        match self.connector.commit().await {
            Ok(()) => {
                self.in_transaction.store(false, Ordering::Release);
                debug!("transaction committed");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "transaction commit failed");
                Err(DatabaseError::CommitFailed(e.to_string()))
            }
        }
    }

    /// Roll back the active transaction
    ///
    /// # Errors
    ///
    /// A failing rollback is fatal ([`DatabaseError::RollbackFailed`]).
    pub async fn rollback(&self) -> Result<()> {
        if !self.in_transaction.load(Ordering::Acquire) {
            return Err(DatabaseError::transaction("Not in a transaction"));
        }

        let result = self.connector.rollback().await;
        self.in_transaction.store(false, Ordering::Release);
        result.map_err(|e| {
            error!(error = %e, "transaction rollback failed");
            DatabaseError::RollbackFailed(e.to_string())
        })?;

        debug!("transaction rolled back");
        Ok(())
    }

    /// Whether a transaction is active on this instance
    pub fn in_transaction(&self) -> bool {
        self.in_transaction.load(Ordering::Acquire)
    }

    /// Identifier generated by the last insert
    ///
    /// `sequence` is only meaningful for PostgreSQL (`currval`); without it
    /// PostgreSQL reports `lastval()`.
    pub async fn get_last_inserted_id(&self, sequence: Option<&str>) -> Result<i64> {
        self.connector.last_insert_id(sequence).await
    }

    /// Metadata inspector for this database
    pub fn get_schema_interrogator(&self) -> Box<dyn SchemaInterrogator + '_> {
        self.adapter.build_schema_interrogator(self)
    }

    /// Set a session variable through the dialect's clause
    pub async fn add_environment_variable(&self, name: &str, value: &str) -> Result<()> {
        let clause = self
            .adapter
            .get_add_environment_variable_clause(name, value)?;
        self.query(&clause, &[]).await?;
        Ok(())
    }

    /// Configured source
    pub fn get_source(&self) -> &DatabaseConfiguration {
        self.adapter.configuration()
    }

    /// Dialect adapter
    pub fn get_adapter(&self) -> &dyn DatabaseAdapter {
        self.adapter.as_ref()
    }

    /// Dialect of this database
    pub fn database_type(&self) -> DatabaseType {
        self.adapter.database_type()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("source", self.get_source())
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}
