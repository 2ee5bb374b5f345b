//! Live connection contract

use super::error::Result;
use super::parameter::Parameter;
use super::statement::QueryOutcome;
use async_trait::async_trait;

/// Owner of one live connection
///
/// Connectors report driver failures as-is; the [`Database`](crate::core::Database)
/// facade decides which tier an error belongs to and attaches the SQL text.
/// Implementations are not expected to track transaction state.
#[async_trait]
pub trait DatabaseConnector: Send + Sync {
    /// Prepare `sql`, bind `parameters` positionally and execute it
    async fn execute(&self, sql: &str, parameters: &[Parameter]) -> Result<QueryOutcome>;

    /// Open a transaction on the connection
    async fn begin_transaction(&self) -> Result<()>;

    /// Commit the open transaction
    async fn commit(&self) -> Result<()>;

    /// Roll back the open transaction
    async fn rollback(&self) -> Result<()>;

    /// Identifier generated by the last insert on this connection.
    /// `sequence` names the sequence to read where the dialect has them.
    async fn last_insert_id(&self, sequence: Option<&str>) -> Result<i64>;
}
