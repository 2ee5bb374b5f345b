//! Dialect adapter contract
//!
//! One adapter per database management system isolates everything that differs
//! between dialects: connection strings, pagination, session variables,
//! schema inspection, placeholder syntax and opening the connection.

use super::configuration::DatabaseConfiguration;
use super::connector::DatabaseConnector;
use super::database::Database;
use super::database_types::DatabaseType;
use super::error::{DatabaseError, Result};
use super::parameter::PlaceholderStyle;
use super::sanitize::escape_html;
use super::schema::SchemaInterrogator;
use async_trait::async_trait;

/// Dialect-specific strategy, chosen once per [`Database`]
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Source this adapter was built from
    fn configuration(&self) -> &DatabaseConfiguration;

    /// Dialect handled by this adapter
    fn database_type(&self) -> DatabaseType {
        self.configuration().driver()
    }

    /// Connection string handed to the driver
    fn get_dsn(&self) -> String {
        self.configuration().database_source_name()
    }

    /// Pagination clause
    fn get_sql_limit(&self, limit: u64, offset: Option<u64>) -> String {
        match offset {
            Some(offset) => format!("LIMIT {} OFFSET {}", limit, offset),
            None => format!("LIMIT {}", limit),
        }
    }

    /// Statement that sets a session variable visible to later queries
    fn get_add_environment_variable_clause(&self, name: &str, value: &str) -> Result<String>;

    /// Metadata inspector bound to `database`
    fn build_schema_interrogator<'a>(
        &self,
        database: &'a Database,
    ) -> Box<dyn SchemaInterrogator + 'a>;

    /// Positional placeholder syntax
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::QuestionMark
    }

    /// Trimmed, HTML-escaped copy of `data`, safe to echo back into a page
    fn purify(&self, data: &str) -> String {
        escape_html(data)
    }

    /// Open the live connection
    ///
    /// # Errors
    ///
    /// Any driver failure is reported once, as the fatal
    /// [`DatabaseError::ConnectionFailed`] carrying the driver's message.
    async fn build_connector(&self) -> Result<Box<dyn DatabaseConnector>>;
}

/// Reject anything but `[A-Za-z_][A-Za-z0-9_.]*`
pub(crate) fn validate_variable_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
        Ok(())
    } else {
        Err(DatabaseError::InvalidIdentifier(format!(
            "environment variable name '{}'",
            name
        )))
    }
}

/// Single-quoted SQL string literal
pub(crate) fn quote_literal(value: &str, backslash_escapes: bool) -> String {
    let mut escaped = value.replace('\'', "''");
    if backslash_escapes {
        escaped = escaped.replace('\\', "\\\\");
    }
    format!("'{}'", escaped)
}
