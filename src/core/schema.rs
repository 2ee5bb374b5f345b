//! Schema inspection
//!
//! Dialect-specific metadata queries behind one trait. PostgreSQL and MySQL
//! both expose `information_schema`, so they share one implementation that
//! only differs in how the current schema is named.

use super::database::Database;
use super::error::Result;
use super::parameter::PlaceholderStyle;
use super::value::DatabaseRow;
use async_trait::async_trait;

/// Column metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,
    /// Declared type as reported by the server
    pub data_type: String,
    /// Whether NULL is accepted
    pub nullable: bool,
    /// Default expression, if any
    pub default_value: Option<String>,
}

/// Metadata inspector for one database
#[async_trait]
pub trait SchemaInterrogator: Send + Sync {
    /// User tables, sorted by name
    async fn get_tables(&self) -> Result<Vec<String>>;

    /// Columns of `table`, in declaration order
    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>>;

    /// Whether `table` exists
    async fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(self.get_tables().await?.iter().any(|name| name == table))
    }
}

/// `information_schema` inspector shared by PostgreSQL and MySQL
pub struct InformationSchemaInterrogator<'a> {
    database: &'a Database,
    schema_expression: &'static str,
    placeholder: PlaceholderStyle,
}

impl<'a> InformationSchemaInterrogator<'a> {
    /// `schema_expression` is the SQL naming the current schema
    /// (`current_schema()`, `DATABASE()`).
    pub fn new(
        database: &'a Database,
        schema_expression: &'static str,
        placeholder: PlaceholderStyle,
    ) -> Self {
        Self {
            database,
            schema_expression,
            placeholder,
        }
    }
}

#[async_trait]
impl SchemaInterrogator for InformationSchemaInterrogator<'_> {
    async fn get_tables(&self) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT CAST(table_name AS CHAR(255)) AS table_name \
             FROM information_schema.tables \
             WHERE table_schema = {} AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
            self.schema_expression
        );
        let statement = self.database.query(&sql, &[]).await?;
        Ok(statement
            .into_iter()
            .filter_map(|row| text_field(&row, "table_name"))
            .collect())
    }

    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let sql = format!(
            "SELECT CAST(column_name AS CHAR(255)) AS column_name, \
                    CAST(data_type AS CHAR(255)) AS data_type, \
                    CAST(is_nullable AS CHAR(3)) AS is_nullable, \
                    CAST(column_default AS CHAR(1024)) AS column_default \
             FROM information_schema.columns \
             WHERE table_schema = {} AND CAST(table_name AS CHAR(255)) = {} \
             ORDER BY ordinal_position",
            self.schema_expression,
            self.placeholder.placeholder(1)
        );
        let statement = self.database.query(&sql, &[table.into()]).await?;
        Ok(statement
            .into_iter()
            .filter_map(|row| {
                Some(ColumnDescriptor {
                    name: text_field(&row, "column_name")?,
                    data_type: text_field(&row, "data_type").unwrap_or_default(),
                    nullable: text_field(&row, "is_nullable")
                        .is_some_and(|v| v.eq_ignore_ascii_case("yes")),
                    default_value: text_field(&row, "column_default"),
                })
            })
            .collect())
    }
}

pub(crate) fn text_field(row: &DatabaseRow, name: &str) -> Option<String> {
    row.get(name)
        .filter(|value| !value.is_null())
        .map(|value| value.as_string().trim_end().to_string())
}
