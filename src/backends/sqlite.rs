//! SQLite dialect
//!
//! The adapter, the `sqlite_master`/`pragma_table_info` schema inspector and,
//! with the `sqlite` feature, a rusqlite connector. rusqlite is blocking, so
//! every connector call runs on tokio's blocking pool.

use crate::core::schema::text_field;
use crate::core::{
    ColumnDescriptor, Database, DatabaseAdapter, DatabaseConfiguration, DatabaseConnector,
    DatabaseError, DatabaseType, Result, SchemaInterrogator,
};
use async_trait::async_trait;

/// SQLite adapter
#[derive(Debug, Clone)]
pub struct SqliteAdapter {
    configuration: DatabaseConfiguration,
}

impl SqliteAdapter {
    /// Create the adapter for `configuration`
    pub fn new(configuration: DatabaseConfiguration) -> Self {
        Self { configuration }
    }
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    fn configuration(&self) -> &DatabaseConfiguration {
        &self.configuration
    }

    /// The file path, or `:memory:` when no database is named
    fn get_dsn(&self) -> String {
        match self.configuration.database() {
            "" => ":memory:".to_string(),
            path => path.to_string(),
        }
    }

    fn get_add_environment_variable_clause(&self, name: &str, _value: &str) -> Result<String> {
        Err(DatabaseError::unsupported(format!(
            "SQLite has no session variables (tried to set '{}')",
            name
        )))
    }

    fn build_schema_interrogator<'a>(
        &self,
        database: &'a Database,
    ) -> Box<dyn SchemaInterrogator + 'a> {
        Box::new(SqliteSchemaInterrogator::new(database))
    }

    async fn build_connector(&self) -> Result<Box<dyn DatabaseConnector>> {
        #[cfg(feature = "sqlite")]
        {
            let connector = SqliteConnector::open(&self.get_dsn())
                .await
                .map_err(|e| DatabaseError::connection_failed(DatabaseType::Sqlite, e.to_string()))?;
            Ok(Box::new(connector))
        }

        #[cfg(not(feature = "sqlite"))]
        {
            Err(DatabaseError::connection_failed(
                DatabaseType::Sqlite,
                "SQLite support is not enabled (feature `sqlite`)",
            ))
        }
    }
}

/// Schema inspector reading `sqlite_master`
pub struct SqliteSchemaInterrogator<'a> {
    database: &'a Database,
}

impl<'a> SqliteSchemaInterrogator<'a> {
    /// Create an inspector for `database`
    pub fn new(database: &'a Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl SchemaInterrogator for SqliteSchemaInterrogator<'_> {
    async fn get_tables(&self) -> Result<Vec<String>> {
        let statement = self
            .database
            .query(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
                 ORDER BY name",
                &[],
            )
            .await?;
        Ok(statement
            .into_iter()
            .filter_map(|row| text_field(&row, "name"))
            .collect())
    }

    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let statement = self
            .database
            .query(
                "SELECT name, type, \"notnull\", dflt_value \
                 FROM pragma_table_info(?) ORDER BY cid",
                &[table.into()],
            )
            .await?;
        Ok(statement
            .into_iter()
            .filter_map(|row| {
                Some(ColumnDescriptor {
                    name: text_field(&row, "name")?,
                    data_type: text_field(&row, "type").unwrap_or_default(),
                    nullable: row.get("notnull").and_then(|v| v.as_long()) == Some(0),
                    default_value: text_field(&row, "dflt_value"),
                })
            })
            .collect())
    }
}

#[cfg(feature = "sqlite")]
pub use connector::SqliteConnector;

#[cfg(feature = "sqlite")]
mod connector {
    use crate::core::{
        DatabaseConnector, DatabaseError, DatabaseRow, DatabaseValue, Parameter, QueryOutcome,
        Result,
    };
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rusqlite::types::{Value, ValueRef};
    use rusqlite::{params_from_iter, Connection, Row};
    use std::sync::Arc;

    /// rusqlite connection owner
    pub struct SqliteConnector {
        connection: Arc<Mutex<Connection>>,
    }

    impl SqliteConnector {
        /// Open `path` (`:memory:` for an in-memory database)
        pub async fn open(path: &str) -> Result<Self> {
            let path = path.to_string();
            let connection = tokio::task::spawn_blocking(move || -> Result<Connection> {
                let conn = Connection::open(&path)?;
                conn.execute_batch("PRAGMA foreign_keys = ON")?;
                Ok(conn)
            })
            .await
            .map_err(|e| DatabaseError::other(format!("Task join error: {}", e)))??;

            Ok(Self {
                connection: Arc::new(Mutex::new(connection)),
            })
        }

        /// Run `f` against the connection on the blocking pool
        async fn with_connection<T, F>(&self, f: F) -> Result<T>
        where
            T: Send + 'static,
            F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        {
            let connection = Arc::clone(&self.connection);
            tokio::task::spawn_blocking(move || {
                let conn = connection.lock();
                f(&conn)
            })
            .await
            .map_err(|e| DatabaseError::other(format!("Task join error: {}", e)))?
        }

        fn to_value(parameter: &Parameter) -> Value {
            match parameter {
                Parameter::Text(v) => Value::Text(v.clone()),
                Parameter::Integer(v) => Value::Integer(*v),
                Parameter::Boolean(v) => Value::Integer(i64::from(*v)),
                Parameter::Null => Value::Null,
            }
        }

        fn row_to_database_row(row: &Row, columns: &[String]) -> rusqlite::Result<DatabaseRow> {
            let mut db_row = DatabaseRow::with_capacity(columns.len());
            for (i, column_name) in columns.iter().enumerate() {
                let value = match row.get_ref(i)? {
                    ValueRef::Null => DatabaseValue::Null,
                    ValueRef::Integer(v) => DatabaseValue::Long(v),
                    ValueRef::Real(v) => DatabaseValue::Double(v),
                    ValueRef::Text(v) => DatabaseValue::String(String::from_utf8_lossy(v).into_owned()),
                    ValueRef::Blob(v) => DatabaseValue::Bytes(v.to_vec()),
                };
                db_row.insert(column_name.clone(), value);
            }
            Ok(db_row)
        }
    }

    #[async_trait]
    impl DatabaseConnector for SqliteConnector {
        async fn execute(&self, sql: &str, parameters: &[Parameter]) -> Result<QueryOutcome> {
            let sql = sql.to_string();
            let values: Vec<Value> = parameters.iter().map(Self::to_value).collect();

            self.with_connection(move |conn| {
                let mut stmt = conn.prepare(&sql)?;

                if stmt.column_count() == 0 {
                    let affected = stmt.execute(params_from_iter(values.iter()))?;
                    return Ok(QueryOutcome {
                        rows: Vec::new(),
                        affected_rows: affected as u64,
                    });
                }

                let columns: Vec<String> = stmt
                    .column_names()
                    .into_iter()
                    .map(String::from)
                    .collect();
                let mut rows = stmt.query(params_from_iter(values.iter()))?;
                let mut results = Vec::new();
                while let Some(row) = rows.next()? {
                    results.push(Self::row_to_database_row(row, &columns)?);
                }

                Ok(QueryOutcome {
                    affected_rows: results.len() as u64,
                    rows: results,
                })
            })
            .await
        }

        async fn begin_transaction(&self) -> Result<()> {
            self.with_connection(|conn| Ok(conn.execute_batch("BEGIN TRANSACTION")?))
                .await
        }

        async fn commit(&self) -> Result<()> {
            self.with_connection(|conn| Ok(conn.execute_batch("COMMIT")?))
                .await
        }

        async fn rollback(&self) -> Result<()> {
            self.with_connection(|conn| Ok(conn.execute_batch("ROLLBACK")?))
                .await
        }

        async fn last_insert_id(&self, _sequence: Option<&str>) -> Result<i64> {
            self.with_connection(|conn| Ok(conn.last_insert_rowid()))
                .await
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_sqlite_execute_and_select() -> Result<()> {
            let connector = SqliteConnector::open(":memory:").await?;
            connector
                .execute("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT, score REAL)", &[])
                .await?;

            let outcome = connector
                .execute(
                    "INSERT INTO test (name, score) VALUES (?, ?)",
                    &[Parameter::from("Alice"), Parameter::from(12.5)],
                )
                .await?;
            assert_eq!(outcome.affected_rows, 1);
            assert!(outcome.rows.is_empty());

            let outcome = connector.execute("SELECT id, name, score FROM test", &[]).await?;
            assert_eq!(outcome.rows.len(), 1);
            let row = &outcome.rows[0];
            let columns: Vec<&str> = row.columns().collect();
            assert_eq!(columns, vec!["id", "name", "score"]);
            assert_eq!(row.get("name").and_then(|v| v.as_str()), Some("Alice"));
            // text bound into a REAL column is converted by column affinity
            assert_eq!(row.get("score"), Some(&DatabaseValue::Double(12.5)));
            Ok(())
        }

        #[tokio::test]
        async fn test_sqlite_booleans_and_nulls() -> Result<()> {
            let connector = SqliteConnector::open(":memory:").await?;
            let outcome = connector
                .execute("SELECT ? AS flag, ? AS nothing", &[true.into(), Parameter::Null])
                .await?;
            let row = &outcome.rows[0];
            assert_eq!(row.get("flag"), Some(&DatabaseValue::Long(1)));
            assert_eq!(row.get("nothing"), Some(&DatabaseValue::Null));
            Ok(())
        }

        #[tokio::test]
        async fn test_sqlite_parameter_count_mismatch() -> Result<()> {
            let connector = SqliteConnector::open(":memory:").await?;
            let result = connector.execute("SELECT ?", &[]).await;
            assert!(result.is_err());
            Ok(())
        }

        #[tokio::test]
        async fn test_sqlite_open_failure() {
            let result = SqliteConnector::open("/nonexistent/directory/app.db").await;
            assert!(result.is_err());
        }
    }
}
