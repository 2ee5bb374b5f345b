//! PostgreSQL dialect
//!
//! The adapter works without any driver. With the `postgres` feature the
//! connector talks to the server through tokio-postgres.
//!
//! Text parameters are sent in the text wire format without a type, so the
//! server converts them to whatever the placeholder needs: `"12.3"` lands
//! in `numeric`, `float8` and `text` columns alike, and strings reach
//! `uuid`, `jsonb` or `interval` columns without casts.

use crate::core::adapter::{quote_literal, validate_variable_name};
use crate::core::{
    Database, DatabaseAdapter, DatabaseConfiguration, DatabaseConnector, DatabaseError,
    DatabaseType, InformationSchemaInterrogator, PlaceholderStyle, Result, SchemaInterrogator,
};
use async_trait::async_trait;

/// PostgreSQL adapter
#[derive(Debug, Clone)]
pub struct PostgresAdapter {
    configuration: DatabaseConfiguration,
}

impl PostgresAdapter {
    /// Create the adapter for `configuration`
    pub fn new(configuration: DatabaseConfiguration) -> Self {
        Self { configuration }
    }
}

#[async_trait]
impl DatabaseAdapter for PostgresAdapter {
    fn configuration(&self) -> &DatabaseConfiguration {
        &self.configuration
    }

    fn get_add_environment_variable_clause(&self, name: &str, value: &str) -> Result<String> {
        validate_variable_name(name)?;
        Ok(format!("SET SESSION \"{}\" = {}", name, quote_literal(value, false)))
    }

    fn build_schema_interrogator<'a>(
        &self,
        database: &'a Database,
    ) -> Box<dyn SchemaInterrogator + 'a> {
        Box::new(InformationSchemaInterrogator::new(
            database,
            "current_schema()",
            PlaceholderStyle::Numbered,
        ))
    }

    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Numbered
    }

    async fn build_connector(&self) -> Result<Box<dyn DatabaseConnector>> {
        #[cfg(feature = "postgres")]
        {
            let connector = PostgresConnector::connect(&self.get_dsn())
                .await
                .map_err(|e| DatabaseError::connection_failed(DatabaseType::Postgres, e.to_string()))?;
            Ok(Box::new(connector))
        }

        #[cfg(not(feature = "postgres"))]
        {
            Err(DatabaseError::connection_failed(
                DatabaseType::Postgres,
                "PostgreSQL support is not enabled (feature `postgres`)",
            ))
        }
    }
}

#[cfg(feature = "postgres")]
pub use connector::PostgresConnector;

#[cfg(feature = "postgres")]
mod connector {
    use crate::core::{
        DatabaseConnector, DatabaseError, DatabaseRow, DatabaseValue, Parameter, QueryOutcome,
        Result, SQL_FORMAT_DATE, SQL_FORMAT_DATE_TIME,
    };
    use async_trait::async_trait;
    use bytes::BytesMut;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use std::error::Error;
    use tokio_postgres::types::{to_sql_checked, Format, IsNull, ToSql, Type};
    use tokio_postgres::{Client, NoTls, Row};
    use tracing::{debug, error};

    type BoundParameter = Box<dyn ToSql + Sync + Send>;

    fn boxed<T: ToSql + Sync + Send + 'static>(value: T) -> BoundParameter {
        Box::new(value)
    }

    /// Text sent in the text wire format, converted by the server
    ///
    /// Accepts every placeholder type, so `"12.3"` lands in `numeric`,
    /// `float8` or `text` columns alike.
    #[derive(Debug)]
    struct TextParameter(String);

    impl ToSql for TextParameter {
        fn to_sql(
            &self,
            _ty: &Type,
            out: &mut BytesMut,
        ) -> std::result::Result<IsNull, Box<dyn Error + Sync + Send>> {
            out.extend_from_slice(self.0.as_bytes());
            Ok(IsNull::No)
        }

        fn accepts(_ty: &Type) -> bool {
            true
        }

        fn encode_format(&self, _ty: &Type) -> Format {
            Format::Text
        }

        to_sql_checked!();
    }

    /// tokio-postgres client owner
    pub struct PostgresConnector {
        client: Client,
    }

    impl PostgresConnector {
        /// Connect with a libpq key/value or `postgresql://` connection string
        pub async fn connect(dsn: &str) -> Result<Self> {
            let (client, connection) = tokio_postgres::connect(dsn, NoTls).await?;

            // The connection object performs the actual communication with the server
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    error!(error = %e, "PostgreSQL connection error");
                }
            });

            Ok(Self { client })
        }

        /// Convert a parameter for a placeholder of type `ty`
        ///
        /// Integers and booleans keep their binary encoding when the
        /// placeholder has a matching native type. Everything else travels
        /// as untyped text and the server converts it.
        fn bind(parameter: &Parameter, ty: &Type) -> BoundParameter {
            match parameter {
                Parameter::Null => boxed(None::<TextParameter>),
                Parameter::Text(text) => boxed(TextParameter(text.clone())),
                Parameter::Integer(value) => match ty.name() {
                    "int8" => boxed(*value),
                    "int4" => match i32::try_from(*value) {
                        Ok(v) => boxed(v),
                        Err(_) => boxed(TextParameter(value.to_string())),
                    },
                    "int2" => match i16::try_from(*value) {
                        Ok(v) => boxed(v),
                        Err(_) => boxed(TextParameter(value.to_string())),
                    },
                    "bool" => boxed(*value != 0),
                    _ => boxed(TextParameter(value.to_string())),
                },
                Parameter::Boolean(value) => match ty.name() {
                    "bool" => boxed(*value),
                    "int2" | "int4" | "int8" | "numeric" => {
                        boxed(TextParameter(i64::from(*value).to_string()))
                    }
                    _ => boxed(TextParameter(value.to_string())),
                },
            }
        }

        fn row_to_database_row(row: &Row) -> Result<DatabaseRow> {
            let mut db_row = DatabaseRow::with_capacity(row.len());

            for (idx, column) in row.columns().iter().enumerate() {
                let value = match column.type_().name() {
                    "bool" => row
                        .try_get::<_, Option<bool>>(idx)?
                        .map(DatabaseValue::Bool),
                    "char" => row
                        .try_get::<_, Option<i8>>(idx)?
                        .map(|v| DatabaseValue::Int(i32::from(v))),
                    "int2" => row
                        .try_get::<_, Option<i16>>(idx)?
                        .map(|v| DatabaseValue::Int(i32::from(v))),
                    "int4" => row
                        .try_get::<_, Option<i32>>(idx)?
                        .map(DatabaseValue::Int),
                    "int8" => row
                        .try_get::<_, Option<i64>>(idx)?
                        .map(DatabaseValue::Long),
                    "oid" => row
                        .try_get::<_, Option<u32>>(idx)?
                        .map(|v| DatabaseValue::Long(i64::from(v))),
                    "float4" => row
                        .try_get::<_, Option<f32>>(idx)?
                        .map(DatabaseValue::Float),
                    "float8" => row
                        .try_get::<_, Option<f64>>(idx)?
                        .map(DatabaseValue::Double),
                    "bytea" => row
                        .try_get::<_, Option<Vec<u8>>>(idx)?
                        .map(DatabaseValue::Bytes),
                    "date" => row
                        .try_get::<_, Option<NaiveDate>>(idx)?
                        .map(|v| DatabaseValue::String(v.format(SQL_FORMAT_DATE).to_string())),
                    "timestamp" => row
                        .try_get::<_, Option<NaiveDateTime>>(idx)?
                        .map(|v| DatabaseValue::String(v.format(SQL_FORMAT_DATE_TIME).to_string())),
                    "timestamptz" => row
                        .try_get::<_, Option<DateTime<Utc>>>(idx)?
                        .map(|v| DatabaseValue::String(v.format("%Y-%m-%d %H:%M:%S%:z").to_string())),
                    _ => match row.try_get::<_, Option<String>>(idx) {
                        Ok(value) => value.map(DatabaseValue::String),
                        Err(e) => {
                            debug!(
                                column = column.name(),
                                ty = column.type_().name(),
                                error = %e,
                                "unsupported column type read as NULL"
                            );
                            None
                        }
                    },
                };
                db_row.insert(column.name(), value.unwrap_or(DatabaseValue::Null));
            }

            Ok(db_row)
        }
    }

    #[async_trait]
    impl DatabaseConnector for PostgresConnector {
        async fn execute(&self, sql: &str, parameters: &[Parameter]) -> Result<QueryOutcome> {
            let statement = self.client.prepare(sql).await?;

            let expected = statement.params().len();
            if expected != parameters.len() {
                return Err(DatabaseError::other(format!(
                    "statement expects {} parameters, {} given",
                    expected,
                    parameters.len()
                )));
            }

            let bound = parameters
                .iter()
                .zip(statement.params())
                .map(|(parameter, ty)| Self::bind(parameter, ty))
                .collect::<Vec<_>>();
            let param_refs: Vec<&(dyn ToSql + Sync)> = bound
                .iter()
                .map(|p| p.as_ref() as &(dyn ToSql + Sync))
                .collect();

            if statement.columns().is_empty() {
                let affected = self.client.execute(&statement, &param_refs).await?;
                return Ok(QueryOutcome {
                    rows: Vec::new(),
                    affected_rows: affected,
                });
            }

            let rows = self.client.query(&statement, &param_refs).await?;
            let results = rows
                .iter()
                .map(Self::row_to_database_row)
                .collect::<Result<Vec<_>>>()?;

            Ok(QueryOutcome {
                affected_rows: results.len() as u64,
                rows: results,
            })
        }

        async fn begin_transaction(&self) -> Result<()> {
            Ok(self.client.batch_execute("BEGIN").await?)
        }

        async fn commit(&self) -> Result<()> {
            Ok(self.client.batch_execute("COMMIT").await?)
        }

        async fn rollback(&self) -> Result<()> {
            Ok(self.client.batch_execute("ROLLBACK").await?)
        }

        async fn last_insert_id(&self, sequence: Option<&str>) -> Result<i64> {
            let row = match sequence {
                Some(sequence) => {
                    self.client
                        .query_one("SELECT currval($1::text::regclass)", &[&sequence])
                        .await?
                }
                None => self.client.query_one("SELECT lastval()", &[]).await?,
            };
            Ok(row.try_get::<_, i64>(0)?)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn get_postgres_url() -> Option<String> {
            std::env::var("POSTGRES_URL").ok()
        }

        fn encodes(parameter: &Parameter, ty: &Type) -> bool {
            let bound = PostgresConnector::bind(parameter, ty);
            let mut buf = BytesMut::new();
            bound.to_sql_checked(ty, &mut buf).is_ok()
        }

        #[test]
        fn test_text_binds_to_any_placeholder_type() {
            let types = [
                Type::NUMERIC,
                Type::UUID,
                Type::JSONB,
                Type::INTERVAL,
                Type::INET,
                Type::FLOAT8,
                Type::DATE,
                Type::TEXT,
            ];
            for ty in &types {
                assert!(encodes(&Parameter::from(12.3), ty), "float as {}", ty.name());
                assert!(encodes(&Parameter::Null, ty), "null as {}", ty.name());
            }
            assert!(encodes(
                &Parameter::from("a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11"),
                &Type::UUID
            ));
        }

        #[test]
        fn test_float_is_sent_as_text() {
            let bound = PostgresConnector::bind(&Parameter::from(12.3), &Type::NUMERIC);
            let mut buf = BytesMut::new();
            assert!(bound.to_sql_checked(&Type::NUMERIC, &mut buf).is_ok());
            assert_eq!(&buf[..], b"12.3");
            assert!(matches!(bound.encode_format(&Type::NUMERIC), Format::Text));
        }

        #[test]
        fn test_integers_and_booleans_bind_to_other_types() {
            assert!(encodes(&Parameter::Integer(42), &Type::NUMERIC));
            assert!(encodes(&Parameter::Integer(42), &Type::INT4));
            assert!(encodes(&Parameter::Integer(i64::MAX), &Type::INT2));
            assert!(encodes(&Parameter::Integer(1), &Type::BOOL));
            assert!(encodes(&Parameter::Boolean(true), &Type::INT8));
            assert!(encodes(&Parameter::Boolean(false), &Type::TEXT));
            assert!(encodes(&Parameter::Boolean(true), &Type::BOOL));
        }

        #[tokio::test]
        #[ignore] // Run with: cargo test --features postgres -- --ignored
        async fn test_postgres_query_roundtrip() -> Result<()> {
            let Some(url) = get_postgres_url() else {
                return Ok(());
            };
            let connector = PostgresConnector::connect(&url).await?;

            connector
                .execute(
                    "CREATE TEMP TABLE broker_test (id SERIAL PRIMARY KEY, name TEXT, score FLOAT8, price NUMERIC(10, 2))",
                    &[],
                )
                .await?;
            let outcome = connector
                .execute(
                    "INSERT INTO broker_test (name, score, price) VALUES ($1, $2, $3)",
                    &["Alice".into(), 12.3.into(), 12.3.into()],
                )
                .await?;
            assert_eq!(outcome.affected_rows, 1);
            assert_eq!(connector.last_insert_id(Some("broker_test_id_seq")).await?, 1);
            assert_eq!(connector.last_insert_id(None).await?, 1);

            let outcome = connector
                .execute("SELECT name, score FROM broker_test WHERE name = $1", &["Alice".into()])
                .await?;
            assert_eq!(outcome.rows.len(), 1);
            assert_eq!(outcome.rows[0].get("score"), Some(&DatabaseValue::Double(12.3)));

            let outcome = connector
                .execute(
                    "SELECT price::text AS price FROM broker_test WHERE price > $1",
                    &[10.into()],
                )
                .await?;
            assert_eq!(
                outcome.rows[0].get("price"),
                Some(&DatabaseValue::String("12.30".to_string()))
            );
            Ok(())
        }

        #[tokio::test]
        #[ignore]
        async fn test_postgres_transaction_rollback() -> Result<()> {
            let Some(url) = get_postgres_url() else {
                return Ok(());
            };
            let connector = PostgresConnector::connect(&url).await?;

            connector
                .execute("CREATE TEMP TABLE broker_tx (value INT4)", &[])
                .await?;
            connector.begin_transaction().await?;
            connector
                .execute("INSERT INTO broker_tx (value) VALUES ($1)", &[7.into()])
                .await?;
            connector.rollback().await?;

            let outcome = connector.execute("SELECT value FROM broker_tx", &[]).await?;
            assert!(outcome.rows.is_empty());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> Result<PostgresAdapter> {
        Ok(PostgresAdapter::new(
            DatabaseConfiguration::builder(DatabaseType::Postgres)
                .host("localhost")
                .database("app")
                .build()?,
        ))
    }

    #[test]
    fn test_environment_variable_clause() -> Result<()> {
        let adapter = adapter()?;
        assert_eq!(
            adapter.get_add_environment_variable_clause("app.user_id", "42")?,
            "SET SESSION \"app.user_id\" = '42'"
        );
        assert_eq!(
            adapter.get_add_environment_variable_clause("app.name", "O'Brien")?,
            "SET SESSION \"app.name\" = 'O''Brien'"
        );
        assert!(adapter
            .get_add_environment_variable_clause("bad\"name", "x")
            .is_err());
        Ok(())
    }

    #[test]
    fn test_default_dsn() -> Result<()> {
        assert_eq!(adapter()?.get_dsn(), "host=localhost port=5432 dbname=app");
        Ok(())
    }
}
