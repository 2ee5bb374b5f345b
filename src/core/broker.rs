//! Broker
//!
//! Convenience layer that application data-access objects build on: row
//! cardinality helpers, pagination, scoped transactions and natural sorting.
//! A broker borrows its [`Database`]; many brokers may share one.

use super::database::Database;
use super::error::{DatabaseError, Result};
use super::natural::natural_cmp;
use super::parameter::{Parameter, SQL_FORMAT_DATE, SQL_FORMAT_DATE_TIME};
use super::statement::DatabaseStatement;
use super::value::DatabaseRow;
use std::fmt::Display;
use std::future::Future;
use tracing::warn;

/// Query helpers over a shared [`Database`]
#[derive(Debug, Clone)]
pub struct Broker<'db> {
    database: &'db Database,
    allowed_html_tags: Option<String>,
}

impl<'db> Broker<'db> {
    /// `chrono` format of SQL dates
    pub const SQL_FORMAT_DATE: &'static str = SQL_FORMAT_DATE;

    /// `chrono` format of SQL date-times
    pub const SQL_FORMAT_DATE_TIME: &'static str = SQL_FORMAT_DATE_TIME;

    pub fn new(database: &'db Database) -> Self {
        Self {
            database,
            allowed_html_tags: None,
        }
    }

    /// Strip HTML from text values returned by [`select_unique`](Self::select_unique)
    /// and [`select_all`](Self::select_all), keeping only `tags` (e.g. `"<b><i>"`)
    #[must_use]
    pub fn with_allowed_html_tags(mut self, tags: impl Into<String>) -> Self {
        self.allowed_html_tags = Some(tags.into());
        self
    }

    pub fn database(&self) -> &'db Database {
        self.database
    }

    /// Raw statement, without sanitization
    pub async fn query(&self, sql: &str, parameters: &[Parameter]) -> Result<DatabaseStatement> {
        self.database.query(sql, parameters).await
    }

    async fn sanitized_query(
        &self,
        sql: &str,
        parameters: &[Parameter],
    ) -> Result<DatabaseStatement> {
        let mut statement = self.database.query(sql, parameters).await?;
        if let Some(tags) = &self.allowed_html_tags {
            statement.set_allowed_html_tags(tags);
        }
        Ok(statement)
    }

    /// The only row of a SELECT, or `None` when it returns nothing
    ///
    /// # Errors
    ///
    /// [`DatabaseError::NotUnique`] when more than one row comes back.
    pub async fn select_unique(
        &self,
        sql: &str,
        parameters: &[Parameter],
    ) -> Result<Option<DatabaseRow>> {
        let mut statement = self.sanitized_query(sql, parameters).await?;
        match statement.count() {
            0 => Ok(None),
            1 => Ok(statement.next()),
            count => Err(DatabaseError::NotUnique {
                sql: sql.to_string(),
                count,
            }),
        }
    }

    /// Every row of a SELECT, in result order
    pub async fn select_all(&self, sql: &str, parameters: &[Parameter]) -> Result<Vec<DatabaseRow>> {
        let statement = self.sanitized_query(sql, parameters).await?;
        Ok(statement.into_iter().collect())
    }

    /// [`select_all`](Self::select_all) with the dialect's LIMIT clause appended
    pub async fn select_page(
        &self,
        sql: &str,
        parameters: &[Parameter],
        limit: u64,
        offset: Option<u64>,
    ) -> Result<Vec<DatabaseRow>> {
        let paged = format!(
            "{} {}",
            sql.trim_end(),
            self.database.get_adapter().get_sql_limit(limit, offset)
        );
        self.select_all(&paged, parameters).await
    }

    /// Run `callback` inside a transaction
    ///
    /// Commits when the callback succeeds. When the callback fails, or the
    /// commit does, the transaction is rolled back and the failure message is
    /// returned as [`DatabaseError::TransactionAborted`]. A failing rollback
    /// returns its own fatal error instead. A failing begin is returned as is
    /// and nothing is rolled back.
    ///
    /// ```no_run
    /// # use rust_database_broker::core::{Broker, Database, DatabaseError};
    /// # async fn example(database: &Database) -> Result<(), DatabaseError> {
    /// let broker = Broker::new(database);
    /// let id = broker
    ///     .transaction(|db| async move {
    ///         db.query("INSERT INTO users (name) VALUES (?)", &["bob".into()])
    ///             .await?;
    ///         db.get_last_inserted_id(None).await
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn transaction<F, Fut, T, E>(&self, callback: F) -> Result<T>
    where
        F: FnOnce(&'db Database) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Display,
    {
        self.database.begin_transaction().await?;

        let message = match callback(self.database).await {
            Ok(value) => match self.database.commit().await {
                Ok(()) => return Ok(value),
                Err(e) => e.to_string(),
            },
            Err(e) => e.to_string(),
        };

        warn!(error = %message, "rolling back transaction");
        self.database.rollback().await?;
        Err(DatabaseError::TransactionAborted(message))
    }

    pub async fn get_last_inserted_id(&self, sequence: Option<&str>) -> Result<i64> {
        self.database.get_last_inserted_id(sequence).await
    }

    /// Stable sort of `objects` by the natural order of `key`
    pub fn natural_sort<T, F, K>(mut objects: Vec<T>, key: F) -> Vec<T>
    where
        F: Fn(&T) -> K,
        K: AsRef<str>,
    {
        objects.sort_by(|a, b| natural_cmp(key(a).as_ref(), key(b).as_ref()));
        objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_sort() {
        let sorted = Broker::natural_sort(vec!["A10", "A2", "A1"], |s| *s);
        assert_eq!(sorted, vec!["A1", "A2", "A10"]);
    }

    #[test]
    fn test_natural_sort_is_stable() {
        let items = vec![("B1", 1), ("a", 2), ("B1", 3), ("B01", 4)];
        let sorted = Broker::natural_sort(items, |item| item.0.to_string());
        assert_eq!(sorted, vec![("B1", 1), ("B1", 3), ("B01", 4), ("a", 2)]);
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(Broker::SQL_FORMAT_DATE, "%Y-%m-%d");
        assert_eq!(Broker::SQL_FORMAT_DATE_TIME, "%Y-%m-%d %H:%M:%S");
    }

    #[cfg(feature = "sqlite")]
    mod sqlite {
        use super::*;
        use crate::core::{DatabaseConfiguration, DatabaseType};

        async fn database() -> Result<Database> {
            let db = Database::connect(DatabaseConfiguration::builder(DatabaseType::Sqlite).build()?)
                .await?;
            db.query("CREATE TABLE item (id INTEGER PRIMARY KEY, label TEXT)", &[])
                .await?;
            Ok(db)
        }

        #[tokio::test]
        async fn test_select_unique_cardinality() -> Result<()> {
            let db = database().await?;
            let broker = Broker::new(&db);
            let sql = "SELECT label FROM item WHERE label LIKE ?";

            assert!(broker.select_unique(sql, &["x%".into()]).await?.is_none());

            db.query("INSERT INTO item (label) VALUES ('x1'), ('x2')", &[])
                .await?;
            let row = broker.select_unique(sql, &["x1".into()]).await?;
            assert_eq!(
                row.and_then(|r| r.get("label").map(|v| v.as_string())),
                Some("x1".to_string())
            );

            let err = broker.select_unique(sql, &["x%".into()]).await.err();
            assert!(matches!(err, Some(DatabaseError::NotUnique { count: 2, .. })));
            Ok(())
        }

        #[tokio::test]
        async fn test_transaction_failure_rolls_back() -> Result<()> {
            let db = database().await?;
            let broker = Broker::new(&db);

            let result: Result<()> = broker
                .transaction(|db| async move {
                    db.query("INSERT INTO item (label) VALUES ('lost')", &[])
                        .await?;
                    Err::<(), _>(DatabaseError::other("validation failed"))
                })
                .await;

            match result {
                Err(DatabaseError::TransactionAborted(message)) => {
                    assert_eq!(message, "validation failed")
                }
                other => panic!("unexpected result: {:?}", other),
            }
            assert!(!db.in_transaction());
            assert!(broker.select_all("SELECT * FROM item", &[]).await?.is_empty());
            Ok(())
        }
    }
}
