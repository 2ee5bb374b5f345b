//! Core data-access types and traits
//!
//! Dialect-independent building blocks: configuration, the adapter and
//! connector contracts, the [`Database`] facade, the [`Broker`] helpers,
//! result cursors, errors and WHERE clause construction.

pub mod adapter;
pub mod broker;
pub mod configuration;
pub mod connector;
pub mod database;
pub mod database_types;
pub mod error;
pub mod filter;
pub mod natural;
pub mod parameter;
pub mod sanitize;
pub mod schema;
pub mod statement;
pub mod value;
pub mod where_clause;

// Re-export commonly used types
pub use adapter::DatabaseAdapter;
pub use broker::Broker;
pub use configuration::{ConfigurationBuilder, DatabaseConfiguration};
pub use connector::DatabaseConnector;
pub use database::Database;
pub use database_types::DatabaseType;
pub use error::{DatabaseError, Result};
pub use filter::{FilterOperator, FilterParser, FilterRule, RequestParameterSource};
pub use natural::natural_cmp;
pub use parameter::{Parameter, PlaceholderStyle, SQL_FORMAT_DATE, SQL_FORMAT_DATE_TIME};
pub use sanitize::{escape_html, AllowedTags};
pub use schema::{ColumnDescriptor, InformationSchemaInterrogator, SchemaInterrogator};
pub use statement::{DatabaseStatement, QueryOutcome, StatementRows};
pub use value::{DatabaseResult, DatabaseRow, DatabaseValue};
pub use where_clause::{
    ComparisonOperator, Connective, RenderedClause, WhereClause, WhereCondition,
};
