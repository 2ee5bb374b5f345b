//! Request filter parsing
//!
//! Turns untrusted `filters[column:operator]=content` request parameters into
//! a [`WhereClause`]. Only allow-listed columns ever reach the SQL text, and
//! content is always bound as a parameter.
//!
//! ```
//! use rust_database_broker::core::{FilterParser, PlaceholderStyle};
//!
//! let parser = FilterParser::new(["name", "email"]);
//! let clause = parser.parse([("name", "bob"), ("email:ends", "@example.com")])?;
//! let rendered = clause.render(PlaceholderStyle::QuestionMark);
//! assert_eq!(rendered.sql, "name LIKE ? OR email LIKE ?");
//! # Ok::<(), rust_database_broker::core::DatabaseError>(())
//! ```

use super::error::{DatabaseError, Result};
use super::where_clause::{Connective, WhereClause, WhereCondition};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use tracing::debug;

/// Request parameter holding the filters
pub const URL_PARAMETER: &str = "filters";

/// Operator used when a key has no `:operator` suffix
pub const DEFAULT_OPERATOR: &str = "contains";

/// Custom operator rule: `(column, content)` to a condition
///
/// The rule may reject the content by returning an error.
pub type FilterRule = Box<dyn Fn(&str, &str) -> Result<WhereCondition> + Send + Sync>;

/// Source of request parameters, e.g. a decoded query string
pub trait RequestParameterSource {
    /// Ordered `(key, value)` pairs of the named parameter, `None` when absent
    fn get_parameter(&self, name: &str) -> Option<Vec<(String, String)>>;
}

impl RequestParameterSource for HashMap<String, Vec<(String, String)>> {
    fn get_parameter(&self, name: &str) -> Option<Vec<(String, String)>> {
        self.get(name).cloned()
    }
}

/// Built-in filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// `LIKE '%content%'`
    Contains,
    /// `LIKE 'content%'`
    Begins,
    /// `LIKE '%content'`
    Ends,
    /// `= content`
    Equals,
}

impl FilterOperator {
    /// Condition on `column` for `content`
    ///
    /// `%` and `_` inside the content keep their LIKE meaning.
    pub fn condition(&self, column: &str, content: &str) -> WhereCondition {
        match self {
            FilterOperator::Contains => WhereCondition::like(column, format!("%{}%", content)),
            FilterOperator::Begins => WhereCondition::like(column, format!("{}%", content)),
            FilterOperator::Ends => WhereCondition::like(column, format!("%{}", content)),
            FilterOperator::Equals => WhereCondition::equals(column, content),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Contains => "contains",
            FilterOperator::Begins => "begins",
            FilterOperator::Ends => "ends",
            FilterOperator::Equals => "equals",
        }
    }
}

impl FromStr for FilterOperator {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "contains" => Ok(FilterOperator::Contains),
            "begins" => Ok(FilterOperator::Begins),
            "ends" => Ok(FilterOperator::Ends),
            "equals" => Ok(FilterOperator::Equals),
            _ => Err(()),
        }
    }
}

/// Allow-list driven filter parser
pub struct FilterParser {
    allowed_columns: HashSet<String>,
    aliases: HashMap<String, String>,
    operators: HashMap<String, FilterRule>,
    connective: Connective,
}

impl FilterParser {
    /// Parser accepting only `allowed_columns` (public names)
    pub fn new<I, S>(allowed_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_columns: allowed_columns.into_iter().map(Into::into).collect(),
            aliases: HashMap::new(),
            operators: HashMap::new(),
            connective: Connective::Or,
        }
    }

    /// Map public names to backing columns or expressions
    ///
    /// Public names without an entry are used as is.
    #[must_use]
    pub fn with_aliases<I, K, V>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.aliases
            .extend(aliases.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Register a custom operator, taking precedence over a built-in one of
    /// the same name
    #[must_use]
    pub fn with_operator<F>(mut self, name: impl Into<String>, rule: F) -> Self
    where
        F: Fn(&str, &str) -> Result<WhereCondition> + Send + Sync + 'static,
    {
        self.operators.insert(name.into(), Box::new(rule));
        self
    }

    /// Connective joining the emitted conditions (OR by default)
    #[must_use]
    pub fn with_connective(mut self, connective: Connective) -> Self {
        self.connective = connective;
        self
    }

    /// Whether `column` is allow-listed
    pub fn allows(&self, column: &str) -> bool {
        self.allowed_columns.contains(column)
    }

    /// Build a clause from `(key, content)` pairs, in input order
    ///
    /// # Errors
    ///
    /// [`DatabaseError::UnknownFilterOperator`] for an allow-listed column
    /// with an operator nobody handles, or whatever a custom rule returns.
    pub fn parse<I, K, V>(&self, filters: I) -> Result<WhereClause>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut clause = WhereClause::new();

        for (key, content) in filters {
            let key = key.as_ref();
            // Segments after the operator are ignored
            let mut segments = key.split(':');
            let column = segments.next().unwrap_or(key);
            let operator = segments.next().unwrap_or(DEFAULT_OPERATOR);

            if !self.allows(column) {
                debug!(column, "filter on non allowed column skipped");
                continue;
            }

            let target = self.aliases.get(column).map_or(column, String::as_str);
            let condition = self.condition(column, operator, target, content.as_ref())?;
            clause.push(self.connective, condition);
        }

        Ok(clause)
    }

    /// Read the [`URL_PARAMETER`] entry of `source` and parse it
    pub fn parse_request(&self, source: &impl RequestParameterSource) -> Result<WhereClause> {
        self.parse(source.get_parameter(URL_PARAMETER).unwrap_or_default())
    }

    fn condition(
        &self,
        column: &str,
        operator: &str,
        target: &str,
        content: &str,
    ) -> Result<WhereCondition> {
        if let Some(rule) = self.operators.get(operator) {
            return rule(target, content);
        }

        operator
            .parse::<FilterOperator>()
            .map(|op| op.condition(target, content))
            .map_err(|()| DatabaseError::UnknownFilterOperator {
                column: column.to_string(),
                operator: operator.to_string(),
            })
    }
}

impl std::fmt::Debug for FilterParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut operators: Vec<&str> = self.operators.keys().map(String::as_str).collect();
        operators.sort_unstable();
        f.debug_struct("FilterParser")
            .field("allowed_columns", &self.allowed_columns)
            .field("aliases", &self.aliases)
            .field("operators", &operators)
            .field("connective", &self.connective)
            .finish()
    }
}
