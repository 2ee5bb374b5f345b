//! WHERE clause construction
//!
//! Conditions carry their values as [`Parameter`]s. Rendering produces SQL
//! with positional placeholders plus the parameters in placeholder order;
//! values are never interpolated into the SQL text.

use super::parameter::{Parameter, PlaceholderStyle};

/// Logical connective joining a condition to the ones before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connective {
    /// AND
    And,
    /// OR
    Or,
}

impl Connective {
    fn as_sql(&self) -> &'static str {
        match self {
            Connective::And => "AND",
            Connective::Or => "OR",
        }
    }
}

/// Binary comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    /// =
    Equals,
    /// <>
    NotEquals,
    /// <
    Less,
    /// <=
    LessOrEqual,
    /// >
    Greater,
    /// >=
    GreaterOrEqual,
    /// LIKE
    Like,
    /// NOT LIKE
    NotLike,
}

impl ComparisonOperator {
    fn as_sql(&self) -> &'static str {
        match self {
            ComparisonOperator::Equals => "=",
            ComparisonOperator::NotEquals => "<>",
            ComparisonOperator::Less => "<",
            ComparisonOperator::LessOrEqual => "<=",
            ComparisonOperator::Greater => ">",
            ComparisonOperator::GreaterOrEqual => ">=",
            ComparisonOperator::Like => "LIKE",
            ComparisonOperator::NotLike => "NOT LIKE",
        }
    }
}

/// A single predicate or a parenthesised group
#[derive(Debug, Clone, PartialEq)]
pub enum WhereCondition {
    /// `column <op> ?`
    Comparison {
        column: String,
        operator: ComparisonOperator,
        value: Parameter,
    },
    /// `column IS [NOT] NULL`
    Null { column: String, negated: bool },
    /// `( ... )`
    Group(WhereClause),
}

impl WhereCondition {
    fn comparison(
        column: impl Into<String>,
        operator: ComparisonOperator,
        value: impl Into<Parameter>,
    ) -> Self {
        WhereCondition::Comparison {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn equals(column: impl Into<String>, value: impl Into<Parameter>) -> Self {
        Self::comparison(column, ComparisonOperator::Equals, value)
    }

    pub fn not_equals(column: impl Into<String>, value: impl Into<Parameter>) -> Self {
        Self::comparison(column, ComparisonOperator::NotEquals, value)
    }

    /// `pattern` is bound as is, wildcards included
    pub fn like(column: impl Into<String>, pattern: impl Into<Parameter>) -> Self {
        Self::comparison(column, ComparisonOperator::Like, pattern)
    }

    pub fn not_like(column: impl Into<String>, pattern: impl Into<Parameter>) -> Self {
        Self::comparison(column, ComparisonOperator::NotLike, pattern)
    }

    pub fn greater(column: impl Into<String>, value: impl Into<Parameter>) -> Self {
        Self::comparison(column, ComparisonOperator::Greater, value)
    }

    pub fn greater_or_equal(column: impl Into<String>, value: impl Into<Parameter>) -> Self {
        Self::comparison(column, ComparisonOperator::GreaterOrEqual, value)
    }

    pub fn less(column: impl Into<String>, value: impl Into<Parameter>) -> Self {
        Self::comparison(column, ComparisonOperator::Less, value)
    }

    pub fn less_or_equal(column: impl Into<String>, value: impl Into<Parameter>) -> Self {
        Self::comparison(column, ComparisonOperator::LessOrEqual, value)
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        WhereCondition::Null {
            column: column.into(),
            negated: false,
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        WhereCondition::Null {
            column: column.into(),
            negated: true,
        }
    }

    pub fn group(clause: WhereClause) -> Self {
        WhereCondition::Group(clause)
    }

    /// Render into `sql`, pushing bound values onto `parameters`
    ///
    /// Returns `false` when nothing was written (empty group).
    fn render_into(
        &self,
        style: PlaceholderStyle,
        first_index: usize,
        sql: &mut String,
        parameters: &mut Vec<Parameter>,
    ) -> bool {
        match self {
            WhereCondition::Comparison {
                column,
                operator,
                value,
            } => {
                parameters.push(value.clone());
                let placeholder = style.placeholder(first_index + parameters.len() - 1);
                sql.push_str(&format!("{} {} {}", column, operator.as_sql(), placeholder));
                true
            }
            WhereCondition::Null { column, negated } => {
                let test = if *negated { "IS NOT NULL" } else { "IS NULL" };
                sql.push_str(&format!("{} {}", column, test));
                true
            }
            WhereCondition::Group(clause) => {
                let mut inner = String::new();
                clause.render_terms(style, first_index, &mut inner, parameters);
                if inner.is_empty() {
                    return false;
                }
                sql.push('(');
                sql.push_str(&inner);
                sql.push(')');
                true
            }
        }
    }

    fn collect_columns<'a>(&'a self, columns: &mut Vec<&'a str>) {
        match self {
            WhereCondition::Comparison { column, .. } | WhereCondition::Null { column, .. } => {
                columns.push(column)
            }
            WhereCondition::Group(clause) => {
                for (_, condition) in &clause.terms {
                    condition.collect_columns(columns);
                }
            }
        }
    }
}

/// Ordered list of conditions with their connectives
///
/// The connective of the first condition is ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    terms: Vec<(Connective, WhereCondition)>,
}

/// SQL fragment and the parameters bound to its placeholders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedClause {
    /// Condition text without the `WHERE` keyword
    pub sql: String,
    /// Values in placeholder order
    pub parameters: Vec<Parameter>,
}

impl RenderedClause {
    /// `WHERE <sql>`, or an empty string when there is no condition
    pub fn where_sql(&self) -> String {
        if self.sql.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.sql)
        }
    }

    /// `(<sql>)`, or an empty string when there is no condition
    ///
    /// Use when splicing the fragment next to other conditions, e.g.
    /// `WHERE tenant_id = ? AND (...)`, so an OR inside it stays local.
    pub fn grouped_sql(&self) -> String {
        if self.sql.is_empty() {
            String::new()
        } else {
            format!("({})", self.sql)
        }
    }
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn and(mut self, condition: WhereCondition) -> Self {
        self.push(Connective::And, condition);
        self
    }

    #[must_use]
    pub fn or(mut self, condition: WhereCondition) -> Self {
        self.push(Connective::Or, condition);
        self
    }

    /// Append `condition` joined by `connective`
    pub fn push(&mut self, connective: Connective, condition: WhereCondition) {
        self.terms.push((connective, condition));
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Number of top-level conditions
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Top-level conditions with their connectives
    pub fn conditions(&self) -> impl Iterator<Item = (Connective, &WhereCondition)> {
        self.terms.iter().map(|(connective, condition)| (*connective, condition))
    }

    /// Every column referenced, groups included, in rendering order
    pub fn columns(&self) -> Vec<&str> {
        let mut columns = Vec::new();
        for (_, condition) in &self.terms {
            condition.collect_columns(&mut columns);
        }
        columns
    }

    /// Render with placeholders numbered from 1
    pub fn render(&self, style: PlaceholderStyle) -> RenderedClause {
        self.render_from(style, 1)
    }

    /// Render with the first placeholder numbered `first_index`
    ///
    /// Use when the clause is appended to a query that already binds
    /// `first_index - 1` parameters. Only matters for numbered placeholders.
    pub fn render_from(&self, style: PlaceholderStyle, first_index: usize) -> RenderedClause {
        let mut rendered = RenderedClause::default();
        self.render_terms(style, first_index, &mut rendered.sql, &mut rendered.parameters);
        rendered
    }

    fn render_terms(
        &self,
        style: PlaceholderStyle,
        first_index: usize,
        sql: &mut String,
        parameters: &mut Vec<Parameter>,
    ) {
        for (connective, condition) in &self.terms {
            let mut fragment = String::new();
            if !condition.render_into(style, first_index, &mut fragment, parameters) {
                continue;
            }
            if !sql.is_empty() {
                sql.push(' ');
                sql.push_str(connective.as_sql());
                sql.push(' ');
            }
            sql.push_str(&fragment);
        }
    }
}

impl FromIterator<(Connective, WhereCondition)> for WhereClause {
    fn from_iter<I: IntoIterator<Item = (Connective, WhereCondition)>>(iter: I) -> Self {
        Self {
            terms: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_question_marks() {
        let clause = WhereClause::new()
            .and(WhereCondition::equals("status", "active"))
            .and(WhereCondition::greater("age", 18));

        let rendered = clause.render(PlaceholderStyle::QuestionMark);
        assert_eq!(rendered.sql, "status = ? AND age > ?");
        assert_eq!(
            rendered.parameters,
            vec![Parameter::Text("active".into()), Parameter::Integer(18)]
        );
        assert_eq!(rendered.where_sql(), "WHERE status = ? AND age > ?");
    }

    #[test]
    fn test_render_numbered_with_groups() {
        let names = WhereClause::new()
            .or(WhereCondition::like("name", "%bob%"))
            .or(WhereCondition::like("email", "%bob%"));
        let clause = WhereClause::new()
            .and(WhereCondition::is_not_null("email"))
            .and(WhereCondition::group(names))
            .or(WhereCondition::less_or_equal("id", 3));

        let rendered = clause.render_from(PlaceholderStyle::Numbered, 2);
        assert_eq!(
            rendered.sql,
            "email IS NOT NULL AND (name LIKE $2 OR email LIKE $3) OR id <= $4"
        );
        assert_eq!(rendered.parameters.len(), 3);
        assert_eq!(clause.columns(), vec!["email", "name", "email", "id"]);
    }

    #[test]
    fn test_empty_clause_and_empty_groups() {
        let clause = WhereClause::new();
        assert!(clause.is_empty());
        assert_eq!(clause.render(PlaceholderStyle::QuestionMark).where_sql(), "");

        let clause = WhereClause::new()
            .and(WhereCondition::group(WhereClause::new()))
            .or(WhereCondition::is_null("deleted_at"));
        assert_eq!(
            clause.render(PlaceholderStyle::QuestionMark).sql,
            "deleted_at IS NULL"
        );
    }

    #[test]
    fn test_first_connective_ignored() {
        let clause = WhereClause::new()
            .or(WhereCondition::not_equals("a", 1))
            .and(WhereCondition::not_like("b", "x%"));
        assert_eq!(
            clause.render(PlaceholderStyle::QuestionMark).sql,
            "a <> ? AND b NOT LIKE ?"
        );
        assert_eq!(clause.len(), 2);
    }

    #[test]
    fn test_or_clause_stays_grouped_inside_outer_and() {
        let filters = WhereClause::new()
            .or(WhereCondition::like("name", "%bob%"))
            .or(WhereCondition::equals("city", "Oslo"));

        let rendered = filters.render_from(PlaceholderStyle::Numbered, 2);
        assert_eq!(rendered.grouped_sql(), "(name LIKE $2 OR city = $3)");
        let sql = format!("SELECT * FROM users WHERE tenant_id = $1 AND {}", rendered.grouped_sql());
        assert_eq!(
            sql,
            "SELECT * FROM users WHERE tenant_id = $1 AND (name LIKE $2 OR city = $3)"
        );
        assert_eq!(WhereClause::new().render(PlaceholderStyle::Numbered).grouped_sql(), "");

        let scoped = WhereClause::new()
            .and(WhereCondition::equals("tenant_id", 7))
            .and(WhereCondition::group(filters));
        assert_eq!(
            scoped.render(PlaceholderStyle::QuestionMark).where_sql(),
            "WHERE tenant_id = ? AND (name LIKE ? OR city = ?)"
        );
    }
}
