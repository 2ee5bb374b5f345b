//! Forward-only result cursor

use super::sanitize::AllowedTags;
use super::value::{DatabaseResult, DatabaseRow, DatabaseValue};
use std::collections::VecDeque;

/// Rows and counters produced by a connector for one executed statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutcome {
    /// Result rows in server order (empty for statements without a result set)
    pub rows: DatabaseResult,
    /// Rows changed by a data-modifying statement
    pub affected_rows: u64,
}

/// Result of [`Database::query`](crate::core::Database::query)
///
/// Positioned before the first row. Each call to [`next`](Self::next) hands
/// out the following row; once exhausted it keeps returning `None`. When an
/// HTML allow-list is set, string fields are stripped of other tags before the
/// row leaves the cursor.
#[derive(Debug)]
pub struct DatabaseStatement {
    rows: VecDeque<DatabaseRow>,
    total: usize,
    affected_rows: u64,
    allowed_tags: Option<AllowedTags>,
}

impl DatabaseStatement {
    /// Wrap the outcome of an executed statement
    pub fn new(outcome: QueryOutcome) -> Self {
        Self {
            total: outcome.rows.len(),
            rows: outcome.rows.into(),
            affected_rows: outcome.affected_rows,
            allowed_tags: None,
        }
    }

    /// Total rows in the result set, regardless of how many were consumed
    pub fn count(&self) -> usize {
        self.total
    }

    /// Rows changed by the statement
    pub fn affected_rows(&self) -> u64 {
        self.affected_rows
    }

    /// Sanitize string fields, keeping only the listed tags (`"<b><i>"`).
    /// An empty list strips every tag.
    pub fn set_allowed_html_tags(&mut self, tags: &str) {
        self.allowed_tags = Some(AllowedTags::parse(tags));
    }

    /// Next row, or `None` once the cursor is exhausted
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<DatabaseRow> {
        let mut row = self.rows.pop_front()?;
        if let Some(tags) = &self.allowed_tags {
            for value in row.values_mut() {
                if let DatabaseValue::String(text) = value {
                    *text = tags.strip(text);
                }
            }
        }
        Some(row)
    }
}

impl IntoIterator for DatabaseStatement {
    type Item = DatabaseRow;
    type IntoIter = StatementRows;

    fn into_iter(self) -> Self::IntoIter {
        StatementRows { statement: self }
    }
}

/// Owning iterator over the remaining rows of a statement
#[derive(Debug)]
pub struct StatementRows {
    statement: DatabaseStatement,
}

impl Iterator for StatementRows {
    type Item = DatabaseRow;

    fn next(&mut self) -> Option<Self::Item> {
        self.statement.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(names: &[&str]) -> QueryOutcome {
        let rows = names
            .iter()
            .map(|name| {
                let mut row = DatabaseRow::new();
                row.insert("name", DatabaseValue::from(*name));
                row.insert("rank", DatabaseValue::Long(1));
                row
            })
            .collect();
        QueryOutcome {
            rows,
            affected_rows: 0,
        }
    }

    #[test]
    fn test_forward_only() {
        let mut statement = DatabaseStatement::new(outcome(&["a", "b"]));
        assert_eq!(statement.count(), 2);

        assert!(statement.next().is_some());
        assert!(statement.next().is_some());
        assert!(statement.next().is_none());
        assert!(statement.next().is_none());
        assert_eq!(statement.count(), 2);
    }

    #[test]
    fn test_sanitizes_strings_only() {
        let mut statement = DatabaseStatement::new(outcome(&["<b>bold</b><script>x</script>"]));
        statement.set_allowed_html_tags("<b>");

        let row = statement.next();
        let name = row.as_ref().and_then(|r| r.get("name")).and_then(|v| v.as_str());
        assert_eq!(name, Some("<b>bold</b>x"));
        let rank = row.as_ref().and_then(|r| r.get("rank")).and_then(|v| v.as_long());
        assert_eq!(rank, Some(1));
    }

    #[test]
    fn test_unsanitized_by_default() {
        let statement = DatabaseStatement::new(outcome(&["<i>raw</i>"]));
        let names: Vec<String> = statement
            .into_iter()
            .filter_map(|row| row.get("name").map(|v| v.as_string()))
            .collect();
        assert_eq!(names, vec!["<i>raw</i>"]);
    }
}
