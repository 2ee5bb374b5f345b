//! Property-based tests for filters, ordering and binding using proptest

use proptest::prelude::*;
use rust_database_broker::core::{
    natural_cmp, FilterParser, PlaceholderStyle, WhereClause, WhereCondition,
};
use rust_database_broker::prelude::*;
use std::cmp::Ordering;

const ALLOWED: [&str; 3] = ["name", "email", "city"];

fn filter_key() -> impl Strategy<Value = String> {
    let column = prop_oneof![
        Just("name".to_string()),
        Just("email".to_string()),
        Just("city".to_string()),
        "[a-z_]{1,8}",
    ];
    let operator = prop_oneof![
        Just(None),
        Just(Some("contains")),
        Just(Some("begins")),
        Just(Some("ends")),
        Just(Some("equals")),
    ];
    (column, operator).prop_map(|(column, operator)| match operator {
        Some(operator) => format!("{}:{}", column, operator),
        None => column,
    })
}

// ============================================================================
// FilterParser Tests
// ============================================================================

proptest! {
    /// Every emitted condition targets an allow-listed column
    #[test]
    fn test_filters_only_emit_allowed_columns(
        filters in prop::collection::vec((filter_key(), ".*"), 0..12)
    ) {
        let parser = FilterParser::new(ALLOWED);
        let clause = parser.parse(filters).expect("known operators only");

        for column in clause.columns() {
            prop_assert!(ALLOWED.contains(&column), "unexpected column {}", column);
        }
    }

    /// Content never reaches the SQL text
    #[test]
    fn test_filter_content_is_always_bound(content in "[a-zA-Z0-9' ;-]{1,24}") {
        let parser = FilterParser::new(ALLOWED);
        let clause = parser
            .parse([("name:equals", content.as_str())])
            .expect("known operator");
        let rendered = clause.render(PlaceholderStyle::QuestionMark);

        prop_assert_eq!(rendered.sql, "name = ?");
        prop_assert_eq!(rendered.parameters, vec![Parameter::Text(content)]);
    }

    /// Unknown operators on allowed columns are rejected
    #[test]
    fn test_unknown_operator_rejected(operator in "[a-z]{1,10}") {
        prop_assume!(!["contains", "begins", "ends", "equals"].contains(&operator.as_str()));

        let parser = FilterParser::new(ALLOWED);
        let key = format!("name:{}", operator);
        let result = parser.parse([(key.as_str(), "x")]);
        let is_unknown_operator = matches!(result, Err(DatabaseError::UnknownFilterOperator { .. }));
        prop_assert!(is_unknown_operator);
    }
}

// ============================================================================
// WhereClause Rendering Tests
// ============================================================================

proptest! {
    /// Numbered placeholders follow parameter order
    #[test]
    fn test_numbered_placeholders_match_parameters(
        values in prop::collection::vec(any::<i64>(), 1..10),
        first in 1usize..5
    ) {
        let clause: WhereClause = values
            .iter()
            .fold(WhereClause::new(), |clause, v| clause.and(WhereCondition::equals("n", *v)));
        let rendered = clause.render_from(PlaceholderStyle::Numbered, first);

        prop_assert_eq!(rendered.parameters.len(), values.len());
        for i in 0..values.len() {
            let placeholder = format!("${}", first + i);
            prop_assert!(rendered.sql.contains(&placeholder));
        }
    }
}

// ============================================================================
// Natural Ordering Tests
// ============================================================================

proptest! {
    /// Numbers with the same prefix sort numerically
    #[test]
    fn test_numeric_suffix_order(a in 0u32..100_000, b in 0u32..100_000) {
        let left = format!("item{}", a);
        let right = format!("item{}", b);
        prop_assert_eq!(natural_cmp(&left, &right), a.cmp(&b));
    }

    /// Comparison is antisymmetric
    #[test]
    fn test_antisymmetric(a in "[a-c0-9]{0,8}", b in "[a-c0-9]{0,8}") {
        prop_assert_eq!(natural_cmp(&a, &b), natural_cmp(&b, &a).reverse());
    }

    /// Equal only for identical strings
    #[test]
    fn test_equal_means_identical(a in "[a-c0-9]{0,8}", b in "[a-c0-9]{0,8}") {
        prop_assert_eq!(natural_cmp(&a, &b) == Ordering::Equal, a == b);
    }

    /// natural_sort returns a sorted permutation
    #[test]
    fn test_natural_sort_sorted(items in prop::collection::vec("[A-C][0-9]{1,3}", 0..30)) {
        let sorted = Broker::natural_sort(items.clone(), |s| s.clone());

        prop_assert_eq!(sorted.len(), items.len());
        for pair in sorted.windows(2) {
            prop_assert_ne!(natural_cmp(&pair[0], &pair[1]), Ordering::Greater);
        }
    }
}

// ============================================================================
// Parameter Binding Tests
// ============================================================================

proptest! {
    /// Floats always bind as their decimal text
    #[test]
    fn test_float_binds_as_text(value in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
        let parameter = Parameter::from(value);
        prop_assert_eq!(parameter.kind(), "text");
        let parsed: f64 = parameter.as_text().expect("text parameter").parse().expect("decimal");
        prop_assert_eq!(parsed, value);
    }

    /// Integers keep their integer kind
    #[test]
    fn test_integers_bind_as_integers(value in any::<i64>()) {
        prop_assert_eq!(Parameter::from(value), Parameter::Integer(value));
    }
}
