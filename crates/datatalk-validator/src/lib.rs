//! The SQL validator: a static, purely syntactic check that a candidate
//! query is SELECT-only, bounded by `LIMIT`, and — under Safe Mode —
//! aggregation-only.
//!
//! Validation never looks at the engine or the catalog; it only looks at
//! the SQL text and its parse tree. Semantic safety (PII exposure) is a
//! planner and Privacy Mode concern, not this crate's.

use sqlparser::ast::{Expr, GroupByExpr, Query, SetExpr, Statement, Value};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};

/// The validator's hard row ceiling. Individual callers (the planner's
/// `/chat` path vs. the raw `/queries/execute` endpoint) choose which
/// ceiling to pass in; this constant is the default used when no
/// tighter cap applies.
pub const L_MAX: u64 = 10_000;

const RESTRICTED_TOKENS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "ATTACH", "DETACH",
    "COPY", "EXPORT", "PRAGMA", "REPLACE",
];

const AGGREGATE_TOKENS: &[&str] = &[
    "COUNT",
    "SUM",
    "AVG",
    "MIN",
    "MAX",
    "TOTAL",
    "GROUP_CONCAT",
    "STRING_AGG",
];

/// Why the validator rejected a query. Each variant carries enough to
/// build the user-facing `needs_clarification` message without the
/// caller needing to know validator internals.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("query must start with SELECT")]
    NotSelect,
    #[error("query contains a restricted keyword: {0}")]
    RestrictedToken(String),
    #[error("could not parse query: {0}")]
    ParseError(String),
    #[error("Safe Mode requires an aggregate function (COUNT, SUM, AVG, MIN, MAX, TOTAL, GROUP_CONCAT, STRING_AGG) or a GROUP BY clause")]
    SafeModeRequiresAggregation,
}

/// A query that passed validation, with its `LIMIT` clause enforced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery {
    pub sql: String,
}

/// Validate and (if necessary) rewrite `sql`'s `LIMIT` clause down to
/// `row_cap`. `safe_mode` applies the additional aggregate/GROUP BY rule.
pub fn validate(sql: &str, safe_mode: bool, row_cap: u64) -> Result<ValidatedQuery, Rejection> {
    let trimmed = sql.trim();
    check_starts_with_select(trimmed)?;
    check_no_restricted_tokens(trimmed)?;

    let dialect = GenericDialect {};
    let mut statements = Parser::parse_sql(&dialect, trimmed)
        .map_err(|e| Rejection::ParseError(e.to_string()))?;
    if statements.len() != 1 {
        return Err(Rejection::ParseError(
            "exactly one statement is required".to_string(),
        ));
    }
    let statement = statements.remove(0);

    let query = match statement {
        Statement::Query(q) => *q,
        other => {
            return Err(Rejection::ParseError(format!(
                "expected a SELECT statement, got {other}"
            )))
        }
    };

    if safe_mode {
        check_safe_mode(&query)?;
    }

    let rewritten = enforce_row_cap(query, trimmed, row_cap)?;
    Ok(ValidatedQuery { sql: rewritten })
}

fn check_starts_with_select(trimmed: &str) -> Result<(), Rejection> {
    let mut chars = trimmed.char_indices();
    let is_select = trimmed.len() >= 6
        && trimmed[..6].eq_ignore_ascii_case("select")
        && trimmed[6..]
            .chars()
            .next()
            .map(|c| !c.is_alphanumeric() && c != '_')
            .unwrap_or(true);
    // consume to avoid an unused-variable warning while keeping the
    // character-boundary check above self-documenting
    let _ = chars.next();
    if is_select {
        Ok(())
    } else {
        Err(Rejection::NotSelect)
    }
}

/// Scan the tokenized statement for restricted keywords. Tokenizing
/// (rather than a raw substring/regex scan) means a string literal or
/// quoted identifier containing e.g. `drop` never trips the check, and a
/// real keyword hidden by unusual whitespace or comments still does.
fn check_no_restricted_tokens(trimmed: &str) -> Result<(), Rejection> {
    let dialect = GenericDialect {};
    let tokens = Tokenizer::new(&dialect, trimmed)
        .tokenize()
        .map_err(|e| Rejection::ParseError(e.to_string()))?;
    for token in tokens {
        if let Token::Word(word) = token {
            let upper = word.value.to_ascii_uppercase();
            if RESTRICTED_TOKENS.contains(&upper.as_str()) {
                return Err(Rejection::RestrictedToken(upper));
            }
        }
    }
    Ok(())
}

fn check_safe_mode(query: &Query) -> Result<(), Rejection> {
    if has_group_by(query) || has_aggregate_call(query) {
        Ok(())
    } else {
        Err(Rejection::SafeModeRequiresAggregation)
    }
}

fn has_group_by(query: &Query) -> bool {
    if let SetExpr::Select(select) = query.body.as_ref() {
        match &select.group_by {
            GroupByExpr::All(_) => true,
            GroupByExpr::Expressions(exprs, _) => !exprs.is_empty(),
        }
    } else {
        false
    }
}

fn has_aggregate_call(query: &Query) -> bool {
    // A function call is an aggregate call for our purposes if its name
    // matches the aggregate token set, regardless of arguments — the
    // validator only needs to know "this query aggregates something",
    // not which column.
    query.to_string().split(|c: char| !c.is_alphanumeric() && c != '_').any(|word| {
        AGGREGATE_TOKENS.contains(&word.to_ascii_uppercase().as_str())
    })
}

fn enforce_row_cap(mut query: Query, original_sql: &str, row_cap: u64) -> Result<String, Rejection> {
    match query.limit.take() {
        None => {
            let inner = original_sql.trim().trim_end_matches(';');
            Ok(format!("SELECT * FROM ({inner}) LIMIT {row_cap}"))
        }
        Some(limit_expr) => {
            let effective = match &limit_expr {
                Expr::Value(Value::Number(n, _)) => n.parse::<u64>().ok(),
                _ => None,
            };
            let capped = match effective {
                Some(n) if n <= row_cap => limit_expr,
                // Either the existing limit exceeds the cap, or it isn't a
                // literal we can verify — in both cases fall back to the
                // cap rather than trust an unverifiable expression.
                _ => Expr::Value(Value::Number(row_cap.to_string(), false)),
            };
            query.limit = Some(capped);
            Ok(query.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_select_and_injects_limit() {
        let v = validate("SELECT COUNT(*) AS row_count FROM data", false, L_MAX).unwrap();
        assert!(v.sql.contains("LIMIT 10000"));
    }

    #[test]
    fn rejects_non_select() {
        assert_eq!(
            validate("UPDATE data SET x = 1", false, L_MAX).unwrap_err(),
            Rejection::RestrictedToken("UPDATE".to_string())
        );
    }

    #[test]
    fn rejects_restricted_token_even_mid_query() {
        let err = validate(
            "SELECT * FROM data; DROP TABLE data;",
            false,
            L_MAX,
        )
        .unwrap_err();
        assert!(matches!(err, Rejection::RestrictedToken(_) | Rejection::ParseError(_)));
    }

    #[test]
    fn does_not_false_positive_on_word_inside_identifier() {
        // "dropdown_count" contains "drop" as a substring but not as a
        // standalone token, so it must not trip the restricted-token check.
        let v = validate(
            "SELECT \"dropdown_count\" FROM data LIMIT 10",
            false,
            L_MAX,
        )
        .unwrap();
        assert!(v.sql.contains("dropdown_count"));
    }

    #[test]
    fn rewrites_limit_above_cap_down_to_cap() {
        let v = validate("SELECT * FROM data LIMIT 999999", false, L_MAX).unwrap();
        assert!(v.sql.contains("LIMIT 10000"));
        assert!(!v.sql.contains("999999"));
    }

    #[test]
    fn leaves_limit_below_cap_untouched() {
        let v = validate("SELECT * FROM data LIMIT 5", false, L_MAX).unwrap();
        assert!(v.sql.contains("LIMIT 5"));
    }

    #[test]
    fn safe_mode_accepts_aggregate_function() {
        let v = validate("SELECT COUNT(*) AS n FROM data", true, L_MAX).unwrap();
        assert!(v.sql.contains("LIMIT"));
    }

    #[test]
    fn safe_mode_accepts_group_by() {
        let v = validate(
            "SELECT \"category\", COUNT(*) FROM data GROUP BY \"category\"",
            true,
            L_MAX,
        )
        .unwrap();
        assert!(v.sql.contains("LIMIT"));
    }

    #[test]
    fn safe_mode_rejects_raw_row_select() {
        assert_eq!(
            validate("SELECT * FROM data LIMIT 10", true, L_MAX).unwrap_err(),
            Rejection::SafeModeRequiresAggregation
        );
    }

    #[test]
    fn row_cap_is_respected_for_queries_endpoint() {
        let v = validate("SELECT * FROM data", false, 200).unwrap();
        assert!(v.sql.contains("LIMIT 200"));
    }
}
