use crate::error::{ExportError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Ordering clause every partitionable query must end with. Splitting works
/// by windowing on the issue key, so the server has to return results in
/// that order.
const ORDER_BY_KEY: &str = " order by key";

/// A JQL filter expression that is guaranteed to be ordered by issue key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    pub fn new(expression: &str) -> Result<Self> {
        let trimmed = expression.trim_end();

        if !trimmed.to_lowercase().ends_with(ORDER_BY_KEY) {
            return Err(ExportError::MissingOrderClause {
                query: expression.to_string(),
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn for_project(project_key: &str) -> Self {
        Self(format!("project = {} ORDER BY key", project_key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Matches a lower-bound clause left behind by a previous split. Non-greedy,
/// so the match ends at the first ` AND ` and never swallows filter text.
static LOWER_BOUND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"key > .*? AND ").expect("static pattern"));

/// Removes the first lower-bound clause from a query expression. Only the
/// first occurrence goes; anything that merely looks like one further into
/// the filter stays untouched.
pub fn strip_lower_bound(expression: &str) -> String {
    LOWER_BOUND.replace(expression, "").into_owned()
}
