//! Query filters expressed as data.
//!
//! Filters form a closed set of primitives (equality, inclusion, range, null
//! checks and disjunction) that every backend knows how to render. Column
//! names are checked against a plain identifier pattern before they reach a
//! backend.

use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::{HerdbookError, Result};

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("identifier pattern is valid"))
}

/// Reject anything that is not a plain lowercase column identifier.
pub fn validate_column(column: &str) -> Result<()> {
    if identifier_pattern().is_match(column) {
        Ok(())
    } else {
        Err(HerdbookError::Validation(format!("Invalid column name: '{}'", column)))
    }
}

/// Validate a projection such as `*` or `id, name`.
pub fn validate_projection(select: &str) -> Result<()> {
    for column in select.split(',').map(str::trim) {
        if column != "*" {
            validate_column(column)?;
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub value: Value,
    pub inclusive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: String, value: Value },
    Neq { column: String, value: Value },
    In { column: String, values: Vec<Value> },
    Range { column: String, lower: Option<Bound>, upper: Option<Bound> },
    IsNull { column: String, null: bool },
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq { column: column.into(), value: value.into() }
    }

    pub fn neq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Neq { column: column.into(), value: value.into() }
    }

    pub fn is_in<V: Into<Value>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Inclusive lower bound, exclusive upper bound.
    pub fn between(column: impl Into<String>, from: impl Into<Value>, until: impl Into<Value>) -> Self {
        Filter::Range {
            column: column.into(),
            lower: Some(Bound { value: from.into(), inclusive: true }),
            upper: Some(Bound { value: until.into(), inclusive: false }),
        }
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Range {
            column: column.into(),
            lower: Some(Bound { value: value.into(), inclusive: true }),
            upper: None,
        }
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Range {
            column: column.into(),
            lower: None,
            upper: Some(Bound { value: value.into(), inclusive: true }),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Filter::IsNull { column: column.into(), null: true }
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or(filters.into_iter().collect())
    }

    /// Every column this filter touches, for validation.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Filter::Eq { column, .. }
            | Filter::Neq { column, .. }
            | Filter::In { column, .. }
            | Filter::Range { column, .. }
            | Filter::IsNull { column, .. } => vec![column.as_str()],
            Filter::Or(filters) => filters.iter().flat_map(Filter::columns).collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Filter::Or(filters) = self {
            if filters.is_empty() {
                return Err(HerdbookError::Validation("Empty OR filter".to_string()));
            }
        }
        self.columns().into_iter().try_for_each(validate_column)
    }

    /// Render as PostgREST query parameters.
    pub fn to_postgrest(&self) -> Vec<(String, String)> {
        match self {
            Filter::Eq { column, value } if value.is_null() => vec![(column.clone(), "is.null".to_string())],
            Filter::Eq { column, value } => vec![(column.clone(), format!("eq.{}", literal(value, false)))],
            Filter::Neq { column, value } if value.is_null() => {
                vec![(column.clone(), "not.is.null".to_string())]
            }
            Filter::Neq { column, value } => vec![(column.clone(), format!("neq.{}", literal(value, false)))],
            Filter::In { column, values } => vec![(column.clone(), format!("in.({})", join_literals(values)))],
            Filter::Range { column, lower, upper } => {
                let mut params = Vec::new();
                if let Some(bound) = lower {
                    let op = if bound.inclusive { "gte" } else { "gt" };
                    params.push((column.clone(), format!("{}.{}", op, literal(&bound.value, false))));
                }
                if let Some(bound) = upper {
                    let op = if bound.inclusive { "lte" } else { "lt" };
                    params.push((column.clone(), format!("{}.{}", op, literal(&bound.value, false))));
                }
                params
            }
            Filter::IsNull { column, null } => {
                let op = if *null { "is.null" } else { "not.is.null" };
                vec![(column.clone(), op.to_string())]
            }
            Filter::Or(filters) => {
                let parts: Vec<String> = filters.iter().map(Filter::to_postgrest_term).collect();
                vec![("or".to_string(), format!("({})", parts.join(",")))]
            }
        }
    }

    /// Render as a term inside a PostgREST logical group.
    fn to_postgrest_term(&self) -> String {
        match self {
            Filter::Or(filters) => {
                let parts: Vec<String> = filters.iter().map(Filter::to_postgrest_term).collect();
                format!("or({})", parts.join(","))
            }
            Filter::Range { column, lower, upper } => {
                let mut parts = Vec::new();
                if let Some(bound) = lower {
                    let op = if bound.inclusive { "gte" } else { "gt" };
                    parts.push(format!("{}.{}.{}", column, op, literal(&bound.value, true)));
                }
                if let Some(bound) = upper {
                    let op = if bound.inclusive { "lte" } else { "lt" };
                    parts.push(format!("{}.{}.{}", column, op, literal(&bound.value, true)));
                }
                if parts.len() == 1 {
                    parts.remove(0)
                } else {
                    format!("and({})", parts.join(","))
                }
            }
            Filter::In { column, values } => format!("{}.in.({})", column, join_literals(values)),
            Filter::Eq { column, value } if value.is_null() => format!("{}.is.null", column),
            Filter::Eq { column, value } => format!("{}.eq.{}", column, literal(value, true)),
            Filter::Neq { column, value } if value.is_null() => format!("{}.not.is.null", column),
            Filter::Neq { column, value } => format!("{}.neq.{}", column, literal(value, true)),
            Filter::IsNull { column, null: true } => format!("{}.is.null", column),
            Filter::IsNull { column, null: false } => format!("{}.not.is.null", column),
        }
    }
}

fn join_literals(values: &[Value]) -> String {
    values.iter().map(|v| literal(v, true)).collect::<Vec<_>>().join(",")
}

/// Text form of a value; inside lists and groups reserved characters force quoting.
fn literal(value: &Value, grouped: bool) -> String {
    let raw = match value {
        Value::Null => return "null".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if grouped && raw.chars().any(|c| matches!(c, ',' | '.' | '(' | ')' | ':' | '"' | ' ' | '\\')) {
        format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        raw
    }
}

/// An equality match set: column = value for every entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Match(BTreeMap<String, Value>);

impl Match {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::new().with("id", id.into())
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn to_filters(&self) -> Vec<Filter> {
        self.0
            .iter()
            .map(|(column, value)| Filter::Eq { column: column.clone(), value: value.clone() })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullsOrder {
    First,
    #[default]
    Last,
}

/// Single-column ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
    pub nulls: NullsOrder,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self { column: column.into(), ascending: true, nulls: NullsOrder::Last }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self { column: column.into(), ascending: false, nulls: NullsOrder::Last }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls = NullsOrder::First;
        self
    }

    pub fn to_postgrest(&self) -> String {
        format!(
            "{}.{}.{}",
            self.column,
            if self.ascending { "asc" } else { "desc" },
            match self.nulls {
                NullsOrder::First => "nullsfirst",
                NullsOrder::Last => "nullslast",
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_column() {
        assert!(validate_column("farm_id").is_ok());
        assert!(validate_column("due_date").is_ok());
        assert!(validate_column("id; DROP TABLE farms").is_err());
        assert!(validate_column("Name").is_err());
        assert!(validate_column("").is_err());
    }

    #[test]
    fn test_validate_projection() {
        assert!(validate_projection("*").is_ok());
        assert!(validate_projection("id, name").is_ok());
        assert!(validate_projection("*, animal_categories(name)").is_err());
    }

    #[test]
    fn test_equality_and_null_rendering() {
        assert_eq!(
            Filter::eq("farm_id", "F1").to_postgrest(),
            vec![("farm_id".to_string(), "eq.F1".to_string())]
        );
        assert_eq!(
            Filter::eq("animal_id", Value::Null).to_postgrest(),
            vec![("animal_id".to_string(), "is.null".to_string())]
        );
    }

    #[test]
    fn test_in_quotes_reserved_characters() {
        let filter = Filter::is_in("category", ["Feed", "Vet, misc"]);
        assert_eq!(
            filter.to_postgrest(),
            vec![("category".to_string(), "in.(Feed,\"Vet, misc\")".to_string())]
        );
    }

    #[test]
    fn test_range_rendering() {
        let filter = Filter::between("transaction_date", "2026-01-01", "2026-02-01");
        assert_eq!(
            filter.to_postgrest(),
            vec![
                ("transaction_date".to_string(), "gte.2026-01-01".to_string()),
                ("transaction_date".to_string(), "lt.2026-02-01".to_string()),
            ]
        );
    }

    #[test]
    fn test_or_rendering() {
        let filter = Filter::or([Filter::eq("female_id", "A1"), Filter::eq("male_id", "A1")]);
        assert_eq!(
            filter.to_postgrest(),
            vec![("or".to_string(), "(female_id.eq.A1,male_id.eq.A1)".to_string())]
        );
        assert!(Filter::Or(vec![]).validate().is_err());
    }

    #[test]
    fn test_match_to_filters_is_sorted() {
        let matcher = Match::new().with("farm_id", "F1").with("animal_id", json!("A1"));
        let filters = matcher.to_filters();
        assert_eq!(filters[0], Filter::eq("animal_id", "A1"));
        assert_eq!(filters[1], Filter::eq("farm_id", "F1"));
    }

    #[test]
    fn test_order_rendering() {
        assert_eq!(Order::asc("due_date").to_postgrest(), "due_date.asc.nullslast");
        assert_eq!(Order::desc("record_date").nulls_first().to_postgrest(), "record_date.desc.nullsfirst");
    }
}
