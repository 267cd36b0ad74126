//! Comparison operators and criterion clauses.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FormulaError;

/// Comparison operator after synonym normalization.
///
/// The four canonical tokens are recognized from a range of spellings;
/// anything else is carried verbatim in [`Operator::Other`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    #[default]
    Equals,
    NotEquals,
    Greater,
    Less,
    Other(String),
}

impl Operator {
    pub fn normalize(raw: &str) -> Self {
        let key = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match key.as_str() {
            "" | "=" | "==" | "eq" | "equals" | "equal" | "equal_to" | "equals_to" | "is" => {
                Operator::Equals
            }
            "<>" | "!=" | "ne" | "neq" | "not_equals" | "not_equal" | "not_equal_to"
            | "is_not" | "does_not_equal" => Operator::NotEquals,
            ">" | "gt" | "greater" | "greater_than" | "more_than" | "above" => Operator::Greater,
            "<" | "lt" | "less" | "less_than" | "fewer_than" | "below" => Operator::Less,
            _ => Operator::Other(raw.trim().to_string()),
        }
    }

    /// Canonical name used on the wire (`equals`, `greater_than`, ...).
    pub fn name(&self) -> &str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "not_equals",
            Operator::Greater => "greater_than",
            Operator::Less => "less_than",
            Operator::Other(s) => s,
        }
    }

    /// Spreadsheet comparison token, or the verbatim text for unrecognized operators.
    pub fn token(&self) -> &str {
        match self {
            Operator::Equals => "=",
            Operator::NotEquals => "<>",
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::Other(s) => s,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl From<String> for Operator {
    fn from(value: String) -> Self {
        Operator::normalize(&value)
    }
}

impl From<&str> for Operator {
    fn from(value: &str) -> Self {
        Operator::normalize(value)
    }
}

impl From<Operator> for String {
    fn from(value: Operator) -> Self {
        value.name().to_string()
    }
}

/// One column/operator/value triple of a multi-condition formula.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CriterionClause {
    pub column: String,
    #[serde(default)]
    pub operator: Operator,
    pub value: Value,
}

impl CriterionClause {
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }
}

/// Accept either an explicit clause list or a flat `{column: value}` map.
///
/// Map entries become `equals` clauses in key order.
pub fn normalize_criteria(raw: &Value) -> Result<Vec<CriterionClause>, FormulaError> {
    let clauses = match raw {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value::<CriterionClause>(item.clone())
                    .map_err(|e| FormulaError::invalid("criteria", format!("clause {i}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?,
        Value::Object(map) => map
            .iter()
            .map(|(column, value)| CriterionClause::new(column.clone(), Operator::Equals, value.clone()))
            .collect(),
        other => {
            return Err(FormulaError::invalid(
                "criteria",
                format!("expected a list or a map, found {other}"),
            ));
        }
    };
    if clauses.is_empty() {
        return Err(FormulaError::EmptyCriteria);
    }
    Ok(clauses)
}
