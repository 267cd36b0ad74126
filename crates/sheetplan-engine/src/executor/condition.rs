//! Row conditions for filter and delete steps.

use serde_json::Value;
use sheetplan_common::CellValue;

use crate::criteria::Operator;
use crate::error::StepError;

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Eq(CellValue),
    Ne(CellValue),
    Gt(f64),
    Ge(f64),
    Lt(f64),
    Le(f64),
    Contains(String),
    NotContains(String),
    StartsWith(String),
    EndsWith(String),
    IsEmpty,
    IsNotEmpty,
}

pub fn json_to_cell(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Empty,
        Value::Bool(b) => CellValue::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => CellValue::Int(i),
            None => n.as_f64().map(CellValue::Number).unwrap_or_default(),
        },
        Value::String(s) => CellValue::Text(s.clone()),
        other => CellValue::Text(other.to_string()),
    }
}

fn threshold(op: &str, value: &Value) -> Result<f64, StepError> {
    json_to_cell(value)
        .coerce_number()
        .ok_or_else(|| StepError::Invalid(format!("`{op}` needs a numeric value, got {value}")))
}

fn needle(value: &Value) -> String {
    json_to_cell(value).normalized()
}

impl Condition {
    pub fn new(operator: &Operator, value: &Value) -> Result<Self, StepError> {
        Ok(match operator {
            Operator::Equals => Condition::Eq(json_to_cell(value)),
            Operator::NotEquals => Condition::Ne(json_to_cell(value)),
            Operator::Greater => Condition::Gt(threshold(">", value)?),
            Operator::Less => Condition::Lt(threshold("<", value)?),
            Operator::Other(raw) => {
                let key = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
                match key.as_str() {
                    ">=" | "gte" | "greater_or_equal" | "greater_than_or_equal" | "at_least" => {
                        Condition::Ge(threshold(">=", value)?)
                    }
                    "<=" | "lte" | "less_or_equal" | "less_than_or_equal" | "at_most" => {
                        Condition::Le(threshold("<=", value)?)
                    }
                    "contains" | "includes" => Condition::Contains(needle(value)),
                    "not_contains" | "does_not_contain" | "excludes" => {
                        Condition::NotContains(needle(value))
                    }
                    "starts_with" | "begins_with" => Condition::StartsWith(needle(value)),
                    "ends_with" => Condition::EndsWith(needle(value)),
                    "is_empty" | "is_blank" | "empty" | "blank" => Condition::IsEmpty,
                    "is_not_empty" | "is_not_blank" | "not_empty" | "not_blank" => {
                        Condition::IsNotEmpty
                    }
                    _ => return Err(StepError::UnsupportedCondition(raw.clone())),
                }
            }
        })
    }

    pub fn matches(&self, cell: &CellValue) -> bool {
        let number = || cell.coerce_number();
        match self {
            Condition::Eq(want) => equals(cell, want),
            Condition::Ne(want) => !equals(cell, want),
            Condition::Gt(t) => number().is_some_and(|n| n > *t),
            Condition::Ge(t) => number().is_some_and(|n| n >= *t),
            Condition::Lt(t) => number().is_some_and(|n| n < *t),
            Condition::Le(t) => number().is_some_and(|n| n <= *t),
            Condition::Contains(s) => cell.normalized().contains(s.as_str()),
            Condition::NotContains(s) => !cell.normalized().contains(s.as_str()),
            Condition::StartsWith(s) => cell.normalized().starts_with(s.as_str()),
            Condition::EndsWith(s) => cell.normalized().ends_with(s.as_str()),
            Condition::IsEmpty => cell.is_blank(),
            Condition::IsNotEmpty => !cell.is_blank(),
        }
    }
}

/// Numeric when both sides read as numbers, case-folded text otherwise.
fn equals(cell: &CellValue, want: &CellValue) -> bool {
    if want.is_blank() {
        return cell.is_blank();
    }
    match (cell.coerce_number(), want.coerce_number()) {
        (Some(a), Some(b)) => a == b,
        _ => cell.normalized() == want.normalized(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equality_is_numeric_or_case_folded() {
        let c = Condition::new(&Operator::Equals, &json!("north")).unwrap();
        assert!(c.matches(&"  North ".into()));
        let c = Condition::new(&Operator::Equals, &json!(10)).unwrap();
        assert!(c.matches(&CellValue::Number(10.0)));
        assert!(c.matches(&"10".into()));
    }

    #[test]
    fn extended_vocabulary() {
        let ge = Condition::new(&Operator::normalize(">="), &json!("5")).unwrap();
        assert!(ge.matches(&CellValue::Int(5)));
        assert!(!ge.matches(&"abc".into()));
        let contains = Condition::new(&Operator::normalize("contains"), &json!("ORTH")).unwrap();
        assert!(contains.matches(&"North".into()));
        let empty = Condition::new(&Operator::normalize("is_empty"), &Value::Null).unwrap();
        assert!(empty.matches(&CellValue::Empty));
    }

    #[test]
    fn unknown_and_non_numeric_thresholds_fail() {
        assert!(matches!(
            Condition::new(&Operator::normalize("between"), &json!(1)),
            Err(StepError::UnsupportedCondition(_))
        ));
        assert!(Condition::new(&Operator::Greater, &json!("lots")).is_err());
    }
}
