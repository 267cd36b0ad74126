use chrono::NaiveDate;
use std::fmt::{self, Display};

use crate::CellError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Value held by one cell of a tabular store.
///
/// Formula cells carry their last computed value here; the formula text
/// itself lives beside the value in the store.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Int(i64),
    Number(f64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
    Error(CellError),
}

impl Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Error(e) => write!(f, "{}", e.kind),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl CellValue {
    /// Empty cells and whitespace-only text both count as blank.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Non-blank text; the header-row heuristic counts these.
    pub fn is_label(&self) -> bool {
        matches!(self, CellValue::Text(s) if !s.trim().is_empty())
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Int(_) | CellValue::Number(_))
    }

    /// Numeric view of the cell without any text parsing.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view that also accepts numeric-looking text (`" 42 "`, `"3.5"`).
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            other => other.as_number(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Case-folded, trimmed rendering used for equality and duplicate checks.
    pub fn normalized(&self) -> String {
        self.to_string().trim().to_lowercase()
    }

    /// Collapse integral floats to `Int` so repeated writes compare equal.
    pub fn from_number(n: f64) -> Self {
        if n.fract() == 0.0 && n.abs() < 9.0e15 {
            CellValue::Int(n as i64)
        } else {
            CellValue::Number(n)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_label_detection() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::from("   ").is_blank());
        assert!(!CellValue::Int(0).is_blank());
        assert!(CellValue::from("Region").is_label());
        assert!(!CellValue::from(" ").is_label());
        assert!(!CellValue::Number(3.0).is_label());
    }

    #[test]
    fn number_views() {
        assert_eq!(CellValue::Int(4).as_number(), Some(4.0));
        assert_eq!(CellValue::from(" 3.5 ").as_number(), None);
        assert_eq!(CellValue::from(" 3.5 ").coerce_number(), Some(3.5));
        assert_eq!(CellValue::from("abc").coerce_number(), None);
        assert_eq!(CellValue::from_number(12.0), CellValue::Int(12));
        assert_eq!(CellValue::from_number(1.25), CellValue::Number(1.25));
    }

    #[test]
    fn normalized_folds_case() {
        assert_eq!(CellValue::from("  North ").normalized(), "north");
        assert_eq!(CellValue::Boolean(true).normalized(), "true");
    }
}
