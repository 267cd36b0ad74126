//! A1-style cell addresses.

use std::error::Error;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::column::{column_letters, parse_column};

/// Errors raised while building or parsing addresses.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AddressError {
    /// Encountered a 0 where a 1-based index was required.
    ZeroIndex,
    /// Start/end coordinates were not ordered (start <= end).
    RangeOrder,
    /// Text could not be read as an A1 reference.
    Parse(String),
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::ZeroIndex => {
                write!(f, "row and column indices must be 1-based (>= 1)")
            }
            AddressError::RangeOrder => {
                write!(
                    f,
                    "range must be ordered so the start is above/left of the end"
                )
            }
            AddressError::Parse(text) => write!(f, "`{text}` is not a valid A1 reference"),
        }
    }
}

impl Error for AddressError {}

/// 1-based cell coordinate.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Result<Self, AddressError> {
        if row == 0 || col == 0 {
            return Err(AddressError::ZeroIndex);
        }
        Ok(Self { row, col })
    }

    /// Parse `B7`, `$B$7`, or `b7`.
    pub fn parse_a1(text: &str) -> Result<Self, AddressError> {
        let cleaned: String = text.trim().chars().filter(|c| *c != '$').collect();
        let split = cleaned
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| AddressError::Parse(text.to_string()))?;
        let (letters, digits) = cleaned.split_at(split);
        let col = parse_column(letters).ok_or_else(|| AddressError::Parse(text.to_string()))?;
        let row: u32 = digits
            .parse()
            .map_err(|_| AddressError::Parse(text.to_string()))?;
        Self::new(row, col)
    }

    pub fn column_letters(&self) -> String {
        column_letters(self.col)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_relative_and_absolute() {
        assert_eq!(CellRef::parse_a1("B7").unwrap(), CellRef { row: 7, col: 2 });
        assert_eq!(CellRef::parse_a1("$AA$10").unwrap(), CellRef { row: 10, col: 27 });
        assert_eq!(CellRef::parse_a1("c3").unwrap().to_string(), "C3");
    }

    #[test]
    fn rejects_malformed() {
        assert!(matches!(CellRef::parse_a1("B"), Err(AddressError::Parse(_))));
        assert!(matches!(CellRef::parse_a1("7"), Err(AddressError::Parse(_))));
        assert_eq!(CellRef::parse_a1("A0"), Err(AddressError::ZeroIndex));
    }
}
