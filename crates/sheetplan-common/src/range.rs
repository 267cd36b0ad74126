use std::fmt;

use crate::address::{AddressError, CellRef};
use crate::column::column_letters;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Inclusive, 1-based rectangular range on the active sheet.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RangeAddress {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl RangeAddress {
    pub fn new(
        start_row: u32,
        start_col: u32,
        end_row: u32,
        end_col: u32,
    ) -> Result<Self, AddressError> {
        if start_row == 0 || start_col == 0 || end_row == 0 || end_col == 0 {
            return Err(AddressError::ZeroIndex);
        }
        if start_row > end_row || start_col > end_col {
            return Err(AddressError::RangeOrder);
        }
        Ok(Self {
            start_row,
            start_col,
            end_row,
            end_col,
        })
    }

    /// Single-column range from `start_row` to `end_row`.
    pub fn column(col: u32, start_row: u32, end_row: u32) -> Result<Self, AddressError> {
        Self::new(start_row, col, end_row, col)
    }

    /// Parse `A1:C10` or a single cell `B4`.
    pub fn parse_a1(text: &str) -> Result<Self, AddressError> {
        match text.split_once(':') {
            Some((start, end)) => {
                let start = CellRef::parse_a1(start)?;
                let end = CellRef::parse_a1(end)?;
                Self::new(start.row, start.col, end.row, end.col)
            }
            None => {
                let cell = CellRef::parse_a1(text)?;
                Self::new(cell.row, cell.col, cell.row, cell.col)
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.end_col - self.start_col + 1
    }

    pub fn height(&self) -> u32 {
        self.end_row - self.start_row + 1
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        (self.start_row..=self.end_row).contains(&cell.row)
            && (self.start_col..=self.end_col).contains(&cell.col)
    }

    /// Iterate cells row-major.
    pub fn cells(&self) -> impl Iterator<Item = CellRef> + '_ {
        (self.start_row..=self.end_row).flat_map(move |row| {
            (self.start_col..=self.end_col).map(move |col| CellRef { row, col })
        })
    }
}

impl fmt::Display for RangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}{}",
            column_letters(self.start_col),
            self.start_row,
            column_letters(self.end_col),
            self.end_row
        )
    }
}
