use serde::{Deserialize, Serialize};
use sheetplan_common::{CellRef, CellValue, RangeAddress};

use crate::error::StoreError;

/// Identifier handed back by [`TabularStore::create_chart`].
pub type ChartId = usize;

/// Presentation options applied when a chart is inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartOptions {
    pub legend_position: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            legend_position: "bottom".to_string(),
            width: 600,
            height: 371,
            colors: Vec::new(),
            font_family: None,
        }
    }
}

/// Chart insertion request: a domain column, one or more series columns, an anchor cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub chart_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub domain: RangeAddress,
    pub series: Vec<RangeAddress>,
    pub anchor: CellRef,
    #[serde(default)]
    pub options: ChartOptions,
}

/// Capability surface of one sheet. All indices are 1-based.
///
/// Reads outside the used area return [`CellValue::Empty`]; writes grow the
/// used area. Deleting a row shifts every row below it up by one, so
/// callers removing several rows must go bottom-up.
pub trait TabularStore {
    fn sheet_name(&self) -> &str;

    /// Last row holding a value or a formula; 0 for an empty sheet.
    fn last_row(&self) -> u32;

    /// Last column holding a value or a formula; 0 for an empty sheet.
    fn last_column(&self) -> u32;

    fn read_range(&self, range: RangeAddress) -> Result<Vec<Vec<CellValue>>, StoreError>;

    fn write_range(&mut self, origin: CellRef, values: &[Vec<CellValue>])
    -> Result<(), StoreError>;

    fn read_formula(&self, cell: CellRef) -> Result<Option<String>, StoreError>;

    /// Store `formula` in `cell`; the cached value is stale until [`Self::recalculate`].
    fn set_formula(&mut self, cell: CellRef, formula: &str) -> Result<(), StoreError>;

    fn set_number_format(&mut self, range: RangeAddress, pattern: &str)
    -> Result<(), StoreError>;

    /// Remove value, formula and number format from `cell`.
    fn clear_cell(&mut self, cell: CellRef) -> Result<(), StoreError>;

    /// Insert an empty column so that it becomes column `before`.
    fn insert_column(&mut self, before: u32) -> Result<(), StoreError>;

    fn delete_column(&mut self, col: u32) -> Result<(), StoreError>;

    /// Insert an empty row so that it becomes row `before`.
    fn insert_row(&mut self, before: u32) -> Result<(), StoreError>;

    fn delete_row(&mut self, row: u32) -> Result<(), StoreError>;

    /// Bring every formula's cached value up to date.
    fn recalculate(&mut self) -> Result<(), StoreError>;

    fn create_chart(&mut self, chart: ChartSpec) -> Result<ChartId, StoreError>;

    fn read_cell(&self, cell: CellRef) -> Result<CellValue, StoreError> {
        let range = RangeAddress::new(cell.row, cell.col, cell.row, cell.col)?;
        let mut rows = self.read_range(range)?;
        Ok(rows
            .pop()
            .and_then(|mut row| row.pop())
            .unwrap_or_default())
    }

    fn write_cell(&mut self, cell: CellRef, value: CellValue) -> Result<(), StoreError> {
        self.write_range(cell, &[vec![value]])
    }

    /// Whole rows `start_row..=end_row` across `1..=last_column`.
    fn read_rows(&self, start_row: u32, end_row: u32) -> Result<Vec<Vec<CellValue>>, StoreError> {
        let last_col = self.last_column();
        if last_col == 0 || end_row < start_row {
            return Ok(Vec::new());
        }
        self.read_range(RangeAddress::new(start_row, 1, end_row, last_col)?)
    }
}

impl<T: TabularStore + ?Sized> TabularStore for &mut T {
    fn sheet_name(&self) -> &str {
        (**self).sheet_name()
    }
    fn last_row(&self) -> u32 {
        (**self).last_row()
    }
    fn last_column(&self) -> u32 {
        (**self).last_column()
    }
    fn read_range(&self, range: RangeAddress) -> Result<Vec<Vec<CellValue>>, StoreError> {
        (**self).read_range(range)
    }
    fn write_range(
        &mut self,
        origin: CellRef,
        values: &[Vec<CellValue>],
    ) -> Result<(), StoreError> {
        (**self).write_range(origin, values)
    }
    fn read_formula(&self, cell: CellRef) -> Result<Option<String>, StoreError> {
        (**self).read_formula(cell)
    }
    fn set_formula(&mut self, cell: CellRef, formula: &str) -> Result<(), StoreError> {
        (**self).set_formula(cell, formula)
    }
    fn set_number_format(
        &mut self,
        range: RangeAddress,
        pattern: &str,
    ) -> Result<(), StoreError> {
        (**self).set_number_format(range, pattern)
    }
    fn clear_cell(&mut self, cell: CellRef) -> Result<(), StoreError> {
        (**self).clear_cell(cell)
    }
    fn insert_column(&mut self, before: u32) -> Result<(), StoreError> {
        (**self).insert_column(before)
    }
    fn delete_column(&mut self, col: u32) -> Result<(), StoreError> {
        (**self).delete_column(col)
    }
    fn insert_row(&mut self, before: u32) -> Result<(), StoreError> {
        (**self).insert_row(before)
    }
    fn delete_row(&mut self, row: u32) -> Result<(), StoreError> {
        (**self).delete_row(row)
    }
    fn recalculate(&mut self) -> Result<(), StoreError> {
        (**self).recalculate()
    }
    fn create_chart(&mut self, chart: ChartSpec) -> Result<ChartId, StoreError> {
        (**self).create_chart(chart)
    }
}
