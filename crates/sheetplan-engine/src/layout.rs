//! Header-row detection and column lookup over a live store.

use sheetplan_common::{CellValue, RangeAddress, column_letters, is_column_shaped, parse_column};
use sheetplan_workbook::{StoreError, TabularStore};

use crate::error::StepError;

/// Rows scanned when looking for the header row.
pub const HEADER_SCAN_ROWS: u32 = 10;

/// Row holding the most non-blank text cells among the first ten; the
/// earliest wins ties, and row 1 is assumed when nothing qualifies.
pub fn detect_header_row(store: &dyn TabularStore) -> Result<u32, StoreError> {
    let last_row = store.last_row().min(HEADER_SCAN_ROWS);
    if last_row == 0 {
        return Ok(1);
    }
    let rows = store.read_rows(1, last_row)?;
    let mut best = (1u32, 0usize);
    for (i, row) in rows.iter().enumerate() {
        let labels = row.iter().filter(|v| v.is_label()).count();
        if labels > best.1 {
            best = (i as u32 + 1, labels);
        }
    }
    Ok(best.0)
}

/// Header-row position for one request, computed once and handed to every step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub header_row: u32,
}

impl Layout {
    pub fn detect(store: &dyn TabularStore) -> Result<Self, StoreError> {
        Ok(Self {
            header_row: detect_header_row(store)?,
        })
    }

    pub fn first_data_row(&self) -> u32 {
        self.header_row + 1
    }

    /// Data rows currently in the store, possibly empty.
    pub fn data_rows(&self, store: &dyn TabularStore) -> std::ops::RangeInclusive<u32> {
        self.first_data_row()..=store.last_row()
    }

    pub fn data_row_count(&self, store: &dyn TabularStore) -> u32 {
        store.last_row().saturating_sub(self.header_row)
    }

    /// Columns belonging to the data table. The table ends before the first
    /// column that is blank from the header row down, so a summary table
    /// written past a gap column is not part of it.
    pub fn table_width(&self, store: &dyn TabularStore) -> Result<u32, StoreError> {
        let (last_row, last_col) = (store.last_row(), store.last_column());
        if last_col == 0 || last_row < self.header_row {
            return Ok(last_col);
        }
        let rows = store.read_range(RangeAddress::new(self.header_row, 1, last_row, last_col)?)?;
        let blank = |col: usize| {
            rows.iter()
                .all(|row| row.get(col).is_none_or(|v| v.is_blank()))
        };
        let mut seen_data = false;
        for col in 0..last_col as usize {
            match (blank(col), seen_data) {
                (true, true) => return Ok(col as u32),
                (false, _) => seen_data = true,
                (true, false) => {}
            }
        }
        Ok(last_col)
    }

    /// Header labels in column order (blank headers are empty strings).
    pub fn headers(&self, store: &dyn TabularStore) -> Result<Vec<String>, StoreError> {
        let last_col = store.last_column();
        if last_col == 0 {
            return Ok(Vec::new());
        }
        let range = RangeAddress::new(self.header_row, 1, self.header_row, last_col)?;
        Ok(store
            .read_range(range)?
            .into_iter()
            .next()
            .unwrap_or_default()
            .iter()
            .map(|v| v.to_string().trim().to_string())
            .collect())
    }

    pub fn header_of(&self, store: &dyn TabularStore, col: u32) -> Result<String, StoreError> {
        let value = store.read_cell(sheetplan_common::CellRef {
            row: self.header_row,
            col,
        })?;
        Ok(match value {
            CellValue::Empty => column_letters(col),
            other => other.to_string().trim().to_string(),
        })
    }

    /// Column index for a letter or (case-insensitively) a header label.
    pub fn locate(&self, store: &dyn TabularStore, id: &str) -> Result<u32, StepError> {
        let id = id.trim();
        if is_column_shaped(id) {
            return parse_column(id).ok_or_else(|| StepError::ColumnNotFound(id.to_string()));
        }
        let wanted = id.to_lowercase();
        self.headers(store)?
            .iter()
            .position(|h| !h.is_empty() && h.to_lowercase() == wanted)
            .map(|i| i as u32 + 1)
            .ok_or_else(|| StepError::ColumnNotFound(id.to_string()))
    }

    /// Like [`Self::locate`] but also requires the column to hold data.
    pub fn locate_existing(&self, store: &dyn TabularStore, id: &str) -> Result<u32, StepError> {
        let col = self.locate(store, id)?;
        if col > store.last_column() {
            return Err(StepError::ColumnNotFound(id.trim().to_string()));
        }
        Ok(col)
    }

    /// Data cells of one column, top to bottom, paired with their row.
    pub fn column_cells(
        &self,
        store: &dyn TabularStore,
        col: u32,
    ) -> Result<Vec<(u32, CellValue)>, StoreError> {
        let first = self.first_data_row();
        let last = store.last_row();
        if last < first {
            return Ok(Vec::new());
        }
        let values = store.read_range(RangeAddress::column(col, first, last)?)?;
        Ok(values
            .into_iter()
            .zip(first..)
            .map(|(mut row, r)| (r, row.pop().unwrap_or_default()))
            .collect())
    }
}
