use sheetplan_common::{CellRef, CellValue, RangeAddress, column_letters};

use crate::error::StoreError;
use crate::eval::{self, CellSource};
use crate::traits::{ChartId, ChartSpec, TabularStore};

/// Upper bound on recalculation sweeps; formulas that reference each other
/// settle within a handful, cycles stop here.
const MAX_RECALC_PASSES: usize = 8;

/// One stored cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub formula: Option<String>,
    pub number_format: Option<String>,
}

impl Cell {
    pub fn value(value: impl Into<CellValue>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }

    fn is_occupied(&self) -> bool {
        self.formula.is_some() || !matches!(self.value, CellValue::Empty)
    }
}

/// Single in-memory sheet stored row-major.
#[derive(Debug, Clone, Default)]
pub struct MemorySheet {
    name: String,
    rows: Vec<Vec<Cell>>,
    charts: Vec<ChartSpec>,
}

impl MemorySheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Build a sheet from plain values; row 1 is `values[0]`.
    pub fn from_rows<I, R, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let rows = values
            .into_iter()
            .map(|r| r.into_iter().map(Cell::value).collect())
            .collect();
        Self {
            name: name.into(),
            rows,
            charts: Vec::new(),
        }
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        if row == 0 || col == 0 {
            return None;
        }
        self.rows
            .get(row as usize - 1)
            .and_then(|r| r.get(col as usize - 1))
    }

    fn cell_mut(&mut self, row: u32, col: u32) -> &mut Cell {
        let (r, c) = (row as usize - 1, col as usize - 1);
        if self.rows.len() <= r {
            self.rows.resize_with(r + 1, Vec::new);
        }
        let line = &mut self.rows[r];
        if line.len() <= c {
            line.resize_with(c + 1, Cell::default);
        }
        &mut line[c]
    }

    pub fn charts(&self) -> &[ChartSpec] {
        &self.charts
    }

    pub fn number_format(&self, row: u32, col: u32) -> Option<&str> {
        self.cell(row, col).and_then(|c| c.number_format.as_deref())
    }

    /// Plain values of the used area, row-major.
    pub fn values(&self) -> Vec<Vec<CellValue>> {
        let (rows, cols) = (self.last_row(), self.last_column());
        (1..=rows)
            .map(|r| {
                (1..=cols)
                    .map(|c| self.cell(r, c).map(|x| x.value.clone()).unwrap_or_default())
                    .collect()
            })
            .collect()
    }

    /// Iterate every stored cell with its coordinate.
    pub fn iter_cells(&self) -> impl Iterator<Item = (CellRef, &Cell)> + '_ {
        self.rows.iter().enumerate().flat_map(|(r, line)| {
            line.iter().enumerate().filter_map(move |(c, cell)| {
                cell.is_occupied().then_some((
                    CellRef {
                        row: r as u32 + 1,
                        col: c as u32 + 1,
                    },
                    cell,
                ))
            })
        })
    }

    /// Like [`Self::iter_cells`] but also yields cells that only carry a number format.
    #[cfg(feature = "json")]
    pub(crate) fn iter_stored(&self) -> impl Iterator<Item = (CellRef, &Cell)> + '_ {
        self.rows.iter().enumerate().flat_map(|(r, line)| {
            line.iter().enumerate().filter_map(move |(c, cell)| {
                (cell.is_occupied() || cell.number_format.is_some()).then_some((
                    CellRef {
                        row: r as u32 + 1,
                        col: c as u32 + 1,
                    },
                    cell,
                ))
            })
        })
    }

    pub(crate) fn push_chart(&mut self, chart: ChartSpec) {
        self.charts.push(chart);
    }

    fn check_row(&self, row: u32) -> Result<(), StoreError> {
        let last_row = self.last_row();
        if row == 0 || row > last_row {
            return Err(StoreError::RowOutOfBounds { row, last_row });
        }
        Ok(())
    }

    fn check_column(&self, col: u32) -> Result<(), StoreError> {
        let last = self.last_column();
        if col == 0 || col > last {
            return Err(StoreError::ColumnOutOfBounds {
                column: column_letters(col),
                last_column: column_letters(last),
            });
        }
        Ok(())
    }
}

impl CellSource for MemorySheet {
    fn value_at(&self, row: u32, col: u32) -> CellValue {
        self.cell(row, col)
            .map(|c| c.value.clone())
            .unwrap_or_default()
    }

    fn used_rows(&self) -> u32 {
        self.last_row()
    }
}

impl TabularStore for MemorySheet {
    fn sheet_name(&self) -> &str {
        &self.name
    }

    fn last_row(&self) -> u32 {
        self.rows
            .iter()
            .rposition(|line| line.iter().any(Cell::is_occupied))
            .map_or(0, |i| i as u32 + 1)
    }

    fn last_column(&self) -> u32 {
        self.rows
            .iter()
            .filter_map(|line| line.iter().rposition(Cell::is_occupied))
            .max()
            .map_or(0, |i| i as u32 + 1)
    }

    fn read_range(&self, range: RangeAddress) -> Result<Vec<Vec<CellValue>>, StoreError> {
        Ok((range.start_row..=range.end_row)
            .map(|r| {
                (range.start_col..=range.end_col)
                    .map(|c| self.value_at(r, c))
                    .collect()
            })
            .collect())
    }

    fn write_range(
        &mut self,
        origin: CellRef,
        values: &[Vec<CellValue>],
    ) -> Result<(), StoreError> {
        CellRef::new(origin.row, origin.col)?;
        for (dr, line) in values.iter().enumerate() {
            for (dc, value) in line.iter().enumerate() {
                let cell = self.cell_mut(origin.row + dr as u32, origin.col + dc as u32);
                cell.value = value.clone();
                cell.formula = None;
            }
        }
        Ok(())
    }

    fn read_formula(&self, cell: CellRef) -> Result<Option<String>, StoreError> {
        Ok(self.cell(cell.row, cell.col).and_then(|c| c.formula.clone()))
    }

    fn set_formula(&mut self, cell: CellRef, formula: &str) -> Result<(), StoreError> {
        CellRef::new(cell.row, cell.col)?;
        let slot = self.cell_mut(cell.row, cell.col);
        slot.formula = Some(formula.to_string());
        slot.value = CellValue::Empty;
        Ok(())
    }

    fn set_number_format(
        &mut self,
        range: RangeAddress,
        pattern: &str,
    ) -> Result<(), StoreError> {
        for at in range.cells() {
            self.cell_mut(at.row, at.col).number_format = Some(pattern.to_string());
        }
        Ok(())
    }

    fn clear_cell(&mut self, cell: CellRef) -> Result<(), StoreError> {
        CellRef::new(cell.row, cell.col)?;
        if let Some(slot) = self
            .rows
            .get_mut(cell.row as usize - 1)
            .and_then(|line| line.get_mut(cell.col as usize - 1))
        {
            *slot = Cell::default();
        }
        Ok(())
    }

    fn insert_column(&mut self, before: u32) -> Result<(), StoreError> {
        if before == 0 {
            return Err(StoreError::Address(sheetplan_common::AddressError::ZeroIndex));
        }
        let at = before as usize - 1;
        for line in &mut self.rows {
            if line.len() >= at {
                line.insert(at, Cell::default());
            }
        }
        Ok(())
    }

    fn delete_column(&mut self, col: u32) -> Result<(), StoreError> {
        self.check_column(col)?;
        let at = col as usize - 1;
        for line in &mut self.rows {
            if line.len() > at {
                line.remove(at);
            }
        }
        Ok(())
    }

    fn insert_row(&mut self, before: u32) -> Result<(), StoreError> {
        if before == 0 {
            return Err(StoreError::Address(sheetplan_common::AddressError::ZeroIndex));
        }
        let at = (before as usize - 1).min(self.rows.len());
        self.rows.insert(at, Vec::new());
        Ok(())
    }

    fn delete_row(&mut self, row: u32) -> Result<(), StoreError> {
        self.check_row(row)?;
        self.rows.remove(row as usize - 1);
        Ok(())
    }

    fn recalculate(&mut self) -> Result<(), StoreError> {
        let formulas: Vec<(CellRef, String)> = self
            .iter_cells()
            .filter_map(|(at, cell)| cell.formula.clone().map(|f| (at, f)))
            .collect();
        if formulas.is_empty() {
            return Ok(());
        }
        for _ in 0..MAX_RECALC_PASSES {
            let results: Vec<CellValue> = formulas
                .iter()
                .map(|(_, f)| eval::evaluate(f, &*self))
                .collect();
            let mut changed = false;
            for ((at, _), value) in formulas.iter().zip(results) {
                let slot = self.cell_mut(at.row, at.col);
                if slot.value != value {
                    slot.value = value;
                    changed = true;
                }
            }
            if !changed {
                #[cfg(feature = "tracing")]
                tracing::debug!(sheet = %self.name, formulas = formulas.len(), "recalculated");
                return Ok(());
            }
        }
        #[cfg(feature = "tracing")]
        tracing::warn!(sheet = %self.name, "recalculation did not settle");
        Ok(())
    }

    fn create_chart(&mut self, chart: ChartSpec) -> Result<ChartId, StoreError> {
        self.push_chart(chart);
        Ok(self.charts.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales() -> MemorySheet {
        MemorySheet::from_rows(
            "Sales",
            vec![
                vec![CellValue::from("Region"), "Sales".into()],
                vec!["North".into(), CellValue::Int(10)],
                vec!["South".into(), CellValue::Int(20)],
            ],
        )
    }

    #[test]
    fn bounds_track_occupied_cells() {
        let mut sheet = sales();
        assert_eq!((sheet.last_row(), sheet.last_column()), (3, 2));
        sheet.write_cell(CellRef { row: 1, col: 9 }, "x".into()).unwrap();
        assert_eq!(sheet.last_column(), 9);
        sheet.clear_cell(CellRef { row: 1, col: 9 }).unwrap();
        assert_eq!(sheet.last_column(), 2);
    }

    #[test]
    fn formulas_recalculate() {
        let mut sheet = sales();
        let at = CellRef { row: 4, col: 2 };
        sheet.set_formula(at, "=SUM(B2:B3)").unwrap();
        assert_eq!(sheet.read_cell(at).unwrap(), CellValue::Empty);
        sheet.recalculate().unwrap();
        assert_eq!(sheet.read_cell(at).unwrap(), CellValue::Int(30));
        assert_eq!(sheet.read_formula(at).unwrap().as_deref(), Some("=SUM(B2:B3)"));
    }

    #[test]
    fn delete_row_shifts_up() {
        let mut sheet = sales();
        sheet.delete_row(2).unwrap();
        assert_eq!(sheet.read_cell(CellRef { row: 2, col: 1 }).unwrap(), "South".into());
        assert!(matches!(
            sheet.delete_row(5),
            Err(StoreError::RowOutOfBounds { row: 5, last_row: 2 })
        ));
    }

    #[test]
    fn column_insert_and_delete() {
        let mut sheet = sales();
        sheet.insert_column(2).unwrap();
        assert_eq!(sheet.read_cell(CellRef { row: 2, col: 3 }).unwrap(), CellValue::Int(10));
        sheet.delete_column(2).unwrap();
        assert_eq!(sheet.read_cell(CellRef { row: 2, col: 2 }).unwrap(), CellValue::Int(10));
        assert!(sheet.delete_column(7).is_err());
    }
}
