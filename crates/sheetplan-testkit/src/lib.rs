//! Fixture sheets and a recording store for Sheetplan tests.

use std::path::PathBuf;

use sheetplan_common::{CellRef, CellValue, RangeAddress};
use sheetplan_workbook::{ChartId, ChartSpec, MemorySheet, StoreError, TabularStore};
use tempfile::TempDir;

/// Shorthand for building fixture rows.
pub fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

pub fn int(i: i64) -> CellValue {
    CellValue::Int(i)
}

/// Sheet with `headers` in row 1 followed by `rows`.
pub fn sheet(name: &str, headers: &[&str], rows: Vec<Vec<CellValue>>) -> MemorySheet {
    let mut all = vec![headers.iter().map(|h| text(h)).collect::<Vec<_>>()];
    all.extend(rows);
    MemorySheet::from_rows(name, all)
}

/// Sales report whose headers sit on row 3 under a title and a blank row.
///
/// Columns: Region (A), Rep (B), Sales (C), Units (D), Year (E); eight data
/// rows on 4..=11.
pub fn sales_report() -> MemorySheet {
    let data: [(&str, &str, i64, i64, i64); 8] = [
        ("North", "Alice", 1200, 10, 2021),
        ("South", "Bob", 800, 8, 2021),
        ("East", "Carol", 1500, 12, 2022),
        ("West", "Dan", 400, 4, 2022),
        ("North", "Eve", 950, 9, 2023),
        ("South", "Frank", 700, 7, 2023),
        ("East", "Grace", 1100, 11, 2024),
        ("West", "Heidi", 300, 3, 2024),
    ];
    let mut rows = vec![
        vec![text("Quarterly Sales Report")],
        vec![],
        ["Region", "Rep", "Sales", "Units", "Year"]
            .iter()
            .map(|h| text(h))
            .collect(),
    ];
    rows.extend(data.iter().map(|(region, rep, sales, units, year)| {
        vec![text(region), text(rep), int(*sales), int(*units), int(*year)]
    }));
    MemorySheet::from_rows("Sales", rows)
}

/// Contact list with stray whitespace, mixed case, a duplicate email,
/// blanks, and currency text in Amount.
pub fn messy_contacts() -> MemorySheet {
    sheet(
        "Contacts",
        &["Name", "Email", "City", "Amount"],
        vec![
            vec![text("  Ada Lovelace "), text("ada@example.com"), text("london"), text("$1,200.50")],
            vec![text("Alan Turing"), text("alan@example.com"), text("MANCHESTER"), text("300")],
            vec![text("Grace Hopper"), text("grace@example.com"), CellValue::Empty, text("45%")],
            vec![text(" Ada L. "), text("ada@example.com"), text("London"), int(75)],
            vec![],
            vec![text("Linus"), CellValue::Empty, text("helsinki"), text("n/a")],
        ],
    )
}

/// `Id`/`Status` sheet, one data row per status.
pub fn status_sheet(statuses: &[&str]) -> MemorySheet {
    sheet(
        "Tickets",
        &["Id", "Status"],
        statuses
            .iter()
            .enumerate()
            .map(|(i, s)| vec![int(i as i64 + 1), text(s)])
            .collect(),
    )
}

/// Temporary directory that lives as long as the returned guard.
pub struct TempWorkspace {
    dir: TempDir,
}

impl TempWorkspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).expect("write fixture");
        path
    }
}

impl Default for TempWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutation seen by a [`RecordingStore`].
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    WriteRange { origin: CellRef, rows: usize },
    SetFormula { cell: CellRef, formula: String },
    SetNumberFormat { range: RangeAddress, pattern: String },
    ClearCell(CellRef),
    InsertColumn(u32),
    DeleteColumn(u32),
    InsertRow(u32),
    DeleteRow(u32),
    Recalculate,
    CreateChart(String),
}

/// Store decorator that records every mutation before forwarding it.
pub struct RecordingStore<S> {
    inner: S,
    log: Vec<Mutation>,
}

impl<S: TabularStore> RecordingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            log: Vec::new(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.log
    }

    /// Row deletions in the order they were issued.
    pub fn deleted_rows(&self) -> Vec<u32> {
        self.log
            .iter()
            .filter_map(|m| match m {
                Mutation::DeleteRow(r) => Some(*r),
                _ => None,
            })
            .collect()
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }
}

impl<S: TabularStore> TabularStore for RecordingStore<S> {
    fn sheet_name(&self) -> &str {
        self.inner.sheet_name()
    }

    fn last_row(&self) -> u32 {
        self.inner.last_row()
    }

    fn last_column(&self) -> u32 {
        self.inner.last_column()
    }

    fn read_range(&self, range: RangeAddress) -> Result<Vec<Vec<CellValue>>, StoreError> {
        self.inner.read_range(range)
    }

    fn write_range(&mut self, origin: CellRef, values: &[Vec<CellValue>]) -> Result<(), StoreError> {
        self.log.push(Mutation::WriteRange {
            origin,
            rows: values.len(),
        });
        self.inner.write_range(origin, values)
    }

    fn read_formula(&self, cell: CellRef) -> Result<Option<String>, StoreError> {
        self.inner.read_formula(cell)
    }

    fn set_formula(&mut self, cell: CellRef, formula: &str) -> Result<(), StoreError> {
        self.log.push(Mutation::SetFormula {
            cell,
            formula: formula.to_string(),
        });
        self.inner.set_formula(cell, formula)
    }

    fn set_number_format(&mut self, range: RangeAddress, pattern: &str) -> Result<(), StoreError> {
        self.log.push(Mutation::SetNumberFormat {
            range,
            pattern: pattern.to_string(),
        });
        self.inner.set_number_format(range, pattern)
    }

    fn clear_cell(&mut self, cell: CellRef) -> Result<(), StoreError> {
        self.log.push(Mutation::ClearCell(cell));
        self.inner.clear_cell(cell)
    }

    fn insert_column(&mut self, before: u32) -> Result<(), StoreError> {
        self.log.push(Mutation::InsertColumn(before));
        self.inner.insert_column(before)
    }

    fn delete_column(&mut self, col: u32) -> Result<(), StoreError> {
        self.log.push(Mutation::DeleteColumn(col));
        self.inner.delete_column(col)
    }

    fn insert_row(&mut self, before: u32) -> Result<(), StoreError> {
        self.log.push(Mutation::InsertRow(before));
        self.inner.insert_row(before)
    }

    fn delete_row(&mut self, row: u32) -> Result<(), StoreError> {
        self.log.push(Mutation::DeleteRow(row));
        self.inner.delete_row(row)
    }

    fn recalculate(&mut self) -> Result<(), StoreError> {
        self.log.push(Mutation::Recalculate);
        self.inner.recalculate()
    }

    fn create_chart(&mut self, chart: ChartSpec) -> Result<ChartId, StoreError> {
        self.log.push(Mutation::CreateChart(chart.chart_type.clone()));
        self.inner.create_chart(chart)
    }
}
