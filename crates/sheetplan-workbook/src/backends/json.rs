//! JSON sheet documents.
//!
//! ```json
//! {
//!   "name": "Sales",
//!   "rows": [["Region", "Sales"], ["North", 120], ["South", null]],
//!   "cells": [{ "row": 4, "col": 2, "formula": "=SUM(B2:B3)", "number_format": "#,##0" }],
//!   "charts": []
//! }
//! ```
//!
//! `rows` carries plain values; strings beginning with `=` are read as
//! formulas. `cells` overlays formulas and number formats on single cells.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sheetplan_common::{CellRef, CellValue, RangeAddress};

use crate::error::StoreError;
use crate::memory::MemorySheet;
use crate::traits::{ChartSpec, TabularStore};

fn default_name() -> String {
    "Sheet1".to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SheetDocument {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub rows: Vec<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cells: Vec<CellEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub charts: Vec<ChartSpec>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CellEntry {
    pub row: u32,
    pub col: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_format: Option<String>,
}

fn from_json(value: &JsonValue) -> CellValue {
    match value {
        JsonValue::Null => CellValue::Empty,
        JsonValue::Bool(b) => CellValue::Boolean(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => CellValue::Int(i),
            None => CellValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => CellValue::Text(s.clone()),
        other => CellValue::Text(other.to_string()),
    }
}

fn to_json(value: &CellValue) -> JsonValue {
    match value {
        CellValue::Empty => JsonValue::Null,
        CellValue::Int(i) => JsonValue::from(*i),
        CellValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        CellValue::Boolean(b) => JsonValue::Bool(*b),
        other => JsonValue::String(other.to_string()),
    }
}

impl MemorySheet {
    pub fn from_document(doc: SheetDocument) -> Result<Self, StoreError> {
        let mut sheet = MemorySheet::new(doc.name);
        for (r, line) in doc.rows.iter().enumerate() {
            for (c, raw) in line.iter().enumerate() {
                let at = CellRef::new(r as u32 + 1, c as u32 + 1)?;
                match raw {
                    JsonValue::String(s) if s.starts_with('=') => sheet.set_formula(at, s)?,
                    JsonValue::Null => {}
                    other => sheet.write_cell(at, from_json(other))?,
                }
            }
        }
        for entry in &doc.cells {
            let at = CellRef::new(entry.row, entry.col)?;
            if let Some(formula) = &entry.formula {
                sheet.set_formula(at, formula)?;
            }
            if let Some(pattern) = &entry.number_format {
                let range = RangeAddress::new(at.row, at.col, at.row, at.col)?;
                sheet.set_number_format(range, pattern)?;
            }
        }
        for chart in doc.charts {
            sheet.push_chart(chart);
        }
        sheet.recalculate()?;
        Ok(sheet)
    }

    /// Snapshot of the sheet; cached formula values are kept in `rows`.
    pub fn to_document(&self) -> SheetDocument {
        let rows = self
            .values()
            .iter()
            .map(|line| line.iter().map(to_json).collect())
            .collect();
        let cells = self
            .iter_stored()
            .filter(|(_, cell)| cell.formula.is_some() || cell.number_format.is_some())
            .map(|(at, cell)| CellEntry {
                row: at.row,
                col: at.col,
                formula: cell.formula.clone(),
                number_format: cell.number_format.clone(),
            })
            .collect();
        SheetDocument {
            name: self.sheet_name().to_string(),
            rows,
            cells,
            charts: self.charts().to_vec(),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, StoreError> {
        let doc: SheetDocument =
            serde_json::from_str(text).map_err(|e| StoreError::from_backend("json", e))?;
        Self::from_document(doc)
    }

    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self, StoreError> {
        let doc: SheetDocument =
            serde_json::from_reader(reader).map_err(|e| StoreError::from_backend("json", e))?;
        Self::from_document(doc)
    }

    pub fn load_json_path(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let file = File::open(path.as_ref())?;
        Self::from_json_reader(BufReader::new(file))
    }

    pub fn to_json_string(&self) -> Result<String, StoreError> {
        serde_json::to_string_pretty(&self.to_document())
            .map_err(|e| StoreError::from_backend("json", e))
    }

    pub fn write_json<W: Write>(&self, mut writer: W) -> Result<(), StoreError> {
        let text = self.to_json_string()?;
        writer.write_all(text.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r##"{
        "name": "Sales",
        "rows": [["Region", "Sales"], ["North", 120], ["South", 80.5], [null, "=SUM(B2:B3)"]],
        "cells": [{ "row": 4, "col": 2, "number_format": "#,##0.00" }]
    }"##;

    #[test]
    fn loads_values_formulas_and_formats() {
        let sheet = MemorySheet::from_json_str(DOC).unwrap();
        assert_eq!(sheet.sheet_name(), "Sales");
        assert_eq!(sheet.last_row(), 4);
        let total = CellRef { row: 4, col: 2 };
        assert_eq!(sheet.read_cell(total).unwrap(), CellValue::Number(200.5));
        assert_eq!(sheet.number_format(4, 2), Some("#,##0.00"));
    }

    #[test]
    fn document_round_trip_keeps_formulas() {
        let sheet = MemorySheet::from_json_str(DOC).unwrap();
        let again = MemorySheet::from_json_str(&sheet.to_json_string().unwrap()).unwrap();
        assert_eq!(again.values(), sheet.values());
        assert_eq!(
            again.read_formula(CellRef { row: 4, col: 2 }).unwrap().as_deref(),
            Some("=SUM(B2:B3)")
        );
    }

    #[test]
    fn malformed_json_is_a_backend_error() {
        let err = MemorySheet::from_json_str("{ rows: ").unwrap_err();
        assert!(matches!(err, StoreError::Backend { ref backend, .. } if backend == "json"));
    }
}
