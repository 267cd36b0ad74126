//! CSV import/export. A CSV file is one sheet; formulas and formats are not carried.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use sheetplan_common::{CellRef, CellValue};

use crate::error::StoreError;
use crate::memory::MemorySheet;
use crate::traits::TabularStore;

#[derive(Clone, Debug)]
pub struct CsvReadOptions {
    /// Field delimiter as a single byte. Use `b'\t'` for TSV.
    pub delimiter: u8,
    pub trim: bool,
    /// Read unambiguous booleans and numbers as such; otherwise every field is text.
    pub infer_types: bool,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            trim: false,
            infer_types: true,
        }
    }
}

fn csv_err(e: csv::Error) -> StoreError {
    StoreError::from_backend("csv", e)
}

impl MemorySheet {
    pub fn from_csv_reader<R: Read>(
        name: impl Into<String>,
        reader: R,
        options: &CsvReadOptions,
    ) -> Result<Self, StoreError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(false)
            .flexible(true)
            .trim(if options.trim {
                csv::Trim::All
            } else {
                csv::Trim::None
            })
            .from_reader(reader);

        let mut sheet = MemorySheet::new(name);
        for (r, record) in rdr.records().enumerate() {
            let record = record.map_err(csv_err)?;
            for (c, field) in record.iter().enumerate() {
                if let Some(value) = infer_field(field, options.infer_types) {
                    sheet.write_cell(CellRef::new(r as u32 + 1, c as u32 + 1)?, value)?;
                }
            }
        }
        Ok(sheet)
    }

    /// Load a CSV file; the sheet is named after the file stem.
    pub fn load_csv_path(
        path: impl AsRef<Path>,
        options: &CsvReadOptions,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Sheet1")
            .to_string();
        let file = File::open(path)?;
        Self::from_csv_reader(name, BufReader::new(file), options)
    }

    /// Write cached values of the used area.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), StoreError> {
        let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);
        for line in self.values() {
            wtr.write_record(line.iter().map(|v| v.to_string()))
                .map_err(csv_err)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn infer_field(field: &str, infer: bool) -> Option<CellValue> {
    if field.is_empty() {
        return None;
    }
    if !infer {
        return Some(CellValue::Text(field.to_string()));
    }
    if let Some(b) = parse_bool(field) {
        return Some(CellValue::Boolean(b));
    }
    if let Some(i) = parse_unambiguous_i64(field) {
        return Some(CellValue::Int(i));
    }
    if let Some(n) = parse_unambiguous_f64(field) {
        return Some(CellValue::Number(n));
    }
    Some(CellValue::Text(field.to_string()))
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Leading zeros (`007`) stay text so identifiers survive.
fn parse_unambiguous_i64(s: &str) -> Option<i64> {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    s.parse().ok()
}

fn parse_unambiguous_f64(s: &str) -> Option<f64> {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    if !digits.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.") {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}
