//! Sheet files by extension: `.json` sheet documents and `.csv`/`.tsv` text.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use sheetplan_workbook::{CsvReadOptions, MemorySheet, StoreError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SheetFormat {
    Json,
    Csv,
    Tsv,
}

impl SheetFormat {
    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(SheetFormat::Json),
            "csv" => Ok(SheetFormat::Csv),
            "tsv" => Ok(SheetFormat::Tsv),
            other => Err(StoreError::Unsupported(format!(
                "sheet file extension `{other}` (expected json, csv or tsv)"
            ))),
        }
    }

    fn csv_options(self) -> CsvReadOptions {
        CsvReadOptions {
            delimiter: if self == SheetFormat::Tsv { b'\t' } else { b',' },
            ..Default::default()
        }
    }
}

pub fn load_sheet(path: impl AsRef<Path>) -> Result<MemorySheet, StoreError> {
    let path = path.as_ref();
    match SheetFormat::from_path(path)? {
        SheetFormat::Json => MemorySheet::load_json_path(path),
        format => MemorySheet::load_csv_path(path, &format.csv_options()),
    }
}

/// Write `sheet` to `path`. CSV keeps cached values only.
pub fn save_sheet(sheet: &MemorySheet, path: impl AsRef<Path>) -> Result<(), StoreError> {
    let path = path.as_ref();
    let format = SheetFormat::from_path(path)?;
    let out = BufWriter::new(File::create(path)?);
    match format {
        SheetFormat::Json => sheet.write_json(out),
        SheetFormat::Csv => sheet.write_csv(out),
        SheetFormat::Tsv => Err(StoreError::Unsupported("writing TSV".to_string())),
    }
}
