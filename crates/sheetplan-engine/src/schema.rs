//! Read-only description of the sheet the planner works against.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheetplan_common::column_letters;
use sheetplan_workbook::{StoreError, TabularStore};

use crate::error::CompileError;
use crate::layout::Layout;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SheetSchema {
    pub sheet_name: String,
    pub headers: Vec<Header>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_data: Vec<Vec<Value>>,
    #[serde(default)]
    pub row_count: u32,
    #[serde(default)]
    pub col_count: u32,
    #[serde(default = "default_header_row")]
    pub header_row_number: u32,
}

fn default_header_row() -> u32 {
    1
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub name: String,
    pub column_letter: String,
    /// 1-based column index.
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_max: Option<MinMax>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

impl Header {
    pub fn new(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            column_letter: column_letters(index),
            index,
            detected_type: None,
            top_values: None,
            min_max: None,
        }
    }
}

impl SheetSchema {
    /// Column letters must be unique and agree with each header's index.
    pub fn validate(&self) -> Result<(), CompileError> {
        let mut seen = std::collections::BTreeSet::new();
        for header in &self.headers {
            let expected = column_letters(header.index);
            if !header.column_letter.eq_ignore_ascii_case(&expected) {
                return Err(CompileError::Schema(format!(
                    "header `{}` has letter {} but index {} (expected {expected})",
                    header.name, header.column_letter, header.index
                )));
            }
            if !seen.insert(expected.clone()) {
                return Err(CompileError::Schema(format!(
                    "column {expected} appears more than once"
                )));
            }
        }
        if self.header_row_number == 0 {
            return Err(CompileError::Schema("header row number must be >= 1".into()));
        }
        Ok(())
    }

    /// First row below the headers.
    pub fn first_data_row(&self) -> u32 {
        self.header_row_number + 1
    }

    /// Minimal schema read from a store: header names and positions, sizes.
    /// Types, top values and samples are left empty.
    pub fn from_store(store: &dyn TabularStore) -> Result<Self, StoreError> {
        let layout = Layout::detect(store)?;
        let headers = layout
            .headers(store)?
            .into_iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(i, name)| Header::new(name, i as u32 + 1))
            .collect();
        Ok(Self {
            sheet_name: store.sheet_name().to_string(),
            headers,
            sample_data: Vec::new(),
            row_count: layout.data_row_count(store),
            col_count: store.last_column(),
            header_row_number: layout.header_row,
        })
    }
}
