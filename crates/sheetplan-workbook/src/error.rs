use sheetplan_common::AddressError;

/// Failures raised by a [`crate::TabularStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("row {row} is outside the sheet (last row is {last_row})")]
    RowOutOfBounds { row: u32, last_row: u32 },

    #[error("column {column} is outside the sheet (last column is {last_column})")]
    ColumnOutOfBounds { column: String, last_column: String },

    #[error("invalid address: {0}")]
    Address(#[from] AddressError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{backend}: {message}")]
    Backend { backend: String, message: String },

    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl StoreError {
    pub fn from_backend(backend: &str, err: impl std::fmt::Display) -> Self {
        StoreError::Backend {
            backend: backend.to_string(),
            message: err.to_string(),
        }
    }
}
