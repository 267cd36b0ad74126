//! Tabular store layer.
//!
//! [`TabularStore`] is the capability surface the step executor drives:
//! ranged reads and writes, row/column insertion and deletion, formula and
//! number-format setters, a recalculation trigger, and chart creation.
//! [`MemorySheet`] implements it for one in-memory sheet and is what the
//! CLI and the tests run against.

pub mod backends;
pub mod error;
pub mod eval;
pub mod memory;
pub mod traits;

#[cfg(feature = "csv")]
pub use backends::csv::CsvReadOptions;
#[cfg(feature = "json")]
pub use backends::json::SheetDocument;
pub use error::StoreError;
pub use memory::{Cell, MemorySheet};
pub use traits::{ChartId, ChartOptions, ChartSpec, TabularStore};

// Re-export for convenience
pub use sheetplan_common::{CellRef, CellValue, RangeAddress};
