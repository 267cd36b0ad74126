//! Row handlers: sort, filter and row deletion.

use std::cmp::Ordering;

use rustc_hash::FxHashSet;
use sheetplan_common::{CellRef, CellValue, RangeAddress, column_letters};
use sheetplan_workbook::TabularStore;

use super::StepContext;
use super::condition::Condition;
use super::impact::{Impact, delete_rows_descending, delete_rows_within};
use crate::config::FilterPolicy;
use crate::error::StepError;
use crate::plan::{DeleteMode, DeleteRowsParams, FilterParams, SortOrder, SortParams};

enum SortKey {
    Number(f64),
    Text(String),
    Blank,
}

impl SortKey {
    fn of(value: &CellValue) -> Self {
        match value {
            v if v.is_blank() => SortKey::Blank,
            CellValue::Int(i) => SortKey::Number(*i as f64),
            CellValue::Number(n) => SortKey::Number(*n),
            CellValue::Date(d) => SortKey::Number(f64::from(chrono::Datelike::num_days_from_ce(d))),
            other => SortKey::Text(other.normalized()),
        }
    }
}

/// Numbers before text; blanks last whichever way the rest is ordered.
fn compare_keys(a: &SortKey, b: &SortKey, order: SortOrder) -> Ordering {
    let base = match (a, b) {
        (SortKey::Blank, SortKey::Blank) => return Ordering::Equal,
        (SortKey::Blank, _) => return Ordering::Greater,
        (_, SortKey::Blank) => return Ordering::Less,
        (SortKey::Number(x), SortKey::Number(y)) => x.total_cmp(y),
        (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
        (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
        (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
    };
    match order {
        SortOrder::Ascending => base,
        SortOrder::Descending => base.reverse(),
    }
}

pub(super) fn sort_data(
    store: &mut dyn TabularStore,
    ctx: &StepContext<'_>,
    p: &SortParams,
) -> Result<String, StepError> {
    let col = ctx.layout.locate_existing(&*store, &p.column)?;
    let header = ctx.layout.header_of(&*store, col)?;
    let first = ctx.layout.first_data_row();
    let (last_row, width) = (store.last_row(), ctx.layout.table_width(&*store)?);
    if col > width {
        return Err(StepError::Invalid(format!(
            "{header} is outside the data table (columns A to {})",
            column_letters(width)
        )));
    }
    if last_row < first {
        return Ok(format!("No data rows to sort by {header}"));
    }
    let rows = store.read_range(RangeAddress::new(first, 1, last_row, width)?)?;
    let key_index = col as usize - 1;
    let mut keyed: Vec<(SortKey, Vec<CellValue>)> = rows
        .into_iter()
        .map(|row| (row.get(key_index).map_or(SortKey::Blank, SortKey::of), row))
        .collect();
    keyed.sort_by(|a, b| compare_keys(&a.0, &b.0, p.order));
    let sorted: Vec<Vec<CellValue>> = keyed.into_iter().map(|(_, row)| row).collect();
    store.write_range(CellRef { row: first, col: 1 }, &sorted)?;
    let direction = match p.order {
        SortOrder::Ascending => "ascending",
        SortOrder::Descending => "descending",
    };
    Ok(format!("Sorted {} rows by {header} ({direction})", sorted.len()))
}

fn describe_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(super) fn filter_data(
    store: &mut dyn TabularStore,
    ctx: &StepContext<'_>,
    p: &FilterParams,
) -> Result<String, StepError> {
    let col = ctx.layout.locate_existing(&*store, &p.column)?;
    let condition = Condition::new(&p.operator, &p.value)?;
    let header = ctx.layout.header_of(&*store, col)?;
    let cells = ctx.layout.column_cells(&*store, col)?;
    let delete_matching = ctx.config.filter_policy == FilterPolicy::DeleteMatching;
    let targets: Vec<u32> = cells
        .iter()
        .filter(|(_, v)| condition.matches(v) == delete_matching)
        .map(|(row, _)| *row)
        .collect();
    let clause = format!("{header} {} {}", p.operator, describe_value(&p.value));
    let what = if delete_matching {
        format!(" where {clause}")
    } else {
        format!(" not matching {clause}")
    };
    remove_rows(store, ctx, &targets, cells.len(), &what)
}

/// Delete `targets` bottom-up and report the impact against `total` data rows.
pub(super) fn remove_rows(
    store: &mut dyn TabularStore,
    ctx: &StepContext<'_>,
    targets: &[u32],
    total: usize,
    what: &str,
) -> Result<String, StepError> {
    let impact = Impact::estimate(targets.len(), total, ctx.config.impact_threshold);
    #[cfg(feature = "tracing")]
    if impact.high {
        tracing::warn!(removed = impact.removed, total, "high-impact row deletion");
    }
    // A side table past the data span keeps its rows.
    let width = ctx.layout.table_width(&*store)?;
    if width < store.last_column() {
        delete_rows_within(store, ctx.layout.first_data_row(), width, targets)?;
    } else {
        delete_rows_descending(store, targets)?;
    }
    Ok(impact.message(what))
}

/// Later occurrences of a repeated value (or of a whole repeated row when
/// `col` is `None`). Blank keys are never duplicates.
pub(super) fn duplicate_rows(
    store: &dyn TabularStore,
    ctx: &StepContext<'_>,
    col: Option<u32>,
) -> Result<(Vec<u32>, usize), StepError> {
    let keyed: Vec<(u32, Option<String>)> = match col {
        Some(col) => ctx
            .layout
            .column_cells(store, col)?
            .into_iter()
            .map(|(row, v)| (row, (!v.is_blank()).then(|| v.normalized())))
            .collect(),
        None => data_rows(store, ctx)?
            .into_iter()
            .map(|(row, values)| {
                let blank = values.iter().all(CellValue::is_blank);
                let key = values
                    .iter()
                    .map(CellValue::normalized)
                    .collect::<Vec<_>>()
                    .join("\u{1f}");
                (row, (!blank).then_some(key))
            })
            .collect(),
    };
    let total = keyed.len();
    let mut seen = FxHashSet::default();
    let rows = keyed
        .into_iter()
        .filter_map(|(row, key)| key.filter(|k| !seen.insert(k.clone())).map(|_| row))
        .collect();
    Ok((rows, total))
}

/// Rows whose cell in `col` is blank, or entirely blank rows when `col` is `None`.
pub(super) fn blank_rows(
    store: &dyn TabularStore,
    ctx: &StepContext<'_>,
    col: Option<u32>,
) -> Result<(Vec<u32>, usize), StepError> {
    Ok(match col {
        Some(col) => {
            let cells = ctx.layout.column_cells(store, col)?;
            let total = cells.len();
            let rows = cells
                .into_iter()
                .filter(|(_, v)| v.is_blank())
                .map(|(row, _)| row)
                .collect();
            (rows, total)
        }
        None => {
            let rows = data_rows(store, ctx)?;
            let total = rows.len();
            let blank = rows
                .into_iter()
                .filter(|(_, values)| values.iter().all(CellValue::is_blank))
                .map(|(row, _)| row)
                .collect();
            (blank, total)
        }
    })
}

fn data_rows(
    store: &dyn TabularStore,
    ctx: &StepContext<'_>,
) -> Result<Vec<(u32, Vec<CellValue>)>, StepError> {
    let first = ctx.layout.first_data_row();
    let last = store.last_row();
    let width = ctx.layout.table_width(store)?;
    if last < first || width == 0 {
        return Ok(Vec::new());
    }
    let range = RangeAddress::new(first, 1, last, width)?;
    Ok(store.read_range(range)?.into_iter().zip(first..).map(|(v, r)| (r, v)).collect())
}

pub(super) fn delete_rows(
    store: &mut dyn TabularStore,
    ctx: &StepContext<'_>,
    p: &DeleteRowsParams,
) -> Result<String, StepError> {
    let col = p
        .column
        .as_deref()
        .map(|c| ctx.layout.locate_existing(&*store, c))
        .transpose()?;
    let label = match col {
        Some(col) => format!(" in {}", ctx.layout.header_of(&*store, col)?),
        None => String::new(),
    };
    let (targets, total, what) = match p.mode {
        DeleteMode::Duplicates => {
            let (rows, total) = duplicate_rows(&*store, ctx, col)?;
            (rows, total, format!(" with duplicate values{label}"))
        }
        DeleteMode::Blank => {
            let (rows, total) = blank_rows(&*store, ctx, col)?;
            (rows, total, format!(" with blanks{label}"))
        }
        DeleteMode::Matching => {
            let col = col.ok_or_else(|| {
                StepError::Invalid("deleting matching rows needs a `column`".to_string())
            })?;
            let operator = p.operator.clone().unwrap_or_default();
            let condition = Condition::new(&operator, &p.value)?;
            let cells = ctx.layout.column_cells(&*store, col)?;
            let rows = cells
                .iter()
                .filter(|(_, v)| condition.matches(v))
                .map(|(row, _)| *row)
                .collect();
            let header = ctx.layout.header_of(&*store, col)?;
            (
                rows,
                cells.len(),
                format!(" where {header} {operator} {}", describe_value(&p.value)),
            )
        }
    };
    remove_rows(store, ctx, &targets, total, &what)
}
