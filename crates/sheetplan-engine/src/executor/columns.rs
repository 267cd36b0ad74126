//! Column handlers: appended columns, per-row formulas, conversions and group summaries.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use sheetplan_common::{CellRef, CellValue, RangeAddress, column_letters};
use sheetplan_workbook::TabularStore;

use super::StepContext;
use super::condition::json_to_cell;
use super::templating::{formula_for_row, substitute_placeholders};
use crate::error::StepError;
use crate::plan::{
    AddColumnParams, AddFormulaParams, AggregateFunction, AggregateParams, ColumnParams,
    ConvertParams, TargetType, YoyParams,
};

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%b %d, %Y", "%d %b %Y", "%B %d, %Y",
];

fn as_formula(text: &str) -> String {
    let text = text.trim();
    if text.starts_with('=') {
        text.to_string()
    } else {
        format!("={text}")
    }
}

/// A preset name from the registry, or the text itself as a literal pattern.
pub(super) fn resolve_pattern(ctx: &StepContext<'_>, name_or_pattern: &str) -> String {
    ctx.registry
        .format_preset(name_or_pattern)
        .unwrap_or(name_or_pattern)
        .to_string()
}

/// Apply `pattern` to `col` over `first..=last`, skipping empty spans.
fn format_span(
    store: &mut dyn TabularStore,
    col: u32,
    first: u32,
    last: u32,
    pattern: &str,
) -> Result<(), StepError> {
    if last >= first {
        store.set_number_format(RangeAddress::column(col, first, last)?, pattern)?;
    }
    Ok(())
}

fn write_header(
    store: &mut dyn TabularStore,
    ctx: &StepContext<'_>,
    col: u32,
    header: &str,
) -> Result<(), StepError> {
    if header.trim().is_empty() {
        return Err(StepError::Invalid("new column needs a header".to_string()));
    }
    store.write_cell(
        CellRef {
            row: ctx.layout.header_row,
            col,
        },
        CellValue::Text(header.trim().to_string()),
    )?;
    Ok(())
}

pub(super) fn add_column(
    store: &mut dyn TabularStore,
    ctx: &StepContext<'_>,
    p: &AddColumnParams,
) -> Result<String, StepError> {
    let col = store.last_column() + 1;
    write_header(store, ctx, col, &p.header)?;
    let rows = ctx.layout.data_rows(&*store);
    let (first, last) = (*rows.start(), *rows.end());
    let mut filled = 0;
    for row in rows {
        let at = CellRef { row, col };
        match (&p.formula, &p.value) {
            (Some(formula), _) => {
                let text = formula_for_row(&as_formula(formula), row, &p.columns)?;
                store.set_formula(at, &text)?;
            }
            (None, Some(value)) => store.write_cell(at, json_to_cell(value))?,
            (None, None) => continue,
        }
        filled += 1;
    }
    if let Some(format) = &p.number_format {
        format_span(store, col, first, last, &resolve_pattern(ctx, format))?;
    }
    store.recalculate()?;
    Ok(format!(
        "Added column '{}' at {} ({filled} rows)",
        p.header.trim(),
        column_letters(col)
    ))
}

pub(super) fn delete_column(
    store: &mut dyn TabularStore,
    ctx: &StepContext<'_>,
    p: &ColumnParams,
) -> Result<String, StepError> {
    let col = ctx.layout.locate_existing(&*store, &p.column)?;
    let header = ctx.layout.header_of(&*store, col)?;
    store.delete_column(col)?;
    Ok(format!("Deleted column {} ({header})", column_letters(col)))
}

pub(super) fn add_formula(
    store: &mut dyn TabularStore,
    ctx: &StepContext<'_>,
    p: &AddFormulaParams,
) -> Result<String, StepError> {
    let formula = as_formula(&p.formula);
    if let Some(cell) = &p.cell {
        let at = CellRef::parse_a1(cell)?;
        let text = substitute_placeholders(&formula, at.row, &p.columns)?;
        store.set_formula(at, &text)?;
        store.recalculate()?;
        return Ok(format!("Set {} to {text}", cell.trim().to_uppercase()));
    }
    let target = p.column.as_deref().ok_or_else(|| {
        StepError::Invalid("add_formula needs a target `column` or `cell`".to_string())
    })?;
    let col = ctx.layout.locate(&*store, target)?;
    let rows = ctx.layout.data_rows(&*store);
    let (first, last) = (*rows.start(), *rows.end());
    for row in rows {
        let text = formula_for_row(&formula, row, &p.columns)?;
        store.set_formula(CellRef { row, col }, &text)?;
    }
    store.recalculate()?;
    let letter = column_letters(col);
    if last < first {
        return Ok(format!("No data rows to fill in column {letter}"));
    }
    Ok(format!("Filled {formula} into {letter}{first}:{letter}{last}"))
}

pub(super) fn yoy_calculation(
    store: &mut dyn TabularStore,
    ctx: &StepContext<'_>,
    p: &YoyParams,
) -> Result<String, StepError> {
    let source = ctx.layout.locate_existing(&*store, &p.column)?;
    let header = match &p.header {
        Some(h) => h.clone(),
        None => format!("{} Growth", ctx.layout.header_of(&*store, source)?),
    };
    let col = store.last_column() + 1;
    write_header(store, ctx, col, &header)?;
    let letter = column_letters(source);
    let first = ctx.layout.first_data_row();
    let last = store.last_row();
    let mut filled = 0;
    for row in first + 1..=last {
        let prev = row - 1;
        let formula = format!("=IFERROR(({letter}{row}-{letter}{prev})/{letter}{prev}, \"\")");
        store.set_formula(CellRef { row, col }, &formula)?;
        filled += 1;
    }
    format_span(store, col, first + 1, last, &resolve_pattern(ctx, "percent"))?;
    store.recalculate()?;
    Ok(format!(
        "Added '{header}' at {} with growth for {filled} rows",
        column_letters(col)
    ))
}

struct Group {
    label: CellValue,
    rows: usize,
    numbers: Vec<f64>,
}

fn summarize(group: &Group, function: AggregateFunction) -> CellValue {
    let nums = &group.numbers;
    let value = match function {
        AggregateFunction::Count => Some(group.rows as f64),
        AggregateFunction::Sum => Some(nums.iter().sum()),
        AggregateFunction::Average => {
            (!nums.is_empty()).then(|| nums.iter().sum::<f64>() / nums.len() as f64)
        }
        AggregateFunction::Min => nums.iter().copied().reduce(f64::min),
        AggregateFunction::Max => nums.iter().copied().reduce(f64::max),
    };
    value.map(CellValue::from_number).unwrap_or_default()
}

pub(super) fn aggregate(
    store: &mut dyn TabularStore,
    ctx: &StepContext<'_>,
    p: &AggregateParams,
) -> Result<String, StepError> {
    let key_col = ctx.layout.locate_existing(&*store, &p.group_by)?;
    let value_col = ctx.layout.locate_existing(&*store, &p.value_column)?;
    let keys = ctx.layout.column_cells(&*store, key_col)?;
    let values = ctx.layout.column_cells(&*store, value_col)?;

    let mut index: FxHashMap<String, usize> = FxHashMap::default();
    let mut groups: Vec<Group> = Vec::new();
    for ((_, key), (_, value)) in keys.into_iter().zip(values) {
        if key.is_blank() {
            continue;
        }
        let slot = *index.entry(key.normalized()).or_insert_with(|| {
            groups.push(Group {
                label: key.clone(),
                rows: 0,
                numbers: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.rows += 1;
        if let Some(n) = value.coerce_number() {
            group.numbers.push(n);
        }
    }

    let title = format!(
        "{} of {}",
        p.function.label(),
        ctx.layout.header_of(&*store, value_col)?
    );
    let mut table = vec![vec![
        CellValue::Text(ctx.layout.header_of(&*store, key_col)?),
        CellValue::Text(title.clone()),
    ]];
    table.extend(
        groups
            .iter()
            .map(|g| vec![g.label.clone(), summarize(g, p.function)]),
    );
    let origin = CellRef {
        row: ctx.layout.header_row,
        col: store.last_column() + 2,
    };
    store.write_range(origin, &table)?;
    let end = CellRef {
        row: origin.row + groups.len() as u32,
        col: origin.col + 1,
    };
    Ok(format!(
        "Wrote {} groups of {title} at {}{}:{}{}",
        groups.len(),
        column_letters(origin.col),
        origin.row,
        column_letters(end.col),
        end.row
    ))
}

/// Parse number-like text: currency symbols, grouping commas, spaces,
/// trailing `%` and accounting parentheses.
pub(super) fn parse_number_text(text: &str) -> Option<f64> {
    let mut s = text.trim();
    let negative = s.starts_with('(') && s.ends_with(')');
    if negative {
        s = &s[1..s.len() - 1];
    }
    let percent = s.ends_with('%');
    let cleaned: String = s
        .trim_end_matches('%')
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | '¥' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let mut n = cleaned.parse::<f64>().ok().filter(|n| n.is_finite())?;
    if percent {
        n /= 100.0;
    }
    Some(if negative { -n } else { n })
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

fn parse_bool_text(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// New value for `cell` under `target`; `Ok(None)` means leave it alone,
/// `Err(())` means it could not be converted.
fn convert_cell(cell: &CellValue, target: TargetType) -> Result<Option<CellValue>, ()> {
    if cell.is_blank() {
        return Ok(None);
    }
    match (target, cell) {
        (TargetType::Number, CellValue::Int(_) | CellValue::Number(_)) => Ok(None),
        (TargetType::Number, CellValue::Text(s)) => parse_number_text(s)
            .map(|n| Some(CellValue::from_number(n)))
            .ok_or(()),
        (TargetType::Text, CellValue::Text(_)) => Ok(None),
        (TargetType::Text, other) => Ok(Some(CellValue::Text(other.to_string()))),
        (TargetType::Date, CellValue::Date(_)) => Ok(None),
        (TargetType::Date, CellValue::Text(s)) => {
            parse_date_text(s).map(|d| Some(CellValue::Date(d))).ok_or(())
        }
        (TargetType::Boolean, CellValue::Boolean(_)) => Ok(None),
        (TargetType::Boolean, CellValue::Text(s)) => {
            parse_bool_text(s).map(|b| Some(CellValue::Boolean(b))).ok_or(())
        }
        (TargetType::Boolean, CellValue::Int(i)) if *i == 0 || *i == 1 => {
            Ok(Some(CellValue::Boolean(*i == 1)))
        }
        _ => Err(()),
    }
}

/// Convert the data cells of `col`; returns (converted, unconvertible).
pub(super) fn convert_column(
    store: &mut dyn TabularStore,
    ctx: &StepContext<'_>,
    col: u32,
    target: TargetType,
) -> Result<(usize, usize), StepError> {
    let mut converted = 0;
    let mut skipped = 0;
    for (row, cell) in ctx.layout.column_cells(&*store, col)? {
        match convert_cell(&cell, target) {
            Ok(Some(value)) => {
                store.write_cell(CellRef { row, col }, value)?;
                converted += 1;
            }
            Ok(None) => {}
            Err(()) => skipped += 1,
        }
    }
    let preset = match target {
        TargetType::Text => Some("text"),
        TargetType::Date => Some("date"),
        TargetType::Number | TargetType::Boolean => None,
    };
    if let Some(preset) = preset {
        let pattern = resolve_pattern(ctx, preset);
        let last = store.last_row();
        format_span(store, col, ctx.layout.first_data_row(), last, &pattern)?;
    }
    Ok((converted, skipped))
}

pub(super) fn convert_datatype(
    store: &mut dyn TabularStore,
    ctx: &StepContext<'_>,
    p: &ConvertParams,
) -> Result<String, StepError> {
    let col = ctx.layout.locate_existing(&*store, &p.column)?;
    let header = ctx.layout.header_of(&*store, col)?;
    let (converted, skipped) = convert_column(store, ctx, col, p.target_type)?;
    let target = match p.target_type {
        TargetType::Number => "number",
        TargetType::Text => "text",
        TargetType::Date => "date",
        TargetType::Boolean => "boolean",
    };
    let mut msg = format!("Converted {converted} cells in {header} to {target}");
    if skipped > 0 {
        msg.push_str(&format!(" ({skipped} left unchanged)"));
    }
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_text_variants() {
        assert_eq!(parse_number_text(" $1,234.50 "), Some(1234.5));
        assert_eq!(parse_number_text("12.5%"), Some(0.125));
        assert_eq!(parse_number_text("(300)"), Some(-300.0));
        assert_eq!(parse_number_text("€ 7"), Some(7.0));
        assert_eq!(parse_number_text("n/a"), None);
        assert_eq!(parse_number_text("$"), None);
    }

    #[test]
    fn conversions_leave_matching_cells_alone() {
        assert_eq!(convert_cell(&CellValue::Int(3), TargetType::Number), Ok(None));
        assert_eq!(
            convert_cell(&CellValue::from("3/14/2024"), TargetType::Date),
            Ok(Some(CellValue::Date(NaiveDate::from_ymd_opt(2024, 3, 14).unwrap())))
        );
        assert_eq!(
            convert_cell(&CellValue::from("Yes"), TargetType::Boolean),
            Ok(Some(CellValue::Boolean(true)))
        );
        assert_eq!(
            convert_cell(&CellValue::Int(42), TargetType::Text),
            Ok(Some(CellValue::from("42")))
        );
        assert_eq!(convert_cell(&CellValue::from("soon"), TargetType::Date), Err(()));
        assert_eq!(convert_cell(&CellValue::Empty, TargetType::Date), Ok(None));
    }

    #[test]
    fn summaries_per_function() {
        let group = Group {
            label: "North".into(),
            rows: 3,
            numbers: vec![10.0, 5.0],
        };
        assert_eq!(summarize(&group, AggregateFunction::Sum), CellValue::Int(15));
        assert_eq!(summarize(&group, AggregateFunction::Count), CellValue::Int(3));
        assert_eq!(summarize(&group, AggregateFunction::Average), CellValue::Number(7.5));
        assert_eq!(summarize(&group, AggregateFunction::Min), CellValue::Int(5));
        let empty = Group {
            label: "South".into(),
            rows: 1,
            numbers: vec![],
        };
        assert_eq!(summarize(&empty, AggregateFunction::Max), CellValue::Empty);
    }
}
