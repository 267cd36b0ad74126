//! Cell handlers: number formats, cleaning, value queries and charts.

use sheetplan_common::{CellRef, CellValue, RangeAddress, column_letters};
use sheetplan_workbook::{ChartOptions, ChartSpec, TabularStore};

use super::StepContext;
use super::columns::convert_column;
use super::condition::json_to_cell;
use super::format::format_value;
use super::rows::{blank_rows, duplicate_rows, remove_rows};
use crate::error::StepError;
use crate::plan::{
    ChartParams, CleanOperation, CleanParams, FormatParams, QueryParams, TargetType, TextCase,
};

pub(super) fn format_cells(
    store: &mut dyn TabularStore,
    ctx: &StepContext<'_>,
    p: &FormatParams,
) -> Result<String, StepError> {
    let pattern = match (&p.pattern, &p.format) {
        (Some(pattern), _) => pattern.clone(),
        (None, Some(name)) => ctx
            .registry
            .format_preset(name)
            .ok_or_else(|| StepError::UnknownPreset(name.clone()))?
            .to_string(),
        (None, None) => {
            return Err(StepError::Invalid(
                "format_cells needs a `format` preset or a `pattern`".to_string(),
            ));
        }
    };
    let range = match (&p.range, &p.column) {
        (Some(range), _) => RangeAddress::parse_a1(range)?,
        (None, Some(column)) => {
            let col = ctx.layout.locate_existing(&*store, column)?;
            let (first, last) = (ctx.layout.first_data_row(), store.last_row());
            if last < first {
                return Ok(format!("No data rows to format in column {}", column_letters(col)));
            }
            RangeAddress::column(col, first, last)?
        }
        (None, None) => {
            return Err(StepError::Invalid(
                "format_cells needs a `column` or a `range`".to_string(),
            ));
        }
    };
    store.set_number_format(range, &pattern)?;
    Ok(format!("Applied format `{pattern}` to {range}"))
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rewrite text cells of `col` through `f`, writing only the ones that change.
fn rewrite_text(
    store: &mut dyn TabularStore,
    ctx: &StepContext<'_>,
    col: u32,
    f: impl Fn(&str) -> String,
) -> Result<usize, StepError> {
    let mut changed = 0;
    for (row, cell) in ctx.layout.column_cells(&*store, col)? {
        if let CellValue::Text(text) = &cell {
            let next = f(text);
            if &next != text {
                store.write_cell(CellRef { row, col }, CellValue::Text(next))?;
                changed += 1;
            }
        }
    }
    Ok(changed)
}

fn required_column(
    store: &dyn TabularStore,
    ctx: &StepContext<'_>,
    p: &CleanParams,
) -> Result<(u32, String), StepError> {
    let column = p.column.as_deref().ok_or_else(|| {
        let name = match p.operation {
            CleanOperation::TrimWhitespace => "trim_whitespace",
            CleanOperation::StandardizeCase => "standardize_case",
            CleanOperation::FillBlanks => "fill_blanks",
            CleanOperation::ConvertToNumber => "convert_to_number",
            CleanOperation::RemoveDuplicates => "remove_duplicates",
            CleanOperation::RemoveEmptyRows => "remove_empty_rows",
        };
        StepError::Invalid(format!("{name} needs a `column`"))
    })?;
    let col = ctx.layout.locate_existing(store, column)?;
    Ok((col, ctx.layout.header_of(store, col)?))
}

pub(super) fn clean_data(
    store: &mut dyn TabularStore,
    ctx: &StepContext<'_>,
    p: &CleanParams,
) -> Result<String, StepError> {
    match p.operation {
        CleanOperation::TrimWhitespace => {
            let (col, header) = required_column(&*store, ctx, p)?;
            let n = rewrite_text(store, ctx, col, |s| s.trim().to_string())?;
            Ok(format!("Trimmed whitespace in {n} cells of {header}"))
        }
        CleanOperation::StandardizeCase => {
            let (col, header) = required_column(&*store, ctx, p)?;
            let case = p.case.unwrap_or_default();
            let n = rewrite_text(store, ctx, col, |s| match case {
                TextCase::Upper => s.to_uppercase(),
                TextCase::Lower => s.to_lowercase(),
                TextCase::Title => title_case(s),
            })?;
            Ok(format!("Standardized case in {n} cells of {header}"))
        }
        CleanOperation::FillBlanks => {
            let (col, header) = required_column(&*store, ctx, p)?;
            let fill = p.value.as_ref().map(json_to_cell).unwrap_or_default();
            if fill.is_blank() {
                return Err(StepError::Invalid("fill_blanks needs a non-blank `value`".to_string()));
            }
            let (rows, _) = blank_rows(&*store, ctx, Some(col))?;
            for row in &rows {
                store.write_cell(CellRef { row: *row, col }, fill.clone())?;
            }
            Ok(format!("Filled {} blank cells in {header} with {fill}", rows.len()))
        }
        CleanOperation::ConvertToNumber => {
            let (col, header) = required_column(&*store, ctx, p)?;
            let (converted, skipped) = convert_column(store, ctx, col, TargetType::Number)?;
            let mut msg = format!("Converted {converted} cells in {header} to numbers");
            if skipped > 0 {
                msg.push_str(&format!(" ({skipped} left unchanged)"));
            }
            Ok(msg)
        }
        CleanOperation::RemoveDuplicates => {
            let col = p
                .column
                .as_deref()
                .map(|c| ctx.layout.locate_existing(&*store, c))
                .transpose()?;
            let (rows, total) = duplicate_rows(&*store, ctx, col)?;
            remove_rows(store, ctx, &rows, total, " with duplicate values")
        }
        CleanOperation::RemoveEmptyRows => {
            let (rows, total) = blank_rows(&*store, ctx, None)?;
            remove_rows(store, ctx, &rows, total, " that were empty")
        }
    }
}

/// Evaluate a formula in a scratch cell right of the data and report it as
/// `"<label>: <value>"`. The scratch cell is cleared whatever the outcome.
pub(super) fn query_value(
    store: &mut dyn TabularStore,
    ctx: &StepContext<'_>,
    p: &QueryParams,
) -> Result<String, StepError> {
    let formula = p.formula.trim();
    let scratch = CellRef {
        row: 1,
        col: store.last_column() + ctx.config.scratch_column_gap.max(1),
    };
    store.set_formula(scratch, formula)?;
    let outcome = store
        .recalculate()
        .and_then(|_| store.read_cell(scratch));
    store.clear_cell(scratch)?;
    match outcome? {
        CellValue::Error(err) => Err(StepError::Evaluation {
            formula: formula.to_string(),
            code: err.kind.to_string(),
        }),
        value if value.is_blank() => Ok(format!("{}: no value", p.label)),
        value => Ok(format!("{}: {}", p.label, format_value(&value))),
    }
}

pub(super) fn create_chart(
    store: &mut dyn TabularStore,
    ctx: &StepContext<'_>,
    p: &ChartParams,
) -> Result<String, StepError> {
    let x = ctx.layout.locate_existing(&*store, &p.x_column)?;
    if p.y_columns.is_empty() {
        return Err(StepError::Invalid("chart needs at least one y column".to_string()));
    }
    let ys = p
        .y_columns
        .iter()
        .map(|y| ctx.layout.locate_existing(&*store, y))
        .collect::<Result<Vec<_>, _>>()?;
    let (top, bottom) = (ctx.layout.header_row, store.last_row().max(ctx.layout.header_row));
    let domain = RangeAddress::column(x, top, bottom)?;
    let series = ys
        .into_iter()
        .map(|y| RangeAddress::column(y, top, bottom))
        .collect::<Result<Vec<_>, _>>()?;
    let anchor = CellRef {
        row: ctx.layout.header_row,
        col: store.last_column() + 2,
    };
    let styling = &p.styling;
    let spec = ChartSpec {
        chart_type: p.chart_type.as_str().to_string(),
        title: p.title.clone(),
        domain,
        series,
        anchor,
        options: ChartOptions {
            legend_position: styling.legend_position.clone(),
            width: styling.width,
            height: styling.height,
            colors: styling.colors.clone(),
            font_family: styling.font_family.clone(),
        },
    };
    let id = store.create_chart(spec)?;
    let title = p
        .title
        .as_deref()
        .map(|t| format!(" '{t}'"))
        .unwrap_or_default();
    Ok(format!("Created {} chart{title} #{id} at {anchor}", p.chart_type))
}
