//! Re-addressing a first-row formula for every data row.
//!
//! The base row is the row number of the first cell reference in the
//! formula. For each target row, `[Header]` placeholders become
//! `<letter><row>`, then every unanchored reference on the base row is
//! moved to the target row. Numbers that are not part of a cell reference,
//! `$`-anchored rows, and function names such as `LOG10` are left alone.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::StepError;
use crate::plan::ColumnBinding;

static CELL_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?[A-Za-z]{1,3})(\$?)([0-9]+)").expect("cell reference regex"));

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\[\]]+)\]").expect("placeholder regex"));

/// True when the match is a standalone reference, not part of a name or call.
fn is_reference(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    let boundary_before = !before.is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    let boundary_after = !after.is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '(');
    boundary_before && boundary_after && !inside_string(text, start)
}

fn inside_string(text: &str, pos: usize) -> bool {
    text[..pos].matches('"').count() % 2 == 1
}

/// Row of the first cell reference, if any. Placeholder names such as
/// `[Q1 Sales]` are not references.
pub fn base_row(formula: &str) -> Option<u32> {
    let masked = PLACEHOLDER.replace_all(formula, " ");
    CELL_REF
        .captures_iter(&masked)
        .find(|c| {
            let m = c.get(0).map(|m| (m.start(), m.end())).unwrap_or_default();
            is_reference(&masked, m.0, m.1)
        })
        .and_then(|c| c[3].parse().ok())
}

pub(crate) fn substitute_placeholders(
    formula: &str,
    row: u32,
    columns: &[ColumnBinding],
) -> Result<String, StepError> {
    let mut missing = None;
    let out = PLACEHOLDER.replace_all(formula, |caps: &Captures| {
        let name = caps[1].trim();
        match columns.iter().find(|c| c.name.trim().eq_ignore_ascii_case(name)) {
            Some(binding) => format!("{}{row}", binding.letter),
            None => {
                missing.get_or_insert_with(|| name.to_string());
                caps[0].to_string()
            }
        }
    });
    match missing {
        Some(name) => Err(StepError::UnknownPlaceholder(name)),
        None => Ok(out.into_owned()),
    }
}

fn shift_base_row(formula: &str, base: u32, row: u32) -> String {
    let base = base.to_string();
    CELL_REF
        .replace_all(formula, |caps: &Captures| {
            let m = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or_default();
            if caps[2].is_empty() && caps[3] == base && is_reference(formula, m.0, m.1) {
                format!("{}{row}", &caps[1])
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// Formula text for `row`, given a formula written for its base row.
pub fn formula_for_row(
    formula: &str,
    row: u32,
    columns: &[ColumnBinding],
) -> Result<String, StepError> {
    let base = base_row(formula);
    let with_columns = substitute_placeholders(formula, row, columns)?;
    Ok(match base {
        Some(base) if base != row => shift_base_row(&with_columns, base, row),
        _ => with_columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols() -> Vec<ColumnBinding> {
        vec![
            ColumnBinding {
                name: "Price".into(),
                letter: "B".into(),
            },
            ColumnBinding {
                name: "Qty".into(),
                letter: "C".into(),
            },
        ]
    }

    #[test]
    fn shifts_only_the_base_row() {
        let f = "=IFERROR((B3-C3)/C3*100+3, \"\")";
        assert_eq!(
            formula_for_row(f, 7, &[]).unwrap(),
            "=IFERROR((B7-C7)/C7*100+3, \"\")"
        );
    }

    #[test]
    fn anchors_and_function_names_survive() {
        assert_eq!(
            formula_for_row("=SUM($B$2:B2)", 5, &[]).unwrap(),
            "=SUM($B$2:B5)"
        );
        assert_eq!(
            formula_for_row("=LOG10(B2)+B12", 4, &[]).unwrap(),
            "=LOG10(B4)+B12"
        );
        assert_eq!(base_row("=LOG10(B2)"), Some(2));
    }

    #[test]
    fn placeholders_use_captured_headers() {
        assert_eq!(
            formula_for_row("=[Price]*[qty]", 9, &cols()).unwrap(),
            "=B9*C9"
        );
        assert!(matches!(
            formula_for_row("=[Cost]*2", 2, &cols()),
            Err(StepError::UnknownPlaceholder(n)) if n == "Cost"
        ));
    }

    #[test]
    fn header_names_that_look_like_cells_are_not_the_base_row() {
        let q1 = [ColumnBinding {
            name: "Q1 Sales".into(),
            letter: "B".into(),
        }];
        assert_eq!(base_row("=[Q1 Sales]-C4"), Some(4));
        assert_eq!(formula_for_row("=[Q1 Sales]-C4", 5, &q1).unwrap(), "=B5-C5");
        assert_eq!(formula_for_row("=[Q1 Sales]*2", 6, &q1).unwrap(), "=B6*2");
    }

    #[test]
    fn text_inside_quotes_is_untouched() {
        assert_eq!(
            formula_for_row("=IF(A2=\"Q2\", B2, 0)", 3, &[]).unwrap(),
            "=IF(A3=\"Q2\", B3, 0)"
        );
    }
}
