//! Formula text for the registry's calculation patterns.
//!
//! Every builder has exactly one template. Column parameters are expected
//! to be resolved letters already; per-row templates are written for the
//! first data row and re-addressed per row by the executor.

use std::str::FromStr;

use serde_json::{Map, Value};

use crate::criteria::{CriterionClause, Operator, normalize_criteria};
use crate::error::FormulaError;

/// Parameters naming a column; the compiler resolves these before building.
pub const COLUMN_PARAMS: &[&str] = &[
    "column",
    "sum_column",
    "average_column",
    "criteria_column",
    "compare_column",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Template {
    Sum,
    Average,
    Count,
    CountIf,
    CountIfs,
    SumIf,
    SumIfs,
    AverageIf,
    PercentGrowth,
    RunningTotal,
    RowCalc,
}

impl FromStr for Template {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "sum" => Template::Sum,
            "average" => Template::Average,
            "count" => Template::Count,
            "count_if" => Template::CountIf,
            "count_ifs" => Template::CountIfs,
            "sum_if" => Template::SumIf,
            "sum_ifs" => Template::SumIfs,
            "average_if" => Template::AverageIf,
            "percent_growth" => Template::PercentGrowth,
            "running_total" => Template::RunningTotal,
            "row_calc" => Template::RowCalc,
            other => return Err(FormulaError::UnknownBuilder(other.to_string())),
        })
    }
}

/// Row the per-row templates are anchored at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormulaContext {
    pub first_data_row: u32,
}

impl Default for FormulaContext {
    fn default() -> Self {
        Self { first_data_row: 2 }
    }
}

fn text_param<'p>(params: &'p Map<String, Value>, key: &str) -> Result<&'p str, FormulaError> {
    match params.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim()),
        Some(Value::String(_)) | Some(Value::Null) | None => {
            Err(FormulaError::MissingParameter(key.to_string()))
        }
        Some(other) => Err(FormulaError::invalid(key, format!("expected text, found {other}"))),
    }
}

fn value_param<'p>(params: &'p Map<String, Value>, key: &str) -> Result<&'p Value, FormulaError> {
    match params.get(key) {
        None | Some(Value::Null) => Err(FormulaError::MissingParameter(key.to_string())),
        Some(v) => Ok(v),
    }
}

fn operator_param(params: &Map<String, Value>) -> Operator {
    params
        .get("operator")
        .and_then(Value::as_str)
        .map(Operator::normalize)
        .unwrap_or_default()
}

fn whole_column(letter: &str) -> String {
    format!("{letter}:{letter}")
}

/// Render one criterion argument: numbers bare, text quoted.
pub fn criterion_text(operator: &Operator, value: &Value) -> String {
    let prefix = match operator {
        Operator::Equals => "",
        other => other.token(),
    };
    match value {
        Value::Number(n) => format!("{prefix}{n}"),
        Value::Bool(b) => format!("{prefix}{}", if *b { "TRUE" } else { "FALSE" }),
        Value::Null => format!("\"{prefix}\""),
        Value::String(s) => format!("\"{prefix}{}\"", s.replace('"', "\"\"")),
        other => format!("\"{prefix}{}\"", other.to_string().replace('"', "\"\"")),
    }
}

fn clause_args(clauses: &[CriterionClause]) -> String {
    clauses
        .iter()
        .map(|c| {
            format!(
                "{}, {}",
                whole_column(c.column.trim()),
                criterion_text(&c.operator, &c.value)
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn clauses_param(params: &Map<String, Value>) -> Result<Vec<CriterionClause>, FormulaError> {
    normalize_criteria(value_param(params, "criteria")?)
}

/// Build the unwrapped formula for `builder`.
pub fn build(
    builder: &str,
    params: &Map<String, Value>,
    ctx: &FormulaContext,
) -> Result<String, FormulaError> {
    let template: Template = builder.parse()?;
    let row = ctx.first_data_row;
    Ok(match template {
        Template::Sum => format!("=SUM({})", whole_column(text_param(params, "column")?)),
        Template::Average => format!("=AVERAGE({})", whole_column(text_param(params, "column")?)),
        // Everything above the data (title, notes, header) is subtracted out.
        Template::Count => {
            let col = text_param(params, "column")?;
            if row > 1 {
                format!("=COUNTA({})-COUNTA({col}1:{col}{})", whole_column(col), row - 1)
            } else {
                format!("=COUNTA({})", whole_column(col))
            }
        }
        Template::CountIf => format!(
            "=COUNTIF({}, {})",
            whole_column(text_param(params, "criteria_column")?),
            criterion_text(&operator_param(params), value_param(params, "value")?)
        ),
        Template::CountIfs => format!("=COUNTIFS({})", clause_args(&clauses_param(params)?)),
        Template::SumIf => format!(
            "=SUMIF({}, {}, {})",
            whole_column(text_param(params, "criteria_column")?),
            criterion_text(&operator_param(params), value_param(params, "value")?),
            whole_column(text_param(params, "sum_column")?)
        ),
        Template::SumIfs => format!(
            "=SUMIFS({}, {})",
            whole_column(text_param(params, "sum_column")?),
            clause_args(&clauses_param(params)?)
        ),
        Template::AverageIf => format!(
            "=AVERAGEIF({}, {}, {})",
            whole_column(text_param(params, "criteria_column")?),
            criterion_text(&operator_param(params), value_param(params, "value")?),
            whole_column(text_param(params, "average_column")?)
        ),
        Template::PercentGrowth => {
            let current = text_param(params, "column")?;
            let previous = text_param(params, "compare_column")?;
            format!("=({current}{row}-{previous}{row})/{previous}{row}")
        }
        Template::RunningTotal => {
            let col = text_param(params, "column")?;
            format!("=SUM(${col}${row}:{col}{row})")
        }
        Template::RowCalc => {
            let raw = text_param(params, "formula")?;
            if raw.starts_with('=') {
                raw.to_string()
            } else {
                format!("={raw}")
            }
        }
    })
}

/// `=EXPR` becomes `=IFERROR(EXPR, "")` when `enabled`; other text is untouched.
pub fn wrap(formula: &str, enabled: bool) -> String {
    match formula.strip_prefix('=') {
        Some(expr) if enabled => format!("=IFERROR({expr}, \"\")"),
        _ => formula.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn build_default(builder: &str, v: Value) -> Result<String, FormulaError> {
        build(builder, &params(v), &FormulaContext::default())
    }

    #[test]
    fn aggregate_templates() {
        assert_eq!(build_default("sum", json!({"column": "B"})).unwrap(), "=SUM(B:B)");
        assert_eq!(build_default("average", json!({"column": "C"})).unwrap(), "=AVERAGE(C:C)");
        assert_eq!(
            build_default("count", json!({"column": "A"})).unwrap(),
            "=COUNTA(A:A)-COUNTA(A1:A1)"
        );
        assert_eq!(
            build_default(
                "sum_if",
                json!({"criteria_column": "A", "value": "North", "sum_column": "B"})
            )
            .unwrap(),
            "=SUMIF(A:A, \"North\", B:B)"
        );
        assert_eq!(
            build_default(
                "count_if",
                json!({"criteria_column": "B", "operator": "greater_than", "value": 100})
            )
            .unwrap(),
            "=COUNTIF(B:B, >100)"
        );
    }

    #[test]
    fn count_ifs_exact_text() {
        let formula = build_default(
            "count_ifs",
            json!({"criteria": [
                {"column": "A", "operator": "equals", "value": "X"},
                {"column": "B", "operator": "greater", "value": 10}
            ]}),
        )
        .unwrap();
        assert_eq!(formula, "=COUNTIFS(A:A, \"X\", B:B, >10)");
    }

    #[test]
    fn text_criteria_with_operators_are_quoted_whole() {
        assert_eq!(criterion_text(&Operator::NotEquals, &json!("South")), "\"<>South\"");
        assert_eq!(criterion_text(&Operator::Other(">=".into()), &json!(5)), ">=5");
        assert_eq!(criterion_text(&Operator::Equals, &json!("say \"hi\"")), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn per_row_templates_anchor_at_first_data_row() {
        let ctx = FormulaContext { first_data_row: 3 };
        let growth = build(
            "percent_growth",
            &params(json!({"column": "B", "compare_column": "C"})),
            &ctx,
        )
        .unwrap();
        assert_eq!(growth, "=(B3-C3)/C3");
        let count = build("count", &params(json!({"column": "A"})), &ctx).unwrap();
        assert_eq!(count, "=COUNTA(A:A)-COUNTA(A1:A2)");
        let total = build("running_total", &params(json!({"column": "D"})), &ctx).unwrap();
        assert_eq!(total, "=SUM($D$3:D3)");
        assert_eq!(
            build_default("row_calc", json!({"formula": "[Price]*[Qty]"})).unwrap(),
            "=[Price]*[Qty]"
        );
    }

    #[test]
    fn missing_and_unknown() {
        assert_eq!(
            build_default("sum", json!({})),
            Err(FormulaError::MissingParameter("column".into()))
        );
        assert_eq!(
            build_default("median", json!({"column": "A"})),
            Err(FormulaError::UnknownBuilder("median".into()))
        );
    }

    #[test]
    fn wrap_only_touches_formulas() {
        assert_eq!(wrap("=SUM(B:B)", true), "=IFERROR(SUM(B:B), \"\")");
        assert_eq!(wrap("=SUM(B:B)", false), "=SUM(B:B)");
        assert_eq!(wrap("plain", true), "plain");
    }
}
