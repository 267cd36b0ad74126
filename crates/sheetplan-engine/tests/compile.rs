use serde_json::{Value, json};
use sheetplan_engine::plan::{
    AddColumnParams, ChartParams, CleanOperation, CleanParams, FilterParams, QueryParams, SortOrder,
    SortParams,
};
use sheetplan_engine::{
    ClassificationResult, CompileError, CompiledPlan, CompilerConfig, Header, Operator,
    PlanCompiler, SheetSchema, StepAction,
};
use sheetplan_skills::{ChartKind, Intent, SkillRegistry};

fn registry() -> SkillRegistry {
    SkillRegistry::builtin().expect("bundled registry loads")
}

/// Schema of the testkit sales report: headers on row 3.
fn sales_schema() -> SheetSchema {
    SheetSchema {
        sheet_name: "Sales".into(),
        headers: ["Region", "Rep", "Sales", "Units", "Year"]
            .iter()
            .enumerate()
            .map(|(i, name)| Header::new(*name, i as u32 + 1))
            .collect(),
        sample_data: Vec::new(),
        row_count: 8,
        col_count: 5,
        header_row_number: 3,
    }
}

fn classified(intent: Intent, confidence: f64) -> ClassificationResult {
    ClassificationResult {
        intent,
        explicit_chart_type: None,
        confidence,
    }
}

fn compile(intent: Intent, raw: Value) -> CompiledPlan {
    let registry = registry();
    PlanCompiler::new(&registry)
        .compile(&classified(intent, 0.9), &raw, &sales_schema())
        .expect("plan compiles")
}

#[test]
fn countifs_resolves_names_and_normalizes_operators() {
    let compiled = compile(
        Intent::Formula,
        json!({
            "conversationalAnswer": "Counting the big northern deals.",
            "calculations": [{
                "pattern": "count_ifs",
                "parameters": {
                    "criteria": [
                        {"column": "Region", "operator": "equals", "value": "North"},
                        {"column": "sales", "operator": "greater than", "value": 1000}
                    ]
                },
                "label": "Big northern deals"
            }]
        }),
    );
    assert!(compiled.warnings.is_empty());
    assert_eq!(
        compiled.answer.as_deref(),
        Some("Counting the big northern deals.")
    );
    insta::assert_json_snapshot!(compiled.plan, @r###"
    {
      "summary": "Calculate Big northern deals",
      "steps": [
        {
          "stepNumber": 1,
          "action": "QUERY_VALUE",
          "description": "Calculate Big northern deals",
          "params": {
            "formula": "=IFERROR(COUNTIFS(A:A, \"North\", C:C, >1000), \"\")",
            "label": "Big northern deals"
          }
        }
      ]
    }
    "###);
}

#[test]
fn flat_criteria_keep_key_order() {
    let compiled = compile(
        Intent::Formula,
        json!({
            "calculations": [{
                "pattern": "sum_ifs",
                "parameters": {"sum_column": "Sales", "criteria": {"Year": 2023, "Region": "North"}},
                "label": "North 2023"
            }]
        }),
    );
    assert_eq!(
        compiled.plan.steps[0].action,
        StepAction::QueryValue(QueryParams {
            formula: "=IFERROR(SUMIFS(C:C, E:E, 2023, A:A, \"North\"), \"\")".into(),
            label: "North 2023".into(),
        })
    );
}

#[test]
fn single_pattern_reply_is_accepted() {
    let compiled = compile(
        Intent::Insight,
        json!({"pattern": "average", "parameters": {"column": "Units"}}),
    );
    assert_eq!(compiled.plan.steps.len(), 1);
    assert_eq!(
        compiled.plan.steps[0].action,
        StepAction::QueryValue(QueryParams {
            formula: "=IFERROR(AVERAGE(D:D), \"\")".into(),
            label: "Average of Units".into(),
        })
    );
}

#[test]
fn per_row_patterns_start_at_first_data_row() {
    let compiled = compile(
        Intent::Formula,
        json!({
            "calculations": [
                {"pattern": "percent_growth", "parameters": {"column": "Sales", "compare_column": "Units"}, "label": "Growth"},
                {"pattern": "running_total", "parameters": {"column": "C"}, "label": "Cumulative"}
            ]
        }),
    );
    let steps = &compiled.plan.steps;
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[1].step_number, 2);
    assert_eq!(
        steps[0].action,
        StepAction::AddColumn(AddColumnParams {
            header: "Growth".into(),
            formula: Some("=IFERROR((C4-D4)/D4, \"\")".into()),
            value: None,
            number_format: Some("0.00%".into()),
            columns: Vec::new(),
        })
    );
    match &steps[1].action {
        StepAction::AddColumn(p) => {
            assert_eq!(p.formula.as_deref(), Some("=IFERROR(SUM($C$4:C4), \"\")"));
            assert_eq!(p.number_format, None);
        }
        other => panic!("expected ADD_COLUMN, got {other:?}"),
    }
    assert_eq!(compiled.plan.summary, "Add column 'Growth'; Add column 'Cumulative'");
}

#[test]
fn low_confidence_returns_clarification() {
    let registry = registry();
    let compiler = PlanCompiler::new(&registry);
    // The raw plan is never looked at below the threshold.
    let compiled = compiler
        .compile(
            &classified(Intent::Formula, 0.4),
            &json!("not a plan"),
            &sales_schema(),
        )
        .unwrap();
    assert!(compiled.plan.steps.is_empty());
    assert!(compiled.answer.is_some());
    assert!(compiler.needs_clarification(&classified(Intent::Chart, f64::NAN)));
    assert!(!compiler.needs_clarification(&classified(Intent::Chart, 0.6)));
}

#[test]
fn unsupported_pattern_is_skipped_with_warning() {
    let compiled = compile(
        Intent::Formula,
        json!({
            "calculations": [
                {"pattern": "median", "parameters": {"column": "Sales"}},
                {"pattern": "sum", "parameters": {"column": "Sales"}}
            ]
        }),
    );
    assert_eq!(compiled.warnings, vec!["unsupported pattern `median` skipped"]);
    assert_eq!(compiled.plan.steps.len(), 1);
    assert_eq!(compiled.plan.steps[0].step_number, 1);
    assert_eq!(compiled.plan.steps[0].description, "Calculate Sum of Sales");
}

#[test]
fn missing_parameter_skips_or_aborts_by_strictness() {
    let registry = registry();
    let raw = json!({"calculations": [{"pattern": "count_if", "parameters": {"criteria_column": "Region"}}]});
    let lenient = PlanCompiler::new(&registry)
        .compile(&classified(Intent::Formula, 0.9), &raw, &sales_schema())
        .unwrap();
    assert!(lenient.plan.is_empty());
    assert_eq!(lenient.plan.summary, "No executable steps.");
    assert_eq!(
        lenient.warnings,
        vec!["calculation `count_if` is missing required parameter `value`"]
    );

    let strict = PlanCompiler::with_config(&registry, CompilerConfig::default().strict())
        .compile(&classified(Intent::Formula, 0.9), &raw, &sales_schema());
    match strict {
        Err(CompileError::MissingParameter { pattern, param }) => {
            assert_eq!((pattern.as_str(), param.as_str()), ("count_if", "value"));
        }
        other => panic!("expected strict abort, got {other:?}"),
    }
}

#[test]
fn malformed_raw_plan_aborts() {
    let registry = registry();
    let err = PlanCompiler::new(&registry)
        .compile(
            &classified(Intent::Formula, 0.9),
            &json!({"calculations": "oops"}),
            &sales_schema(),
        )
        .unwrap_err();
    assert!(matches!(err, CompileError::RawPlan { intent: Intent::Formula, .. }));
}

#[test]
fn inconsistent_schema_aborts() {
    let registry = registry();
    let mut schema = sales_schema();
    schema.headers[1].column_letter = "A".into();
    let err = PlanCompiler::new(&registry)
        .compile(
            &classified(Intent::Formula, 0.9),
            &json!({"calculations": []}),
            &schema,
        )
        .unwrap_err();
    assert!(matches!(err, CompileError::Schema(_)));
}

fn chart_kind(compiled: &CompiledPlan) -> ChartKind {
    match &compiled.plan.steps[0].action {
        StepAction::CreateChart(ChartParams { chart_type, .. }) => *chart_type,
        other => panic!("expected CREATE_CHART, got {other:?}"),
    }
}

#[test]
fn chart_type_precedence() {
    let registry = registry();
    let compiler = PlanCompiler::new(&registry);
    let raw = json!({
        "chartGoal": "comparison",
        "explicitChartType": "pie",
        "xColumn": "Region",
        "yColumns": ["Sales"]
    });
    let mut classification = classified(Intent::Chart, 0.9);
    classification.explicit_chart_type = Some("line".into());
    let from_classifier = compiler.compile(&classification, &raw, &sales_schema()).unwrap();
    assert_eq!(chart_kind(&from_classifier), ChartKind::Line);

    let from_plan = compile(Intent::Chart, raw.clone());
    assert_eq!(chart_kind(&from_plan), ChartKind::Pie);

    let from_goal = compile(
        Intent::Chart,
        json!({"chartGoal": "trend", "xColumn": "Year", "yColumns": ["Sales", "Units"]}),
    );
    assert_eq!(chart_kind(&from_goal), ChartKind::Line);
    match &from_goal.plan.steps[0].action {
        StepAction::CreateChart(p) => {
            assert_eq!(p.x_column, "E");
            assert_eq!(p.y_columns, vec!["C", "D"]);
            assert_eq!(p.title.as_deref(), Some("Sales, Units by Year"));
            assert_eq!(p.styling, registry.chart.styling);
        }
        other => panic!("expected CREATE_CHART, got {other:?}"),
    }

    let fallback = compile(Intent::Chart, json!({"xColumn": "A", "yColumns": ["C"]}));
    assert_eq!(chart_kind(&fallback), registry.chart.fallback_type);
}

#[test]
fn unsupported_chart_type_falls_back() {
    let compiled = compile(
        Intent::Chart,
        json!({"explicitChartType": "donut", "xColumn": "Region", "yColumns": ["Sales"]}),
    );
    assert_eq!(chart_kind(&compiled), ChartKind::Column);
    assert_eq!(compiled.warnings.len(), 1);
}

#[test]
fn unsupported_classifier_type_defers_to_plan_then_goal() {
    let registry = registry();
    let compiler = PlanCompiler::new(&registry);
    let mut classification = classified(Intent::Chart, 0.9);
    classification.explicit_chart_type = Some("donut".into());

    let from_plan = compiler
        .compile(
            &classification,
            &json!({"explicitChartType": "pie", "chartGoal": "trend", "xColumn": "Region", "yColumns": ["Sales"]}),
            &sales_schema(),
        )
        .unwrap();
    assert_eq!(chart_kind(&from_plan), ChartKind::Pie);
    assert_eq!(from_plan.warnings, vec!["chart type `donut` is not supported"]);

    let from_goal = compiler
        .compile(
            &classification,
            &json!({"chartGoal": "trend", "xColumn": "Year", "yColumns": ["Sales"]}),
            &sales_schema(),
        )
        .unwrap();
    assert_eq!(chart_kind(&from_goal), ChartKind::Line);
}

#[test]
fn crowded_pie_becomes_bar() {
    let compiled = compile(
        Intent::Chart,
        json!({
            "explicitChartType": "pie",
            "xColumn": "Region",
            "yColumns": ["B", "C", "D", "E", "F", "G", "H"]
        }),
    );
    assert_eq!(chart_kind(&compiled), ChartKind::Bar);
}

#[test]
fn chart_without_series_aborts() {
    let registry = registry();
    let err = PlanCompiler::new(&registry)
        .compile(
            &classified(Intent::Chart, 0.9),
            &json!({"xColumn": "Region", "yColumns": []}),
            &sales_schema(),
        )
        .unwrap_err();
    assert!(matches!(err, CompileError::MissingChartColumn(_)));
}

#[test]
fn clean_operations_map_to_steps() {
    let compiled = compile(
        Intent::CleanData,
        json!({
            "operations": [
                {"operation": "trim_whitespace", "column": "Rep"},
                {"operation": "filter_data", "column": "Region", "operator": "not equal", "value": "West"},
                {"operation": "translate", "column": "Rep"}
            ]
        }),
    );
    let steps = &compiled.plan.steps;
    assert_eq!(steps.len(), 2);
    assert_eq!(
        steps[0].action,
        StepAction::CleanData(CleanParams {
            operation: CleanOperation::TrimWhitespace,
            column: Some("B".into()),
            value: None,
            case: None,
        })
    );
    assert_eq!(steps[0].description, "Trim Whitespace on Rep");
    assert_eq!(
        steps[1].action,
        StepAction::FilterData(FilterParams {
            column: "A".into(),
            operator: Operator::NotEquals,
            value: json!("West"),
        })
    );
    assert_eq!(
        compiled.warnings,
        vec!["unsupported clean-data operation `translate` skipped"]
    );
}

#[test]
fn organization_operation_names_become_tags() {
    let compiled = compile(
        Intent::Organization,
        json!({
            "operations": [
                {"operation": "sort_data", "column": "Sales", "order": "desc", "description": "Biggest first"},
                {"operation": "pivot", "column": "Sales"}
            ]
        }),
    );
    assert_eq!(compiled.plan.steps.len(), 1);
    let step = &compiled.plan.steps[0];
    assert_eq!(step.tag(), "SORT_DATA");
    assert_eq!(step.description, "Biggest first");
    assert_eq!(
        step.action,
        StepAction::SortData(SortParams {
            column: "C".into(),
            order: SortOrder::Descending,
        })
    );
    assert_eq!(compiled.warnings.len(), 1);
}

#[test]
fn malformed_operation_params_follow_strictness() {
    let registry = registry();
    let raw = json!({"operations": [{"operation": "convert_datatype", "column": "Sales", "target_type": "money"}]});
    let lenient = compile(Intent::Organization, raw.clone());
    assert!(lenient.plan.is_empty());
    assert_eq!(lenient.warnings.len(), 1);

    let strict = PlanCompiler::with_config(&registry, CompilerConfig::default().strict())
        .compile(&classified(Intent::Organization, 0.9), &raw, &sales_schema());
    assert!(matches!(strict, Err(CompileError::InvalidOperation { .. })));
}
