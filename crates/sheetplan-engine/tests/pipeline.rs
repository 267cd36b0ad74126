use std::cell::RefCell;
use std::rc::Rc;

use sheetplan_common::{CellRef, CellValue};
use sheetplan_engine::{
    Assistant, CollaboratorError, IntentClassifier, PlanAuthor, PlanRequest, StepStatus,
};
use sheetplan_skills::{Intent, SkillRegistry};
use sheetplan_testkit::sales_report;
use sheetplan_workbook::TabularStore;

/// Classifier that always replies with the same text, or fails.
struct Scripted(Result<&'static str, &'static str>);

impl IntentClassifier for Scripted {
    fn classify(&self, _prompt: &str) -> Result<String, CollaboratorError> {
        self.0
            .map(str::to_string)
            .map_err(|e| CollaboratorError::Transport(e.to_string()))
    }
}

/// What the planner saw on each call.
#[derive(Debug, Clone, PartialEq)]
struct Seen {
    intent: Intent,
    header_row: u32,
    headers: Vec<String>,
}

#[derive(Clone)]
struct Planner {
    reply: &'static str,
    calls: Rc<RefCell<Vec<Seen>>>,
}

impl Planner {
    fn new(reply: &'static str) -> Self {
        Self {
            reply,
            calls: Rc::default(),
        }
    }
}

impl PlanAuthor for Planner {
    fn author_plan(&self, request: &PlanRequest<'_>) -> Result<String, CollaboratorError> {
        self.calls.borrow_mut().push(Seen {
            intent: request.intent,
            header_row: request.schema.header_row_number,
            headers: request.schema.headers.iter().map(|h| h.name.clone()).collect(),
        });
        Ok(self.reply.to_string())
    }
}

fn registry() -> SkillRegistry {
    SkillRegistry::builtin().expect("bundled registry loads")
}

const FORMULA: &str = "```json\n{\"intent\": \"formula\", \"confidence\": 0.93}\n```";

#[test]
fn formula_request_runs_end_to_end() {
    let registry = registry();
    let planner = Planner::new(
        r#"Sure. {"conversationalAnswer": "Summing every sale.",
            "calculations": [{"pattern": "sum", "parameters": {"column": "Sales"}, "label": "Total Sales"}]}"#,
    );
    let assistant = Assistant::new(&registry, Scripted(Ok(FORMULA)), planner.clone());
    let mut sheet = sales_report();

    let response = assistant.handle("what are total sales?", &mut sheet, None);

    assert!(response.success, "{response:?}");
    assert_eq!(response.answer, "Summing every sale.\n\nTotal Sales: 6,950");
    assert_eq!(response.plan.steps.len(), 1);
    let details = response.details.expect("executed");
    assert_eq!(details.step_results[0].status, StepStatus::Success);

    let calls = planner.calls.borrow();
    assert_eq!(
        *calls,
        vec![Seen {
            intent: Intent::Formula,
            header_row: 3,
            headers: vec!["Region".into(), "Rep".into(), "Sales".into(), "Units".into(), "Year".into()],
        }]
    );
}

#[test]
fn count_request_skips_title_and_header() {
    let registry = registry();
    let planner = Planner::new(
        r#"{"calculations": [{"pattern": "count", "parameters": {"column": "Region"}, "label": "Count of Region"}]}"#,
    );
    let assistant = Assistant::new(&registry, Scripted(Ok(FORMULA)), planner);
    let mut sheet = sales_report();

    let response = assistant.handle("how many rows are there?", &mut sheet, None);

    assert!(response.success, "{response:?}");
    assert!(response.answer.ends_with("Count of Region: 8"), "{}", response.answer);
}

#[test]
fn low_confidence_never_reaches_the_planner() {
    let registry = registry();
    let planner = Planner::new("{}");
    let assistant = Assistant::new(
        &registry,
        Scripted(Ok(r#"{"intent": "chart", "confidence": 0.31}"#)),
        planner.clone(),
    );
    let mut sheet = sales_report();
    let before = sheet.values();

    let response = assistant.handle("make it nice", &mut sheet, None);

    assert!(response.success);
    assert!(response.plan.steps.is_empty());
    assert!(response.details.is_none());
    assert!(!response.answer.is_empty());
    assert!(planner.calls.borrow().is_empty());
    assert_eq!(sheet.values(), before);
}

#[test]
fn classifier_transport_failure_is_reported() {
    let registry = registry();
    let planner = Planner::new("{}");
    let assistant = Assistant::new(&registry, Scripted(Err("timed out")), planner.clone());
    let mut sheet = sales_report();

    let response = assistant.handle("sum sales", &mut sheet, None);

    assert!(!response.success);
    assert!(
        response.answer.starts_with("Could not classify the request:"),
        "{}",
        response.answer
    );
    assert!(response.answer.contains("timed out"));
    assert!(planner.calls.borrow().is_empty());
}

#[test]
fn malformed_plan_reply_fails_without_touching_the_sheet() {
    let registry = registry();
    let assistant = Assistant::new(
        &registry,
        Scripted(Ok(FORMULA)),
        Planner::new("{calculations: [sum]}"),
    );
    let mut sheet = sales_report();
    let before = sheet.values();

    let response = assistant.handle("sum sales", &mut sheet, None);

    assert!(!response.success);
    assert!(response.answer.starts_with("Could not plan the request:"));
    assert!(response.details.is_none());
    assert_eq!(sheet.values(), before);
}

#[test]
fn organization_request_rewrites_the_sheet() {
    let registry = registry();
    let assistant = Assistant::new(
        &registry,
        Scripted(Ok(r#"{"intent": "organization", "confidence": 0.8}"#)),
        Planner::new(
            r#"{"operations": [{"operation": "sort_data", "column": "Sales", "order": "desc"}]}"#,
        ),
    );
    let mut sheet = sales_report();

    let response = assistant.handle("biggest sales first", &mut sheet, None);

    assert!(response.success, "{response:?}");
    let top = sheet.read_cell(CellRef::parse_a1("C4").unwrap()).unwrap();
    let bottom = sheet.read_cell(CellRef::parse_a1("C11").unwrap()).unwrap();
    assert_eq!(top, CellValue::Int(1500));
    assert_eq!(bottom, CellValue::Int(300));
    assert_eq!(
        sheet.read_cell(CellRef::parse_a1("B4").unwrap()).unwrap(),
        CellValue::Text("Carol".into())
    );
}

#[test]
fn unknown_column_in_plan_surfaces_as_failed_step() {
    let registry = registry();
    let assistant = Assistant::new(
        &registry,
        Scripted(Ok(r#"{"intent": "organization", "confidence": 0.8}"#)),
        Planner::new(r#"{"operations": [{"operation": "delete_column", "column": "Commission"}]}"#),
    );
    let mut sheet = sales_report();

    let response = assistant.handle("drop commission", &mut sheet, None);

    assert!(!response.success);
    let details = response.details.expect("executed");
    assert_eq!(details.step_results[0].status, StepStatus::Error);
    assert_eq!(sheet.last_column(), 5);
}
