use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use sheetplan_testkit::sales_report;
use sheetplan_workbook::{CellRef, CellValue, MemorySheet, TabularStore};
use tempfile::TempDir;

fn sheetplan() -> Command {
    Command::cargo_bin("sheetplan").expect("binary builds")
}

fn bundled_registry() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../sheetplan-skills/skills/default.yaml")
}

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn sales_file(dir: &TempDir) -> PathBuf {
    let text = sales_report().to_json_string().unwrap();
    write(dir, "sales.json", &text)
}

#[test]
fn schema_prints_registry_schema() {
    sheetplan()
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sheetplan skill registry"));
}

#[test]
fn lint_accepts_bundled_registry() {
    sheetplan()
        .arg("lint-registry")
        .arg(bundled_registry())
        .assert()
        .success()
        .stdout(predicate::str::contains(": ok"));
}

#[test]
fn lint_reports_every_issue() {
    let dir = TempDir::new().unwrap();
    let yaml = std::fs::read_to_string(bundled_registry())
        .unwrap()
        .replacen("spec: sheetplan-skills", "spec: something-else", 1)
        .replacen("version: \"1.2.0\"", "version: \"one\"", 1);
    let path = write(&dir, "broken.yaml", &yaml);
    sheetplan()
        .arg("lint-registry")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("spec:").and(predicate::str::contains("version:")));
}

#[test]
fn skills_prints_the_intent_section() {
    sheetplan()
        .args(["skills", "chart"])
        .assert()
        .success()
        .stdout(predicate::str::contains("supported_types"));
    sheetplan()
        .args(["skills", "gardening"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown intent"));
}

#[test]
fn compile_reads_headers_from_the_workbook() {
    let dir = TempDir::new().unwrap();
    let workbook = sales_file(&dir);
    let classification = write(&dir, "class.json", r#"{"intent": "formula", "confidence": 0.9}"#);
    let plan = write(
        &dir,
        "raw.json",
        "```json\n{\"calculations\": [{\"pattern\": \"sum\", \"parameters\": {\"column\": \"Sales\"}, \"label\": \"Total\"}]}\n```",
    );
    sheetplan()
        .arg("compile")
        .arg("--classification")
        .arg(&classification)
        .arg("--plan")
        .arg(&plan)
        .arg("--workbook")
        .arg(&workbook)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("QUERY_VALUE")
                .and(predicate::str::contains("=IFERROR(SUM(C:C), \\\"\\\")")),
        );
}

#[test]
fn compile_requires_a_sheet_source() {
    let dir = TempDir::new().unwrap();
    let classification = write(&dir, "class.json", r#"{"intent": "formula", "confidence": 0.9}"#);
    let plan = write(&dir, "raw.json", "{}");
    sheetplan()
        .arg("compile")
        .arg("--classification")
        .arg(&classification)
        .arg("--plan")
        .arg(&plan)
        .assert()
        .failure();
}

#[test]
fn run_applies_plan_and_saves() {
    let dir = TempDir::new().unwrap();
    let workbook = sales_file(&dir);
    let plan = write(
        &dir,
        "plan.json",
        r#"{"summary": "Sort", "steps": [
            {"stepNumber": 1, "action": "SORT_DATA", "description": "Biggest first",
             "params": {"column": "C", "order": "desc"}}
        ]}"#,
    );
    let out = dir.path().join("sorted.json");
    sheetplan()
        .arg("run")
        .arg("--plan")
        .arg(&plan)
        .arg("--workbook")
        .arg(&workbook)
        .arg("--save")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Sorted 8 rows"));

    let saved = MemorySheet::load_json_path(&out).unwrap();
    let top = saved.read_cell(CellRef::parse_a1("C4").unwrap()).unwrap();
    assert_eq!(top, CellValue::Int(1500));
}

#[test]
fn run_exits_two_when_a_step_fails() {
    let dir = TempDir::new().unwrap();
    let workbook = sales_file(&dir);
    let plan = write(
        &dir,
        "plan.json",
        r#"{"steps": [{"action": "DELETE_COLUMN", "params": {"column": "Commission"}}]}"#,
    );
    sheetplan()
        .arg("run")
        .arg("--plan")
        .arg(&plan)
        .arg("--workbook")
        .arg(&workbook)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("\"status\": \"error\""));
}
