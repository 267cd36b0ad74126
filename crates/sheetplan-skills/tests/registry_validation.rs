use sheetplan_skills::{ChartKind, RegistryError, SkillRegistry, SkillSection, schema_json};
use std::io::Write;

fn load_fixture(name: &str) -> SkillRegistry {
    let path = format!("tests/fixtures/{}.yaml", name);
    let text = std::fs::read_to_string(path).expect("failed to read fixture");
    SkillRegistry::from_yaml_str(&text).expect("fixture should deserialize")
}

#[test]
fn broken_fixture_reports_every_issue() {
    let registry = load_fixture("broken");
    let err = registry.validate().expect_err("validation should fail");
    insta::assert_json_snapshot!(err.issues(), @r###"
    [
      {
        "path": "spec",
        "message": "expected spec identifier `sheetplan-skills`, found `skills`"
      },
      {
        "path": "formula.patterns.median.builder",
        "message": "unknown builder `median`"
      },
      {
        "path": "chart.fallback_type",
        "message": "fallback type `pie` is not among supported_types"
      },
      {
        "path": "rules.max_pie_slices",
        "message": "must be at least 1"
      }
    ]
    "###);
}

#[test]
fn load_str_rejects_invalid_registry() {
    let text = std::fs::read_to_string("tests/fixtures/broken.yaml").unwrap();
    match SkillRegistry::load_str(&text) {
        Err(RegistryError::Invalid(err)) => assert_eq!(err.issues().len(), 4),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn unknown_fields_are_rejected() {
    let yaml = sheetplan_skills::BUILTIN_REGISTRY_YAML.replace(
        "max_pie_slices: 6",
        "max_pie_slices: 6\n  max_donut_holes: 1",
    );
    assert!(matches!(
        SkillRegistry::load_str(&yaml),
        Err(RegistryError::Yaml(_))
    ));
}

#[test]
fn registry_survives_a_file_roundtrip() {
    let registry = SkillRegistry::builtin().unwrap();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(registry.to_yaml().unwrap().as_bytes())
        .unwrap();

    let reloaded = SkillRegistry::load_path(file.path()).expect("reloaded registry validates");
    assert_eq!(
        reloaded.formula.patterns.keys().collect::<Vec<_>>(),
        registry.formula.patterns.keys().collect::<Vec<_>>()
    );
    assert_eq!(reloaded.chart.styling, registry.chart.styling);
}

#[test]
fn unknown_intent_yields_empty_section() {
    let registry = SkillRegistry::builtin().unwrap();
    let section = registry.skills_for_intent("summarize_everything");
    assert!(section.is_empty());
    assert_eq!(section.to_json(), serde_json::json!({}));
}

#[test]
fn insight_section_lists_only_aggregates() {
    let registry = SkillRegistry::builtin().unwrap();
    let SkillSection::Formula { patterns, .. } = registry.skills_for_intent("insight") else {
        panic!("insight should map to the formula section");
    };
    assert!(patterns.contains_key("sum_ifs"));
    assert!(!patterns.contains_key("running_total"));
    assert!(!patterns.contains_key("row_calc"));
}

#[test]
fn chart_section_carries_slice_cap() {
    let registry = SkillRegistry::builtin().unwrap();
    let json = registry.skills_for_intent("chart").to_json();
    assert_eq!(json["max_pie_slices"], 6);
    assert_eq!(json["goals"]["trend"]["default_type"], "line");
    assert!(registry.supports_chart(ChartKind::Scatter));
}

#[test]
fn schema_json_is_well_formed() {
    let value: serde_json::Value =
        serde_json::from_str(&schema_json()).expect("schema must be valid JSON");
    assert!(value.is_object(), "schema root should be an object");
}
