//! Skill registry for Sheetplan.
//!
//! The registry is a YAML document listing what the plan compiler may
//! emit: formula patterns with their required parameters, chart goals and
//! styling, clean-data and organization operations, and cross-cutting
//! rules (error wrapping, pie-chart slice cap, impact threshold). It is
//! loaded once, validated, and then only read.

mod intent;
mod registry;
mod section;
mod validation;

pub use intent::{ChartKind, Intent, UnknownName};
pub use registry::{
    BUILTIN_REGISTRY_YAML, CURRENT_REGISTRY_VERSION, ChartGoal, ChartSkills, ChartStyling,
    FormulaSkills, KNOWN_BUILDERS, KNOWN_CLEAN_OPERATIONS, KNOWN_ORGANIZATION_OPERATIONS,
    OperationDefinition, OperationSkills, OrganizationSkills, PatternDefinition, PatternKind,
    REGISTRY_IDENT, RegistryError, Rules, SkillRegistry,
};
pub use section::SkillSection;
pub use validation::{RegistryIssue, ValidationError};

/// JSON schema describing the registry document, pretty printed.
pub fn schema_json() -> String {
    serde_json::to_string_pretty(&generate_schema_value()).unwrap_or_default()
}

/// JSON schema describing the registry document.
pub fn generate_schema_value() -> serde_json::Value {
    let schema = schemars::schema_for!(SkillRegistry);
    serde_json::to_value(schema).unwrap_or(serde_json::Value::Null)
}
