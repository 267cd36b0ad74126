use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::intent::{ChartKind, Intent};
use crate::section::SkillSection;
use crate::validation::{RegistryIssue, ValidationError};

/// Identifier every registry document must carry in `spec`.
pub const REGISTRY_IDENT: &str = "sheetplan-skills";
/// Registry format version understood by this crate.
pub const CURRENT_REGISTRY_VERSION: &str = "1.2.0";

/// Registry shipped with the crate.
pub const BUILTIN_REGISTRY_YAML: &str = include_str!("../skills/default.yaml");

/// Builder bindings the formula builder implements.
pub const KNOWN_BUILDERS: &[&str] = &[
    "sum",
    "average",
    "count",
    "count_if",
    "count_ifs",
    "sum_if",
    "sum_ifs",
    "average_if",
    "percent_growth",
    "running_total",
    "row_calc",
];

/// Clean-data operations the step executor implements.
pub const KNOWN_CLEAN_OPERATIONS: &[&str] = &[
    "trim_whitespace",
    "remove_duplicates",
    "fill_blanks",
    "standardize_case",
    "remove_empty_rows",
    "convert_to_number",
    "filter_data",
];

/// Organization operations the step executor implements.
pub const KNOWN_ORGANIZATION_OPERATIONS: &[&str] = &[
    "sort_data",
    "format_cells",
    "add_column",
    "add_formula",
    "delete_column",
    "delete_rows",
    "convert_datatype",
    "aggregate",
    "yoy_calculation",
];

static PARAM_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("param name regex must compile"));

/// Errors raised while loading a registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read registry: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse registry YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Canonical registry document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[schemars(
    title = "Sheetplan skill registry",
    description = "Catalog of formula patterns, chart goals, and data operations a plan may use."
)]
#[serde(deny_unknown_fields)]
pub struct SkillRegistry {
    /// Identifier for this document (must be `sheetplan-skills`).
    pub spec: String,
    /// Semantic version of the registry format.
    pub version: String,
    pub formula: FormulaSkills,
    pub chart: ChartSkills,
    pub clean_data: OperationSkills,
    pub organization: OrganizationSkills,
    #[serde(default)]
    pub rules: Rules,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FormulaSkills {
    /// Pattern name to definition.
    pub patterns: BTreeMap<String, PatternDefinition>,
}

/// One calculation pattern.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PatternDefinition {
    /// Formula template binding (see [`KNOWN_BUILDERS`]).
    pub builder: String,
    /// Whether the pattern yields one value or one value per row.
    #[serde(rename = "type")]
    pub kind: PatternKind,
    /// Parameters the planner must supply, in order.
    pub required_params: Vec<String>,
    #[serde(default)]
    pub optional_params: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Single value read back as an answer.
    Aggregate,
    /// Formula filled down a new column.
    PerRow,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ChartSkills {
    pub supported_types: Vec<ChartKind>,
    /// Type used when nothing better is known.
    pub fallback_type: ChartKind,
    /// Chart goal (comparison, trend, ...) to its default type.
    pub goals: BTreeMap<String, ChartGoal>,
    #[serde(default)]
    pub styling: ChartStyling,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ChartGoal {
    pub default_type: ChartKind,
    #[serde(default)]
    pub description: Option<String>,
}

/// Styling defaults copied onto every chart step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ChartStyling {
    pub legend_position: String,
    pub width: u32,
    pub height: u32,
    pub colors: Vec<String>,
    pub font_family: Option<String>,
}

impl Default for ChartStyling {
    fn default() -> Self {
        Self {
            legend_position: "bottom".to_string(),
            width: 600,
            height: 371,
            colors: Vec::new(),
            font_family: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct OperationSkills {
    pub operations: BTreeMap<String, OperationDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct OrganizationSkills {
    pub operations: BTreeMap<String, OperationDefinition>,
    /// Named number-format patterns (`currency` -> `$#,##0.00`).
    #[serde(default)]
    pub format_presets: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct OperationDefinition {
    #[serde(default)]
    pub description: Option<String>,
    /// Parameter names the planner should fill in.
    #[serde(default)]
    pub params: Vec<String>,
}

/// Cross-cutting rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct Rules {
    /// Rewrite `=EXPR` into `=IFERROR(EXPR, "")`.
    pub wrap_formulas_in_iferror: bool,
    /// Pie charts with more series than this become bar charts.
    pub max_pie_slices: usize,
    /// Fraction of data rows above which a delete is flagged as high impact.
    pub high_impact_threshold: f64,
    /// Minimum classifier confidence for compiling a plan.
    pub confidence_threshold: f64,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            wrap_formulas_in_iferror: true,
            max_pie_slices: 6,
            high_impact_threshold: 0.5,
            confidence_threshold: 0.6,
        }
    }
}

impl SkillRegistry {
    /// Parse and validate the bundled registry.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::load_str(BUILTIN_REGISTRY_YAML)
    }

    /// Parse and validate a registry from YAML text.
    pub fn load_str(yaml: &str) -> Result<Self, RegistryError> {
        let registry = Self::from_yaml_str(yaml)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Parse and validate a registry file.
    pub fn load_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let text = std::fs::read_to_string(path)?;
        Self::load_str(&text)
    }

    /// Construct a registry from a YAML string slice without validating it.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Construct a registry by reading YAML from any reader without validating it.
    pub fn from_yaml_reader<R: std::io::Read>(reader: R) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_reader(reader)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn pattern(&self, name: &str) -> Option<&PatternDefinition> {
        self.formula.patterns.get(name)
    }

    pub fn supports_chart(&self, kind: ChartKind) -> bool {
        self.chart.supported_types.contains(&kind)
    }

    /// Default chart type for a goal, matched case-insensitively.
    pub fn chart_for_goal(&self, goal: &str) -> Option<ChartKind> {
        let wanted = goal.trim().to_ascii_lowercase();
        self.chart
            .goals
            .iter()
            .find(|(name, _)| name.to_ascii_lowercase() == wanted)
            .map(|(_, goal)| goal.default_type)
    }

    pub fn clean_operation(&self, name: &str) -> Option<&OperationDefinition> {
        self.clean_data.operations.get(name)
    }

    pub fn organization_operation(&self, name: &str) -> Option<&OperationDefinition> {
        self.organization.operations.get(name)
    }

    pub fn format_preset(&self, name: &str) -> Option<&str> {
        self.organization
            .format_presets
            .get(&name.trim().to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Section handed to the planner for one intent name.
    ///
    /// Unknown intent names yield [`SkillSection::Empty`].
    pub fn skills_for_intent(&self, intent: &str) -> SkillSection {
        match intent.parse::<Intent>() {
            Ok(intent) => self.section(intent),
            Err(_) => SkillSection::Empty {},
        }
    }

    pub fn section(&self, intent: Intent) -> SkillSection {
        match intent {
            Intent::Formula => SkillSection::Formula {
                patterns: self.formula.patterns.clone(),
                wrap_formulas_in_iferror: self.rules.wrap_formulas_in_iferror,
            },
            Intent::Insight => SkillSection::Formula {
                patterns: self
                    .formula
                    .patterns
                    .iter()
                    .filter(|(_, def)| def.kind == PatternKind::Aggregate)
                    .map(|(name, def)| (name.clone(), def.clone()))
                    .collect(),
                wrap_formulas_in_iferror: self.rules.wrap_formulas_in_iferror,
            },
            Intent::Chart => SkillSection::Chart {
                supported_types: self.chart.supported_types.clone(),
                goals: self.chart.goals.clone(),
                max_pie_slices: self.rules.max_pie_slices,
            },
            Intent::CleanData => SkillSection::Operations {
                operations: self.clean_data.operations.clone(),
                format_presets: BTreeMap::new(),
            },
            Intent::Organization => SkillSection::Operations {
                operations: self.organization.operations.clone(),
                format_presets: self.organization.format_presets.clone(),
            },
        }
    }

    /// Validate the registry and return granular issues when invariants fail.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.spec != REGISTRY_IDENT {
            issues.push(RegistryIssue::new(
                "spec",
                format!(
                    "expected spec identifier `{REGISTRY_IDENT}`, found `{}`",
                    self.spec
                ),
            ));
        }

        match Version::parse(&self.version) {
            Ok(version) => {
                let current = Version::parse(CURRENT_REGISTRY_VERSION)
                    .expect("CURRENT_REGISTRY_VERSION must be valid semver");
                if version.major != current.major {
                    issues.push(RegistryIssue::new(
                        "version",
                        format!(
                            "incompatible major version `{version}` (expected `{}`)",
                            current.major
                        ),
                    ));
                }
            }
            Err(err) => issues.push(RegistryIssue::new(
                "version",
                format!("invalid semantic version `{}`: {err}", self.version),
            )),
        }

        if self.formula.patterns.is_empty() {
            issues.push(RegistryIssue::new(
                "formula.patterns",
                "at least one pattern must be defined",
            ));
        }
        for (name, pattern) in &self.formula.patterns {
            let path = format!("formula.patterns.{name}");
            if !KNOWN_BUILDERS.contains(&pattern.builder.as_str()) {
                issues.push(RegistryIssue::new(
                    format!("{path}.builder"),
                    format!("unknown builder `{}`", pattern.builder),
                ));
            }
            let mut seen = HashSet::new();
            for param in pattern
                .required_params
                .iter()
                .chain(pattern.optional_params.iter())
            {
                if !PARAM_NAME.is_match(param) {
                    issues.push(RegistryIssue::new(
                        format!("{path}.required_params"),
                        format!("parameter `{param}` must be lowercase snake_case"),
                    ));
                }
                if !seen.insert(param) {
                    issues.push(RegistryIssue::new(
                        format!("{path}.required_params"),
                        format!("duplicate parameter `{param}`"),
                    ));
                }
            }
        }

        if self.chart.supported_types.is_empty() {
            issues.push(RegistryIssue::new(
                "chart.supported_types",
                "at least one chart type must be supported",
            ));
        }
        if !self.supports_chart(self.chart.fallback_type) {
            issues.push(RegistryIssue::new(
                "chart.fallback_type",
                format!(
                    "fallback type `{}` is not among supported_types",
                    self.chart.fallback_type
                ),
            ));
        }
        for (name, goal) in &self.chart.goals {
            if !self.supports_chart(goal.default_type) {
                issues.push(RegistryIssue::new(
                    format!("chart.goals.{name}.default_type"),
                    format!("type `{}` is not among supported_types", goal.default_type),
                ));
            }
        }

        for name in self.clean_data.operations.keys() {
            if !KNOWN_CLEAN_OPERATIONS.contains(&name.as_str()) {
                issues.push(RegistryIssue::new(
                    format!("clean_data.operations.{name}"),
                    format!("operation `{name}` has no executor support"),
                ));
            }
        }
        for name in self.organization.operations.keys() {
            if !KNOWN_ORGANIZATION_OPERATIONS.contains(&name.as_str()) {
                issues.push(RegistryIssue::new(
                    format!("organization.operations.{name}"),
                    format!("operation `{name}` has no executor support"),
                ));
            }
        }
        for (name, pattern) in &self.organization.format_presets {
            if name.to_ascii_lowercase() != *name {
                issues.push(RegistryIssue::new(
                    format!("organization.format_presets.{name}"),
                    "preset names must be lowercase",
                ));
            }
            if pattern.trim().is_empty() {
                issues.push(RegistryIssue::new(
                    format!("organization.format_presets.{name}"),
                    "number format pattern must not be empty",
                ));
            }
        }

        if self.rules.max_pie_slices == 0 {
            issues.push(RegistryIssue::new(
                "rules.max_pie_slices",
                "must be at least 1",
            ));
        }
        for (path, value) in [
            ("rules.high_impact_threshold", self.rules.high_impact_threshold),
            ("rules.confidence_threshold", self.rules.confidence_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                issues.push(RegistryIssue::new(
                    path,
                    format!("must be within [0, 1], found {value}"),
                ));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(issues))
        }
    }
}

impl std::str::FromStr for SkillRegistry {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SkillRegistry::load_str(s)
    }
}
