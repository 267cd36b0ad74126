//! Raw collaborator plans to numbered, typed steps.
//!
//! Items inside a plan degrade one at a time: an unsupported pattern or
//! operation is skipped with a warning, and so is a calculation missing a
//! required parameter unless [`Strictness::Strict`] is set. Structural
//! problems (unreadable plan, inconsistent schema, chart without columns)
//! abort the whole compilation.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sheetplan_skills::{ChartKind, Intent, PatternKind, SkillRegistry};

use crate::config::{CompilerConfig, Strictness};
use crate::criteria::{Operator, normalize_criteria};
use crate::error::CompileError;
use crate::formula::{self, COLUMN_PARAMS, FormulaContext};
use crate::plan::{
    AddColumnParams, ChartParams, ColumnBinding, Plan, QueryParams, Step, StepAction,
};
use crate::raw::{
    ClassificationResult, RawCalculation, RawChartPlan, RawFormulaPlan, RawOperation,
    RawOperationsPlan,
};
use crate::resolver::{header_name, resolve_column};
use crate::schema::SheetSchema;

/// Operation parameters that name a column.
const OPERATION_COLUMN_PARAMS: &[&str] = &["column", "group_by", "value_column"];

const CLARIFICATION: &str = "I'm not sure what you'd like me to do with this sheet. \
Could you say whether you want a calculation, a chart, cleanup, or a reorganization, \
and which columns are involved?";

/// Compiler output: the plan plus what was skipped along the way.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CompiledPlan {
    pub plan: Plan,
    pub warnings: Vec<String>,
    /// Conversational answer supplied by the planner, or the clarification text.
    pub answer: Option<String>,
}

pub struct PlanCompiler<'r> {
    registry: &'r SkillRegistry,
    config: CompilerConfig,
}

/// Steps and warnings accumulated during one compilation.
#[derive(Default)]
struct Emitter {
    steps: Vec<Step>,
    warnings: Vec<String>,
}

impl Emitter {
    fn push(&mut self, description: String, action: StepAction) {
        let number = self.steps.len() as u32 + 1;
        #[cfg(feature = "tracing")]
        tracing::debug!(step = number, action = action.tag(), "compiled step");
        self.steps.push(Step::new(number, description, action));
    }

    fn warn(&mut self, message: String) {
        #[cfg(feature = "tracing")]
        tracing::warn!(%message, "plan item skipped");
        self.warnings.push(message);
    }

    fn finish(self, answer: Option<String>) -> CompiledPlan {
        let summary = if self.steps.is_empty() {
            "No executable steps.".to_string()
        } else {
            self.steps
                .iter()
                .map(|s| s.description.as_str())
                .collect::<Vec<_>>()
                .join("; ")
        };
        CompiledPlan {
            plan: Plan {
                summary,
                steps: self.steps,
            },
            warnings: self.warnings,
            answer,
        }
    }
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        Some(_) => false,
    }
}

fn parse_raw<T: DeserializeOwned>(intent: Intent, raw: &Value) -> Result<T, CompileError> {
    T::deserialize(raw).map_err(|source| CompileError::RawPlan { intent, source })
}

/// `count_if` -> `Count If`.
fn humanize(name: &str) -> String {
    name.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve_keys(params: &mut Map<String, Value>, keys: &[&str], schema: &SheetSchema) {
    for key in keys {
        if let Some(Value::String(id)) = params.get(*key) {
            let letter = resolve_column(id, &schema.headers);
            params.insert((*key).to_string(), Value::String(letter));
        }
    }
}

fn bindings(schema: &SheetSchema) -> Vec<ColumnBinding> {
    schema
        .headers
        .iter()
        .map(|h| ColumnBinding {
            name: h.name.clone(),
            letter: h.column_letter.to_ascii_uppercase(),
        })
        .collect()
}

impl<'r> PlanCompiler<'r> {
    pub fn new(registry: &'r SkillRegistry) -> Self {
        Self::with_config(registry, CompilerConfig::from_registry(registry))
    }

    pub fn with_config(registry: &'r SkillRegistry, config: CompilerConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// True when the classification is too uncertain to plan against.
    pub fn needs_clarification(&self, classification: &ClassificationResult) -> bool {
        let confidence = classification.confidence;
        confidence.is_nan() || confidence < self.config.confidence_threshold
    }

    /// Empty plan carrying a clarification question.
    pub fn clarification(&self) -> CompiledPlan {
        CompiledPlan {
            plan: Plan {
                summary: "Clarification needed.".to_string(),
                steps: Vec::new(),
            },
            warnings: Vec::new(),
            answer: Some(CLARIFICATION.to_string()),
        }
    }

    pub fn compile(
        &self,
        classification: &ClassificationResult,
        raw: &Value,
        schema: &SheetSchema,
    ) -> Result<CompiledPlan, CompileError> {
        if self.needs_clarification(classification) {
            return Ok(self.clarification());
        }
        schema.validate()?;
        let intent = classification.intent;
        let mut em = Emitter::default();
        let answer = match intent {
            Intent::Formula | Intent::Insight => {
                let raw: RawFormulaPlan = parse_raw(intent, raw)?;
                for calc in raw.calculation_list() {
                    self.compile_calculation(&calc, schema, &mut em)?;
                }
                raw.conversational_answer
            }
            Intent::Chart => {
                let raw: RawChartPlan = parse_raw(intent, raw)?;
                self.compile_chart(classification, &raw, schema, &mut em)?;
                raw.conversational_answer
            }
            Intent::CleanData => {
                let raw: RawOperationsPlan = parse_raw(intent, raw)?;
                for op in &raw.operations {
                    self.compile_clean(op, schema, &mut em)?;
                }
                raw.conversational_answer
            }
            Intent::Organization => {
                let raw: RawOperationsPlan = parse_raw(intent, raw)?;
                for op in &raw.operations {
                    self.compile_organization(op, schema, &mut em)?;
                }
                raw.conversational_answer
            }
        };
        #[cfg(feature = "tracing")]
        tracing::info!(
            %intent,
            steps = em.steps.len(),
            warnings = em.warnings.len(),
            "plan compiled"
        );
        Ok(em.finish(answer))
    }

    /// Record `err` as a warning, or return it when compiling strictly.
    fn soft_fail(&self, em: &mut Emitter, err: CompileError) -> Result<(), CompileError> {
        match self.config.strictness {
            Strictness::Lenient => {
                em.warn(err.to_string());
                Ok(())
            }
            Strictness::Strict => Err(err),
        }
    }

    fn compile_calculation(
        &self,
        calc: &RawCalculation,
        schema: &SheetSchema,
        em: &mut Emitter,
    ) -> Result<(), CompileError> {
        let Some(def) = self.registry.pattern(&calc.pattern) else {
            em.warn(format!("unsupported pattern `{}` skipped", calc.pattern));
            return Ok(());
        };
        let mut params = calc.parameters.clone();
        if let Some(param) = def
            .required_params
            .iter()
            .find(|p| is_missing(params.get(p.as_str())))
        {
            return self.soft_fail(
                em,
                CompileError::MissingParameter {
                    pattern: calc.pattern.clone(),
                    param: param.clone(),
                },
            );
        }

        if let Some(raw_criteria) = params.get("criteria") {
            match normalize_criteria(raw_criteria) {
                Ok(mut clauses) => {
                    for clause in &mut clauses {
                        clause.column = resolve_column(&clause.column, &schema.headers);
                    }
                    let value = serde_json::to_value(&clauses).unwrap_or(Value::Null);
                    params.insert("criteria".to_string(), value);
                }
                Err(source) => {
                    return self.soft_fail(
                        em,
                        CompileError::Formula {
                            item: calc.pattern.clone(),
                            source,
                        },
                    );
                }
            }
        }
        resolve_keys(&mut params, COLUMN_PARAMS, schema);

        let ctx = FormulaContext {
            first_data_row: schema.first_data_row(),
        };
        let formula = match formula::build(&def.builder, &params, &ctx) {
            Ok(f) => formula::wrap(&f, self.registry.rules.wrap_formulas_in_iferror),
            Err(source) => {
                return self.soft_fail(
                    em,
                    CompileError::Formula {
                        item: calc.pattern.clone(),
                        source,
                    },
                );
            }
        };

        let label = calc
            .label
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| default_label(&calc.pattern, &params, schema));
        match def.kind {
            PatternKind::Aggregate => em.push(
                format!("Calculate {label}"),
                StepAction::QueryValue(QueryParams { formula, label }),
            ),
            PatternKind::PerRow => {
                let number_format = (def.builder == "percent_growth")
                    .then(|| self.registry.format_preset("percent").map(str::to_string))
                    .flatten();
                let columns = if formula.contains('[') {
                    bindings(schema)
                } else {
                    Vec::new()
                };
                em.push(
                    format!("Add column '{label}'"),
                    StepAction::AddColumn(AddColumnParams {
                        header: label,
                        formula: Some(formula),
                        value: None,
                        number_format,
                        columns,
                    }),
                )
            }
        }
        Ok(())
    }

    fn compile_chart(
        &self,
        classification: &ClassificationResult,
        raw: &RawChartPlan,
        schema: &SheetSchema,
        em: &mut Emitter,
    ) -> Result<(), CompileError> {
        let chart = &self.registry.chart;
        let supported = |kind: ChartKind| self.registry.supports_chart(kind);

        // Classifier type, then the planner's, then the goal default, then the fallback.
        let explicit = [
            classification.explicit_chart_type.as_deref(),
            raw.explicit_chart_type.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .find_map(|text| match text.parse::<ChartKind>() {
            Ok(kind) if supported(kind) => Some(kind),
            _ => {
                em.warn(format!("chart type `{text}` is not supported"));
                None
            }
        });

        let mut kind = explicit
            .or_else(|| {
                raw.chart_goal
                    .as_deref()
                    .and_then(|goal| self.registry.chart_for_goal(goal))
                    .filter(|k| supported(*k))
            })
            .unwrap_or(chart.fallback_type);

        let x_column = raw
            .x_column
            .as_deref()
            .filter(|x| !x.trim().is_empty())
            .map(|x| resolve_column(x, &schema.headers))
            .ok_or(CompileError::MissingChartColumn("x-axis column"))?;
        let y_columns: Vec<String> = raw
            .y_columns
            .iter()
            .filter(|y| !y.trim().is_empty())
            .map(|y| resolve_column(y, &schema.headers))
            .collect();
        if y_columns.is_empty() {
            return Err(CompileError::MissingChartColumn("series columns"));
        }

        let cap = self.registry.rules.max_pie_slices;
        if kind == ChartKind::Pie && y_columns.len() > cap {
            em.warn(format!(
                "pie chart with {} series exceeds the {cap}-slice cap; using bar",
                y_columns.len()
            ));
            kind = ChartKind::Bar;
        }

        let series_names: Vec<&str> = y_columns
            .iter()
            .map(|y| header_name(y, &schema.headers))
            .collect();
        let title = raw
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| {
                format!(
                    "{} by {}",
                    series_names.join(", "),
                    header_name(&x_column, &schema.headers)
                )
            });
        em.push(
            format!("Create {kind} chart '{title}'"),
            StepAction::CreateChart(ChartParams {
                chart_type: kind,
                x_column,
                y_columns,
                title: Some(title),
                styling: chart.styling.clone(),
            }),
        );
        Ok(())
    }

    fn compile_clean(
        &self,
        op: &RawOperation,
        schema: &SheetSchema,
        em: &mut Emitter,
    ) -> Result<(), CompileError> {
        let name = op.operation.trim().to_ascii_lowercase();
        if self.registry.clean_operation(&name).is_none() {
            em.warn(format!("unsupported clean-data operation `{}` skipped", op.operation));
            return Ok(());
        }
        let mut params = op.params.clone();
        resolve_keys(&mut params, &["column"], schema);
        if let Some(Value::String(raw_op)) = params.get("operator") {
            let name = Operator::normalize(raw_op).name().to_string();
            params.insert("operator".to_string(), Value::String(name));
        }
        let tag = if name == "filter_data" {
            "FILTER_DATA"
        } else {
            params.insert("operation".to_string(), Value::String(name.clone()));
            "CLEAN_DATA"
        };
        self.emit_operation(op, &name, tag, params, schema, em)
    }

    fn compile_organization(
        &self,
        op: &RawOperation,
        schema: &SheetSchema,
        em: &mut Emitter,
    ) -> Result<(), CompileError> {
        let name = op.operation.trim().to_ascii_lowercase();
        if self.registry.organization_operation(&name).is_none() {
            em.warn(format!("unsupported organization operation `{}` skipped", op.operation));
            return Ok(());
        }
        let mut params = op.params.clone();
        resolve_keys(&mut params, OPERATION_COLUMN_PARAMS, schema);
        let tag = name.to_ascii_uppercase();
        self.emit_operation(op, &name, &tag, params, schema, em)
    }

    fn emit_operation(
        &self,
        op: &RawOperation,
        name: &str,
        tag: &str,
        mut params: Map<String, Value>,
        schema: &SheetSchema,
        em: &mut Emitter,
    ) -> Result<(), CompileError> {
        let has_placeholder = params
            .get("formula")
            .and_then(Value::as_str)
            .is_some_and(|f| f.contains('['));
        if has_placeholder && !params.contains_key("columns") {
            let value = serde_json::to_value(bindings(schema)).unwrap_or(Value::Null);
            params.insert("columns".to_string(), value);
        }
        let description = op
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| describe_operation(name, &params, schema));
        match StepAction::from_parts(tag, Value::Object(params)) {
            Ok(action) => {
                em.push(description, action);
                Ok(())
            }
            Err(err) => self.soft_fail(
                em,
                CompileError::InvalidOperation {
                    operation: name.to_string(),
                    message: err.to_string(),
                },
            ),
        }
    }
}

fn default_label(pattern: &str, params: &Map<String, Value>, schema: &SheetSchema) -> String {
    let title = humanize(pattern);
    let column = ["column", "sum_column", "average_column"]
        .iter()
        .find_map(|k| params.get(*k).and_then(Value::as_str));
    match column {
        Some(letter) => format!("{title} of {}", header_name(letter, &schema.headers)),
        None => title,
    }
}

fn describe_operation(name: &str, params: &Map<String, Value>, schema: &SheetSchema) -> String {
    let title = humanize(name);
    match params.get("column").and_then(Value::as_str) {
        Some(letter) => format!("{title} on {}", header_name(letter, &schema.headers)),
        None => title,
    }
}
