//! Step executor.
//!
//! Steps run strictly in order against one store. The header row is
//! detected once per request and handed to every handler. A failing step
//! is recorded and the next step runs.

mod cells;
mod columns;
pub mod condition;
pub mod format;
pub mod impact;
mod rows;
pub mod templating;

use serde::{Deserialize, Serialize};
use sheetplan_skills::SkillRegistry;
use sheetplan_workbook::TabularStore;

use crate::config::ExecutorConfig;
use crate::error::StepError;
use crate::layout::Layout;
use crate::plan::{Plan, Step, StepAction, WirePlan};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Error,
}

/// Outcome of one step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: u32,
    pub action: String,
    pub description: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub summary: String,
    pub step_results: Vec<StepResult>,
}

impl ExecutionResult {
    pub fn succeeded(&self) -> usize {
        self.step_results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.step_results.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    /// Result lines of successful value queries, in step order.
    pub fn query_answers(&self) -> Vec<&str> {
        self.step_results
            .iter()
            .filter(|r| r.is_success() && r.action == "QUERY_VALUE")
            .filter_map(|r| r.result.as_deref())
            .collect()
    }
}

/// What every handler receives besides the store.
pub(crate) struct StepContext<'a> {
    pub layout: Layout,
    pub config: &'a ExecutorConfig,
    pub registry: &'a SkillRegistry,
}

pub struct Executor<'r> {
    registry: &'r SkillRegistry,
    config: ExecutorConfig,
}

impl<'r> Executor<'r> {
    pub fn new(registry: &'r SkillRegistry) -> Self {
        Self::with_config(registry, ExecutorConfig::from_registry(registry))
    }

    pub fn with_config(registry: &'r SkillRegistry, config: ExecutorConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn execute(&self, store: &mut dyn TabularStore, plan: &Plan) -> ExecutionResult {
        let steps = plan
            .steps
            .iter()
            .map(|s| (s.step_number, s.tag().to_string(), s.description.clone(), Ok::<_, String>(s)));
        self.run(store, &plan.summary, steps)
    }

    /// Execute a plan read leniently from the wire; steps that fail to
    /// normalize are reported as errors in place.
    pub fn execute_wire(&self, store: &mut dyn TabularStore, plan: &WirePlan) -> ExecutionResult {
        let normalized: Vec<(u32, String, String, Result<Step, StepError>)> = plan
            .steps
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                (
                    raw.step_number.unwrap_or(i as u32 + 1),
                    raw.display_action(),
                    raw.description.clone().unwrap_or_default(),
                    raw.normalize(i),
                )
            })
            .collect();
        let steps = normalized
            .iter()
            .map(|(n, tag, desc, step)| (*n, tag.clone(), desc.clone(), step.as_ref().map_err(ToString::to_string)));
        self.run(store, &plan.summary, steps)
    }

    fn run<'s>(
        &self,
        store: &mut dyn TabularStore,
        summary: &str,
        steps: impl Iterator<Item = (u32, String, String, Result<&'s Step, String>)>,
    ) -> ExecutionResult {
        let layout = Layout::detect(&*store).map_err(|e| e.to_string());
        #[cfg(feature = "tracing")]
        if let Ok(layout) = &layout {
            tracing::debug!(header_row = layout.header_row, sheet = store.sheet_name(), "executing plan");
        }
        let mut results = Vec::new();
        for (number, tag, description, step) in steps {
            let outcome = match (&layout, step) {
                (Err(e), _) => Err(format!("could not read the sheet layout: {e}")),
                (_, Err(e)) => Err(e),
                (Ok(layout), Ok(step)) => {
                    let ctx = StepContext {
                        layout: *layout,
                        config: &self.config,
                        registry: self.registry,
                    };
                    #[cfg(feature = "tracing")]
                    tracing::debug!(step = number, action = %tag, "running step");
                    dispatch(store, &ctx, &step.action).map_err(|e| e.to_string())
                }
            };
            #[cfg(feature = "tracing")]
            if let Err(error) = &outcome {
                tracing::warn!(step = number, action = %tag, %error, "step failed");
            }
            results.push(match outcome {
                Ok(result) => StepResult {
                    step: number,
                    action: tag,
                    description,
                    status: StepStatus::Success,
                    result: Some(result),
                    error: None,
                },
                Err(error) => StepResult {
                    step: number,
                    action: tag,
                    description,
                    status: StepStatus::Error,
                    result: None,
                    error: Some(error),
                },
            });
        }
        ExecutionResult {
            summary: summary.to_string(),
            step_results: results,
        }
    }
}

fn dispatch(
    store: &mut dyn TabularStore,
    ctx: &StepContext<'_>,
    action: &StepAction,
) -> Result<String, StepError> {
    match action {
        StepAction::ConvertDatatype(p) => columns::convert_datatype(store, ctx, p),
        StepAction::AddFormula(p) => columns::add_formula(store, ctx, p),
        StepAction::CreateChart(p) => cells::create_chart(store, ctx, p),
        StepAction::SortData(p) => rows::sort_data(store, ctx, p),
        StepAction::FilterData(p) => rows::filter_data(store, ctx, p),
        StepAction::AddColumn(p) => columns::add_column(store, ctx, p),
        StepAction::DeleteColumn(p) => columns::delete_column(store, ctx, p),
        StepAction::DeleteRows(p) => rows::delete_rows(store, ctx, p),
        StepAction::FormatCells(p) => cells::format_cells(store, ctx, p),
        StepAction::CleanData(p) => cells::clean_data(store, ctx, p),
        StepAction::Aggregate(p) => columns::aggregate(store, ctx, p),
        StepAction::YoyCalculation(p) => columns::yoy_calculation(store, ctx, p),
        StepAction::QueryValue(p) => cells::query_value(store, ctx, p),
    }
}
