//! Meta crate that re-exports the Sheetplan layers with sensible defaults.
//! Most users only need [`Assistant`] or the [`PlanCompiler`] /
//! [`Executor`] pair; the underlying crates stay reachable for deeper
//! integration.

#[cfg(all(feature = "json", feature = "csv"))]
pub mod files;

pub use sheetplan_common as common;
pub use sheetplan_engine as engine;
pub use sheetplan_skills as skills;
pub use sheetplan_workbook as workbook;

pub use sheetplan_engine::{
    Assistant, AssistantResponse, ClassificationResult, CompiledPlan, CompilerConfig,
    ExecutionResult, Executor, ExecutorConfig, FilterPolicy, IntentClassifier, Plan, PlanAuthor,
    PlanCompiler, SheetSchema, Strictness, WirePlan,
};
pub use sheetplan_skills::{Intent, SkillRegistry};
pub use sheetplan_workbook::{MemorySheet, TabularStore};
