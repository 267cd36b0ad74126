//! Plan compiler and step executor.
//!
//! A classified request plus a loosely structured raw plan goes through
//! [`PlanCompiler`], which resolves columns against the sheet schema and
//! synthesizes formulas, and comes out as a numbered [`Plan`] of typed
//! steps. [`Executor`] applies those steps in order to any
//! [`TabularStore`](sheetplan_workbook::TabularStore). [`Assistant`] wires
//! both to the two external collaborators.

pub mod compiler;
pub mod config;
pub mod criteria;
pub mod error;
pub mod executor;
pub mod formula;
pub mod layout;
pub mod plan;
pub mod raw;
pub mod resolver;
pub mod schema;
pub mod service;

pub use compiler::{CompiledPlan, PlanCompiler};
pub use config::{CompilerConfig, ExecutorConfig, FilterPolicy, Strictness};
pub use criteria::{CriterionClause, Operator, normalize_criteria};
pub use error::{CollaboratorError, CompileError, FormulaError, StepError};
pub use executor::{ExecutionResult, Executor, StepResult, StepStatus};
pub use layout::{Layout, detect_header_row};
pub use plan::{Plan, RawStep, Step, StepAction, WirePlan};
pub use raw::{ClassificationResult, extract_json};
pub use resolver::resolve_column;
pub use schema::{Header, SheetSchema};
pub use service::{Assistant, AssistantResponse, IntentClassifier, PlanAuthor, PlanRequest};
