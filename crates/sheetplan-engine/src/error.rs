use sheetplan_common::AddressError;
use sheetplan_skills::Intent;
use sheetplan_workbook::StoreError;
use thiserror::Error;

/// Failures while turning resolved parameters into formula text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("missing required parameter `{0}`")]
    MissingParameter(String),

    #[error("parameter `{param}` is invalid: {message}")]
    InvalidParameter { param: String, message: String },

    #[error("no formula template for builder `{0}`")]
    UnknownBuilder(String),

    #[error("criteria list is empty")]
    EmptyCriteria,
}

impl FormulaError {
    pub fn invalid(param: &str, message: impl Into<String>) -> Self {
        FormulaError::InvalidParameter {
            param: param.to_string(),
            message: message.into(),
        }
    }
}

/// Structural failures that abort a whole compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("could not read the {intent} plan: {source}")]
    RawPlan {
        intent: Intent,
        #[source]
        source: serde_json::Error,
    },

    #[error("calculation `{pattern}` is missing required parameter `{param}`")]
    MissingParameter { pattern: String, param: String },

    #[error("`{item}` could not be compiled: {source}")]
    Formula {
        item: String,
        #[source]
        source: FormulaError,
    },

    #[error("operation `{operation}` has invalid parameters: {message}")]
    InvalidOperation { operation: String, message: String },

    #[error("chart plan has no {0}")]
    MissingChartColumn(&'static str),

    #[error("sheet schema is inconsistent: {0}")]
    Schema(String),
}

/// Failure of one step; recorded in the execution result, never propagated.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("step has neither an action nor an action-named key")]
    MissingAction,

    #[error("unknown action `{0}`")]
    UnknownAction(String),

    #[error("invalid parameters for {action}: {message}")]
    InvalidParams { action: String, message: String },

    #[error("column `{0}` not found")]
    ColumnNotFound(String),

    #[error("unsupported condition `{0}`")]
    UnsupportedCondition(String),

    #[error("unknown number format preset `{0}`")]
    UnknownPreset(String),

    #[error("unknown column placeholder `[{0}]`")]
    UnknownPlaceholder(String),

    #[error("formula `{formula}` evaluated to {code}")]
    Evaluation { formula: String, code: String },

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures talking to the classification or planning collaborator.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("collaborator request failed: {0}")]
    Transport(String),

    #[error("collaborator returned no JSON object")]
    NoJson,

    #[error("collaborator returned malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}
