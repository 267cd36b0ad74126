//! Compiled plans and their wire representation.
//!
//! A [`Step`] carries a typed [`StepAction`]; on the wire it is the flat
//! `{stepNumber, action, description, params}` record. [`RawStep`] is the
//! lenient reading used at the executor's entry, which also accepts steps
//! whose action name is the object key (`{"SORT_DATA": {...}}`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sheetplan_skills::{ChartKind, ChartStyling};

use crate::criteria::Operator;
use crate::error::StepError;

/// Every wire tag the executor understands.
pub const ACTION_TAGS: &[&str] = &[
    "CONVERT_DATATYPE",
    "ADD_FORMULA",
    "CREATE_CHART",
    "SORT_DATA",
    "FILTER_DATA",
    "ADD_COLUMN",
    "DELETE_COLUMN",
    "DELETE_ROWS",
    "FORMAT_CELLS",
    "CLEAN_DATA",
    "AGGREGATE",
    "YOY_CALCULATION",
    "QUERY_VALUE",
];

/// Keys of a step that never name an action.
const BOOKKEEPING_KEYS: &[&str] = &[
    "stepNumber",
    "step_number",
    "step",
    "description",
    "status",
    "result",
    "error",
];

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub summary: String,
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn to_wire(&self) -> WirePlan {
        WirePlan {
            summary: self.summary.clone(),
            steps: self.steps.iter().cloned().map(RawStep::from).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawStep", into = "RawStep")]
pub struct Step {
    pub step_number: u32,
    pub description: String,
    pub action: StepAction,
}

impl Step {
    pub fn new(step_number: u32, description: impl Into<String>, action: StepAction) -> Self {
        Self {
            step_number,
            description: description.into(),
            action,
        }
    }

    pub fn tag(&self) -> &'static str {
        self.action.tag()
    }
}

/// One variant per wire tag, each with its own parameter record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "params", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepAction {
    ConvertDatatype(ConvertParams),
    AddFormula(AddFormulaParams),
    CreateChart(ChartParams),
    SortData(SortParams),
    FilterData(FilterParams),
    AddColumn(AddColumnParams),
    DeleteColumn(ColumnParams),
    DeleteRows(DeleteRowsParams),
    FormatCells(FormatParams),
    CleanData(CleanParams),
    Aggregate(AggregateParams),
    YoyCalculation(YoyParams),
    QueryValue(QueryParams),
}

impl StepAction {
    pub fn tag(&self) -> &'static str {
        match self {
            StepAction::ConvertDatatype(_) => "CONVERT_DATATYPE",
            StepAction::AddFormula(_) => "ADD_FORMULA",
            StepAction::CreateChart(_) => "CREATE_CHART",
            StepAction::SortData(_) => "SORT_DATA",
            StepAction::FilterData(_) => "FILTER_DATA",
            StepAction::AddColumn(_) => "ADD_COLUMN",
            StepAction::DeleteColumn(_) => "DELETE_COLUMN",
            StepAction::DeleteRows(_) => "DELETE_ROWS",
            StepAction::FormatCells(_) => "FORMAT_CELLS",
            StepAction::CleanData(_) => "CLEAN_DATA",
            StepAction::Aggregate(_) => "AGGREGATE",
            StepAction::YoyCalculation(_) => "YOY_CALCULATION",
            StepAction::QueryValue(_) => "QUERY_VALUE",
        }
    }

    /// Build from a wire tag and its params object.
    pub fn from_parts(tag: &str, params: Value) -> Result<Self, StepError> {
        let tag = tag.trim().to_ascii_uppercase();
        if !ACTION_TAGS.contains(&tag.as_str()) {
            return Err(StepError::UnknownAction(tag));
        }
        let params = match params {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let mut tagged = Map::new();
        tagged.insert("action".into(), Value::String(tag.clone()));
        tagged.insert("params".into(), params);
        serde_json::from_value(Value::Object(tagged)).map_err(|e| StepError::InvalidParams {
            action: tag,
            message: e.to_string(),
        })
    }

    /// Params as a JSON object.
    pub fn params_value(&self) -> Value {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove("params").unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }
}

/// Column binding captured when a formula was built, used for `[Header]` placeholders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnBinding {
    pub name: String,
    pub letter: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    #[serde(alias = "numeric", alias = "float", alias = "integer")]
    Number,
    #[serde(alias = "string")]
    Text,
    Date,
    #[serde(alias = "bool")]
    Boolean,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvertParams {
    pub column: String,
    pub target_type: TargetType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddFormulaParams {
    pub formula: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Single target cell (`D14`); no per-row templating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnBinding>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartParams {
    pub chart_type: ChartKind,
    pub x_column: String,
    pub y_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub styling: ChartStyling,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    #[serde(alias = "asc")]
    Ascending,
    #[serde(alias = "desc")]
    Descending,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SortParams {
    pub column: String,
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    pub column: String,
    #[serde(default)]
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddColumnParams {
    pub header: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    /// Constant written to every data row when there is no formula.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_format: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnBinding>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnParams {
    pub column: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    #[default]
    Duplicates,
    #[serde(alias = "empty")]
    Blank,
    #[serde(alias = "condition")]
    Matching,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteRowsParams {
    #[serde(default)]
    pub mode: DeleteMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Explicit A1 range; takes precedence over `column`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    /// Registry preset name (`currency`, `percent`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Explicit number-format pattern; takes precedence over `format`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanOperation {
    TrimWhitespace,
    RemoveDuplicates,
    FillBlanks,
    StandardizeCase,
    RemoveEmptyRows,
    ConvertToNumber,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextCase {
    #[serde(alias = "uppercase")]
    Upper,
    #[default]
    #[serde(alias = "lowercase")]
    Lower,
    #[serde(alias = "proper", alias = "titlecase")]
    Title,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CleanParams {
    pub operation: CleanOperation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<TextCase>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    #[default]
    Sum,
    #[serde(alias = "avg", alias = "mean")]
    Average,
    Count,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn label(self) -> &'static str {
        match self {
            AggregateFunction::Sum => "Sum",
            AggregateFunction::Average => "Average",
            AggregateFunction::Count => "Count",
            AggregateFunction::Min => "Min",
            AggregateFunction::Max => "Max",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateParams {
    pub group_by: String,
    pub value_column: String,
    #[serde(default)]
    pub function: AggregateFunction,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct YoyParams {
    pub column: String,
    /// Header of the appended column; defaults to `<header> Growth`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    pub formula: String,
    pub label: String,
}

/// Lenient wire form of one step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStep {
    #[serde(default, alias = "step_number", skip_serializing_if = "Option::is_none")]
    pub step_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawStep {
    /// Canonical `(tag, params)` for this step.
    ///
    /// With neither `action` nor `params`, the first non-bookkeeping key is
    /// the action and its value the params.
    pub fn action_and_params(&self) -> Result<(String, Value), StepError> {
        match (&self.action, &self.params) {
            (Some(action), params) => Ok((
                action.clone(),
                params.clone().unwrap_or(Value::Object(Map::new())),
            )),
            (None, None) => self
                .extra
                .iter()
                .find(|(key, _)| !BOOKKEEPING_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .ok_or(StepError::MissingAction),
            (None, Some(_)) => Err(StepError::MissingAction),
        }
    }

    /// Tag as written, for reporting steps that fail to normalize.
    pub fn display_action(&self) -> String {
        self.action_and_params()
            .map(|(tag, _)| tag.to_ascii_uppercase())
            .unwrap_or_else(|_| "UNKNOWN".to_string())
    }

    pub fn normalize(&self, position: usize) -> Result<Step, StepError> {
        let (tag, params) = self.action_and_params()?;
        let action = StepAction::from_parts(&tag, params)?;
        Ok(Step {
            step_number: self.step_number.unwrap_or(position as u32 + 1),
            description: self.description.clone().unwrap_or_default(),
            action,
        })
    }
}

impl From<Step> for RawStep {
    fn from(step: Step) -> Self {
        RawStep {
            step_number: Some(step.step_number),
            action: Some(step.tag().to_string()),
            description: Some(step.description),
            params: Some(step.action.params_value()),
            extra: Map::new(),
        }
    }
}

impl TryFrom<RawStep> for Step {
    type Error = StepError;

    fn try_from(raw: RawStep) -> Result<Self, Self::Error> {
        raw.normalize(0)
    }
}

/// Lenient wire form of a whole plan.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WirePlan {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub steps: Vec<RawStep>,
}
