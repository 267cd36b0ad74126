//! Untrusted inputs from the classification and planning collaborators.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sheetplan_skills::Intent;

use crate::error::CollaboratorError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub intent: Intent,
    /// Kept as text so an unsupported type can fall back instead of failing the parse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_chart_type: Option<String>,
    pub confidence: f64,
}

impl ClassificationResult {
    pub fn parse(text: &str) -> Result<Self, CollaboratorError> {
        let json = extract_json(text).ok_or(CollaboratorError::NoJson)?;
        Ok(serde_json::from_str(json)?)
    }
}

/// Plan for the `formula` and `insight` intents.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFormulaPlan {
    #[serde(default)]
    pub conversational_answer: Option<String>,
    #[serde(default)]
    pub calculations: Vec<RawCalculation>,
    /// Single-calculation form: `{pattern, parameters, label}` at the top level.
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub parameters: Option<Map<String, Value>>,
    #[serde(default)]
    pub label: Option<String>,
}

impl RawFormulaPlan {
    /// The calculation list, or a one-element list built from the top-level pattern.
    pub fn calculation_list(&self) -> Vec<RawCalculation> {
        if !self.calculations.is_empty() {
            return self.calculations.clone();
        }
        match &self.pattern {
            Some(pattern) => vec![RawCalculation {
                pattern: pattern.clone(),
                parameters: self.parameters.clone().unwrap_or_default(),
                label: self.label.clone(),
            }],
            None => Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCalculation {
    pub pattern: String,
    #[serde(default, alias = "params")]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChartPlan {
    #[serde(default)]
    pub conversational_answer: Option<String>,
    #[serde(default)]
    pub chart_goal: Option<String>,
    #[serde(default)]
    pub explicit_chart_type: Option<String>,
    #[serde(default)]
    pub x_column: Option<String>,
    #[serde(default)]
    pub y_columns: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Plan for the `clean_data` and `organization` intents.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOperationsPlan {
    #[serde(default)]
    pub conversational_answer: Option<String>,
    #[serde(default)]
    pub operations: Vec<RawOperation>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOperation {
    pub operation: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Every other key (`column`, `operator`, `value`, ...).
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

/// Slice out the JSON object of a collaborator reply, tolerating code fences and prose.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}
