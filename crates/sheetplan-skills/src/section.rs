use std::collections::BTreeMap;

use serde::Serialize;

use crate::intent::ChartKind;
use crate::registry::{ChartGoal, OperationDefinition, PatternDefinition};

/// Slice of the registry relevant to one intent.
///
/// Serialized as a plain JSON object for the planning collaborator, so it
/// only plans against capabilities the executor implements.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SkillSection {
    Formula {
        patterns: BTreeMap<String, PatternDefinition>,
        wrap_formulas_in_iferror: bool,
    },
    Chart {
        supported_types: Vec<ChartKind>,
        goals: BTreeMap<String, ChartGoal>,
        max_pie_slices: usize,
    },
    Operations {
        operations: BTreeMap<String, OperationDefinition>,
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        format_presets: BTreeMap<String, String>,
    },
    /// Unknown intent; serializes to `{}`.
    Empty {},
}

impl SkillSection {
    pub fn is_empty(&self) -> bool {
        matches!(self, SkillSection::Empty {})
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}
