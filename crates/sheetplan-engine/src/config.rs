use serde::{Deserialize, Serialize};
use sheetplan_skills::SkillRegistry;

/// What happens when a calculation lacks a required parameter or fails to build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// Skip the item, record a warning, keep compiling.
    #[default]
    Lenient,
    /// Abort the whole plan.
    Strict,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompilerConfig {
    pub strictness: Strictness,
    /// Classifications below this confidence get a clarification instead of a plan.
    pub confidence_threshold: f64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            strictness: Strictness::Lenient,
            confidence_threshold: 0.6,
        }
    }
}

impl CompilerConfig {
    pub fn from_registry(registry: &SkillRegistry) -> Self {
        Self {
            confidence_threshold: registry.rules.confidence_threshold,
            ..Self::default()
        }
    }

    pub fn strict(mut self) -> Self {
        self.strictness = Strictness::Strict;
        self
    }
}

/// Which rows a `FILTER_DATA` step removes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterPolicy {
    /// Rows satisfying the condition are deleted.
    #[default]
    DeleteMatching,
    /// Rows satisfying the condition are kept; every other data row is deleted.
    KeepMatching,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExecutorConfig {
    pub filter_policy: FilterPolicy,
    /// Deletions removing at least this fraction of data rows are flagged.
    pub impact_threshold: f64,
    /// Distance right of the last used column where value queries are evaluated.
    pub scratch_column_gap: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            filter_policy: FilterPolicy::DeleteMatching,
            impact_threshold: 0.5,
            scratch_column_gap: 50,
        }
    }
}

impl ExecutorConfig {
    pub fn from_registry(registry: &SkillRegistry) -> Self {
        Self {
            impact_threshold: registry.rules.high_impact_threshold,
            ..Self::default()
        }
    }

    pub fn with_filter_policy(mut self, policy: FilterPolicy) -> Self {
        self.filter_policy = policy;
        self
    }
}
