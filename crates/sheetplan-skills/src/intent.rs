use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name that did not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{name}`")]
pub struct UnknownName {
    pub kind: &'static str,
    pub name: String,
}

/// Request category produced by the upstream classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Formula,
    Chart,
    CleanData,
    Organization,
    Insight,
}

impl Intent {
    pub const ALL: [Intent; 5] = [
        Intent::Formula,
        Intent::Chart,
        Intent::CleanData,
        Intent::Organization,
        Intent::Insight,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Formula => "formula",
            Intent::Chart => "chart",
            Intent::CleanData => "clean_data",
            Intent::Organization => "organization",
            Intent::Insight => "insight",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Intent::ALL
            .into_iter()
            .find(|intent| intent.as_str() == wanted)
            .ok_or_else(|| UnknownName {
                kind: "intent",
                name: s.to_string(),
            })
    }
}

/// Chart types a plan may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Column,
    Line,
    Pie,
    Scatter,
    Area,
}

impl ChartKind {
    pub const ALL: [ChartKind; 6] = [
        ChartKind::Bar,
        ChartKind::Column,
        ChartKind::Line,
        ChartKind::Pie,
        ChartKind::Scatter,
        ChartKind::Area,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Column => "column",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Scatter => "scatter",
            ChartKind::Area => "area",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = UnknownName;

    /// Accepts `Bar`, `bar`, and `bar chart`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let wanted = lowered.strip_suffix(" chart").unwrap_or(&lowered).trim();
        ChartKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| UnknownName {
                kind: "chart type",
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_names_roundtrip_through_serde() {
        let parsed: Intent = serde_json::from_str("\"clean_data\"").unwrap();
        assert_eq!(parsed, Intent::CleanData);
        assert_eq!("Organization".parse::<Intent>().unwrap(), Intent::Organization);
        assert!("summarize".parse::<Intent>().is_err());
    }

    #[test]
    fn chart_kind_accepts_loose_spelling() {
        assert_eq!("Pie Chart".parse::<ChartKind>().unwrap(), ChartKind::Pie);
        assert_eq!(" LINE ".parse::<ChartKind>().unwrap(), ChartKind::Line);
        let err = "donut".parse::<ChartKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown chart type `donut`");
    }
}
