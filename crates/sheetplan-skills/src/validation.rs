use serde::Serialize;
use std::fmt;

/// One problem found while validating a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryIssue {
    /// Dotted path to the offending node (`formula.patterns.sum.builder`).
    pub path: String,
    pub message: String,
}

impl RegistryIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// All issues found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    issues: Vec<RegistryIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<RegistryIssue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[RegistryIssue] {
        &self.issues
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "registry failed validation ({} issue", self.issues.len())?;
        if self.issues.len() != 1 {
            write!(f, "s")?;
        }
        write!(f, ")")?;
        for issue in &self.issues {
            write!(f, "\n  {}: {}", issue.path, issue.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
